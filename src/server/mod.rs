/* src/server/mod.rs */

//!
//! HTTP front-end: compiles an OpenAPI document into a [`Pipeline`] of
//! pre-rendered responses and serves it through axum.

mod error;
mod handler;
mod pipeline;
mod route;
mod service;

pub use error::{BuildError, ServeError};
pub use handler::VERSION_HEADER;
pub use pipeline::{CachedResponse, Pipeline};
pub use route::{Lookup, RouteTable};
pub use service::MockService;
