/* src/lib.rs */

//!
//! An OpenAPI mock server that reloads itself while serving.
//!
//! The crate is built from these components:
//!
//! - **signal**: Filesystem monitoring (`Watcher`) and event fan-out (`Broadcaster`).
//! - **reload**: Debounced reload coordination (`Coordinator`, `Manager`, `Reloadable`).
//! - **holder**: Atomically swappable values (`LiveCell`).
//! - **loader**: Format-agnostic loading of typed documents (JSON, YAML, TOML).
//! - **controller**: File-backed live values (`LiveFile`).
//! - **openapi**: Document model, validation and example synthesis.
//! - **server**: Route table, pre-rendered responses and the axum front-end.
//!
//! ## Feature Flags
//!
//! - `full`: Enables all features.
//! - `server`: Enables the `server` module (axum front-end).
//! - `cli`: Builds the `livemock` binary.
//!
//! ## Basic Usage
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use livemock::reload::{Manager, ManagerConfig};
//! use livemock::server::MockService;
//!
//! let manager = Manager::new(ManagerConfig::default())?;
//! let service = Arc::new(MockService::load("petstore.yaml").await?);
//! manager.add_watch(".").await?;
//! manager.register_reloadable(service.clone()).await?;
//! manager.start().await?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, service.router()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod holder;
pub mod loader;
pub mod openapi;
pub mod reload;
pub mod signal;

#[cfg(feature = "server")]
pub mod server;
