/* src/openapi/mod.rs */

//!
//! A small OpenAPI 3.x document model, its structural validation and
//! example synthesis for mocked responses.

mod document;
mod example;
mod validate;

pub use document::{
	Components, Document, ExampleObject, Info, MediaType, Method, Operation, PathItem, Response,
};
pub use example::{ExampleError, MAX_REF_DEPTH, Synthesizer};
pub use validate::is_response_key;
