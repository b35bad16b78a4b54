/* src/server/error.rs */

use std::path::PathBuf;

use thiserror::Error;

use crate::loader::FmtError;
use crate::openapi::ExampleError;

/// Errors while compiling a document into a [`Pipeline`](super::Pipeline).
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("invalid path template {template:?}: {reason}")]
	Route { template: String, reason: String },

	#[error("{method} {path}: invalid response key {key:?}")]
	ResponseKey {
		method: String,
		path: String,
		key: String,
	},

	#[error("{method} {path}: {source}")]
	Example {
		method: String,
		path: String,
		#[source]
		source: ExampleError,
	},

	#[error("failed to encode example: {0}")]
	Encode(#[from] serde_json::Error),
}

/// Errors from loading and swapping the mock pipeline.
#[derive(Debug, Error)]
pub enum ServeError {
	#[error("failed to load {path:?}: {source}")]
	Load {
		path: PathBuf,
		#[source]
		source: FmtError,
	},

	#[error(transparent)]
	Build(#[from] BuildError),

	#[error("reload cancelled")]
	Cancelled,
}
