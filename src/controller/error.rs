/* src/controller/error.rs */

use std::path::PathBuf;

use thiserror::Error;

use crate::loader::FmtError;

/// Errors from file-backed live values.
#[derive(Debug, Error)]
pub enum LiveError {
	#[error("failed to load {path:?}: {source}")]
	Load {
		path: PathBuf,
		#[source]
		source: FmtError,
	},

	#[error("reload cancelled")]
	Cancelled,

	#[error("Builder error: {0}")]
	Builder(String),
}
