/* src/loader/error.rs */

/// Errors from loading a document.
#[derive(Debug, thiserror::Error)]
pub enum FmtError {
	/// Parsing error from format implementation.
	#[error("parse error: {0}")]
	ParseError(String),

	/// Resource not found.
	#[error("not found")]
	NotFound,

	/// No registered format handles this file extension.
	#[error("unsupported file extension: {0:?}")]
	UnsupportedFormat(String),

	/// IO error while reading.
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	/// Validation error from validator crate.
	#[error("validation failed: {0}")]
	Validation(#[from] validator::ValidationErrors),
}
