/* src/loader/mod.rs */

//!
//! Format-agnostic loading of typed documents from disk.

mod error;
mod file;
pub mod format;

pub use error::FmtError;
pub use file::FileLoader;

use std::path::PathBuf;

use serde::de::DeserializeOwned;

/// Result of a loading operation.
#[derive(Debug)]
pub enum LoadResult<T> {
	/// Successfully loaded, parsed and validated.
	Ok { value: T, info: LoadInfo },
	/// Nothing exists at the given path.
	NotFound,
	/// The file exists but is unreadable, malformed or invalid.
	Invalid(FmtError),
}

impl<T> LoadResult<T> {
	/// Collapses the result into a `Result`, mapping `NotFound` to [`FmtError::NotFound`].
	pub fn into_result(self) -> Result<(T, LoadInfo), FmtError> {
		match self {
			LoadResult::Ok { value, info } => Ok((value, info)),
			LoadResult::NotFound => Err(FmtError::NotFound),
			LoadResult::Invalid(e) => Err(e),
		}
	}
}

/// Where a value was loaded from.
#[derive(Debug, Clone)]
pub struct LoadInfo {
	pub path: PathBuf,
	pub format: &'static str,
}

/// A hook to process data after parsing but before validation.
pub trait PreProcess {
	/// Perform data normalization.
	fn pre_process(&mut self) {}
	/// Set context information (the source path).
	fn set_context(&mut self, _ctx: &str) {}
}

/// Validation run after [`PreProcess`].
pub trait ValidateConfig: validator::Validate {
	fn validate_config(&self) -> Result<(), FmtError> {
		self.validate().map_err(FmtError::Validation)
	}
}

impl<T: validator::Validate> ValidateConfig for T {}

/// Abstract format parser that converts bytes into a structured object.
pub trait Format: Send + Sync {
	/// List of supported extensions.
	fn extensions(&self) -> &'static [&'static str];

	/// Parse the raw bytes into the target type.
	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, FmtError>;
}
