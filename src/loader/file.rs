/* src/loader/file.rs */

use std::path::Path;

use serde::de::DeserializeOwned;

use super::format::AnyFormat;
use super::{FmtError, Format, LoadInfo, LoadResult, PreProcess, ValidateConfig};

/// Loads typed documents from disk, choosing the parser by file extension.
#[derive(Debug, Clone)]
pub struct FileLoader {
	formats: Vec<AnyFormat>,
}

impl FileLoader {
	/// A loader accepting every supported format.
	pub fn new() -> Self {
		Self {
			formats: AnyFormat::ALL.to_vec(),
		}
	}

	/// A loader restricted to the given formats.
	pub fn with_formats(formats: impl IntoIterator<Item = AnyFormat>) -> Self {
		Self {
			formats: formats.into_iter().collect(),
		}
	}

	/// Selects the format for `path` from its extension.
	pub fn format_for(&self, path: &Path) -> Result<AnyFormat, FmtError> {
		let ext = path
			.extension()
			.and_then(|e| e.to_str())
			.ok_or_else(|| FmtError::UnsupportedFormat(String::new()))?;

		AnyFormat::from_extension(ext)
			.filter(|f| self.formats.contains(f))
			.ok_or_else(|| FmtError::UnsupportedFormat(ext.to_string()))
	}

	/// Reads, parses, pre-processes and validates the document at `path`.
	pub async fn load<T>(&self, path: &Path) -> LoadResult<T>
	where
		T: DeserializeOwned + PreProcess + ValidateConfig,
	{
		let format = match self.format_for(path) {
			Ok(f) => f,
			Err(e) => return LoadResult::Invalid(e),
		};

		let bytes = match tokio::fs::read(path).await {
			Ok(b) => b,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return LoadResult::NotFound,
			Err(e) => return LoadResult::Invalid(FmtError::Io(e)),
		};

		match format.parse::<T>(&bytes) {
			Ok(mut obj) => {
				obj.pre_process();
				obj.set_context(&path.to_string_lossy());

				if let Err(e) = obj.validate_config() {
					return LoadResult::Invalid(e);
				}

				LoadResult::Ok {
					value: obj,
					info: LoadInfo {
						path: path.to_path_buf(),
						format: format.name(),
					},
				}
			}
			Err(e) => LoadResult::Invalid(e),
		}
	}

	/// Dry-run mode, validates without returning data.
	pub async fn validate<T>(&self, path: &Path) -> Result<(), FmtError>
	where
		T: DeserializeOwned + PreProcess + ValidateConfig,
	{
		self.load::<T>(path).await.into_result().map(|_| ())
	}
}

impl Default for FileLoader {
	fn default() -> Self {
		Self::new()
	}
}
