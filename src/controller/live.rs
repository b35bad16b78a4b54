/* src/controller/live.rs */

//!
//! Single-file typed value with live reloading.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::LiveError;
use crate::holder::LiveCell;
use crate::loader::{FileLoader, PreProcess, ValidateConfig};
use crate::reload::Reloadable;
use crate::signal::BoxError;

/// A typed document loaded from one file and republished on every reload.
///
/// A failed reload leaves the last good value in place.
pub struct LiveFile<T> {
	name: String,
	path: PathBuf,
	loader: FileLoader,
	cell: LiveCell<T>,
}

/// Builder for [`LiveFile`].
pub struct LiveFileBuilder {
	name: Option<String>,
	path: Option<PathBuf>,
	loader: FileLoader,
}

impl LiveFileBuilder {
	pub fn new() -> Self {
		Self {
			name: None,
			path: None,
			loader: FileLoader::new(),
		}
	}

	/// Name used for reload registration. Defaults to the file stem.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
		self.path = Some(path.into());
		self
	}

	pub fn loader(mut self, loader: FileLoader) -> Self {
		self.loader = loader;
		self
	}

	/// Performs the initial load. Fails if the file is missing or invalid.
	pub async fn load<T>(self) -> Result<LiveFile<T>, LiveError>
	where
		T: DeserializeOwned + PreProcess + ValidateConfig + Send + Sync + 'static,
	{
		let path = self
			.path
			.ok_or_else(|| LiveError::Builder("path is required".to_string()))?;
		let name = match self.name {
			Some(name) => name,
			None => path
				.file_stem()
				.and_then(|s| s.to_str())
				.map(str::to_string)
				.ok_or_else(|| LiveError::Builder("name is required".to_string()))?,
		};

		let value = read(&self.loader, &path).await?;
		tracing::info!(name = %name, path = ?path, "loaded");

		Ok(LiveFile {
			name,
			cell: LiveCell::new(value, path.clone()),
			path,
			loader: self.loader,
		})
	}
}

impl Default for LiveFileBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> LiveFile<T>
where
	T: DeserializeOwned + PreProcess + ValidateConfig + Send + Sync + 'static,
{
	pub fn builder() -> LiveFileBuilder {
		LiveFileBuilder::new()
	}

	/// Loads `path` and names the value after its file stem.
	pub async fn load(path: impl Into<PathBuf>) -> Result<Self, LiveError> {
		LiveFileBuilder::new().path(path).load().await
	}

	/// Returns the current value.
	pub fn get(&self) -> Arc<T> {
		self.cell.get()
	}

	pub fn cell(&self) -> &LiveCell<T> {
		&self.cell
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Re-reads the file and publishes it if valid.
	pub async fn refresh(&self, cancel: &CancellationToken) -> Result<u64, LiveError> {
		let value = read(&self.loader, &self.path).await?;
		if cancel.is_cancelled() {
			return Err(LiveError::Cancelled);
		}
		self.cell.store(value, self.path.clone());
		Ok(self.cell.version())
	}
}

#[async_trait]
impl<T> Reloadable for LiveFile<T>
where
	T: DeserializeOwned + PreProcess + ValidateConfig + Send + Sync + 'static,
{
	fn name(&self) -> &str {
		&self.name
	}

	async fn reload(&self, cancel: CancellationToken) -> Result<(), BoxError> {
		let version = self.refresh(&cancel).await?;
		tracing::info!(name = %self.name, version, "reloaded");
		Ok(())
	}
}

async fn read<T>(loader: &FileLoader, path: &Path) -> Result<T, LiveError>
where
	T: DeserializeOwned + PreProcess + ValidateConfig,
{
	loader
		.load::<T>(path)
		.await
		.into_result()
		.map(|(value, _)| value)
		.map_err(|source| LiveError::Load {
			path: path.to_path_buf(),
			source,
		})
}

impl<T> std::fmt::Debug for LiveFile<T>
where
	T: std::fmt::Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LiveFile")
			.field("name", &self.name)
			.field("path", &self.path)
			.field("cell", &self.cell)
			.finish_non_exhaustive()
	}
}
