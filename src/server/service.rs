/* src/server/service.rs */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

use super::{Pipeline, ServeError, handler};
use crate::config::Settings;
use crate::controller::LiveFile;
use crate::holder::LiveCell;
use crate::loader::FileLoader;
use crate::loader::format::AnyFormat;
use crate::openapi::Document;
use crate::reload::Reloadable;
use crate::signal::BoxError;

/// Serves mocked responses for an OpenAPI document and rebuilds them on reload.
///
/// Registered with the reload coordinator under the name `"openapi"`.
pub struct MockService {
	path: PathBuf,
	loader: FileLoader,
	pipeline: LiveCell<Pipeline>,
	settings: Option<Arc<LiveFile<Settings>>>,
}

impl MockService {
	pub const NAME: &'static str = "openapi";

	/// Loads and compiles the document at `path`.
	pub async fn load(path: impl Into<PathBuf>) -> Result<Self, ServeError> {
		let path = path.into();
		let loader = FileLoader::with_formats([AnyFormat::Json, AnyFormat::Yaml]);
		let pipeline = compile(&loader, &path).await?;
		tracing::info!(
			path = ?path,
			title = pipeline.title(),
			operations = pipeline.operation_count(),
			"openapi document loaded"
		);

		Ok(Self {
			pipeline: LiveCell::new(pipeline, path.clone()),
			path,
			loader,
			settings: None,
		})
	}

	/// Attaches live settings consulted on every request.
	pub fn with_settings(mut self, settings: Arc<LiveFile<Settings>>) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn pipeline(&self) -> &LiveCell<Pipeline> {
		&self.pipeline
	}

	/// Current settings, or defaults when none are attached.
	pub fn settings(&self) -> Arc<Settings> {
		match &self.settings {
			Some(live) => live.get(),
			None => Arc::new(Settings::default()),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// An axum router answering every request from the current pipeline.
	pub fn router(self: &Arc<Self>) -> Router {
		Router::new()
			.fallback(handler::serve_mock)
			.with_state(Arc::clone(self))
	}

	async fn rebuild(&self, cancel: &CancellationToken) -> Result<u64, ServeError> {
		let pipeline = compile(&self.loader, &self.path).await?;
		if cancel.is_cancelled() {
			return Err(ServeError::Cancelled);
		}
		self.pipeline.store(pipeline, self.path.clone());
		Ok(self.pipeline.version())
	}
}

#[async_trait]
impl Reloadable for MockService {
	fn name(&self) -> &str {
		Self::NAME
	}

	async fn reload(&self, cancel: CancellationToken) -> Result<(), BoxError> {
		let version = self.rebuild(&cancel).await?;
		let current = self.pipeline.get();
		tracing::info!(
			version,
			title = current.title(),
			operations = current.operation_count(),
			"openapi pipeline swapped"
		);
		Ok(())
	}
}

async fn compile(loader: &FileLoader, path: &Path) -> Result<Pipeline, ServeError> {
	let (doc, _) = loader
		.load::<Document>(path)
		.await
		.into_result()
		.map_err(|source| ServeError::Load {
			path: path.to_path_buf(),
			source,
		})?;
	Ok(Pipeline::build(&doc)?)
}

impl std::fmt::Debug for MockService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MockService")
			.field("path", &self.path)
			.field("version", &self.pipeline.version())
			.finish_non_exhaustive()
	}
}
