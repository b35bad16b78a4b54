/* src/reload/manager.rs */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::{Coordinator, DEFAULT_DEBOUNCE, ManagerError, ReloadError, ReloadReport, Reloadable};
use crate::signal::{Broadcaster, Listener, WatchConfig, Watcher};

/// Settings for a [`Manager`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
	/// Quiet period after the last event before reloading.
	pub debounce: Duration,
	pub watch: WatchConfig,
	/// Capacity of the coordinator's internal queues.
	pub capacity: usize,
}

impl Default for ManagerConfig {
	fn default() -> Self {
		Self {
			debounce: DEFAULT_DEBOUNCE,
			watch: WatchConfig::default(),
			capacity: 100,
		}
	}
}

/// The live reconfiguration facade: one watcher, one coordinator, one broadcaster.
///
/// Construct one per server instance, register paths, reloadables and
/// listeners, then [`start`](Self::start). Unlike [`Coordinator::start`],
/// starting an already running manager succeeds.
pub struct Manager {
	watcher: Arc<Watcher>,
	coordinator: Coordinator,
	broadcaster: Arc<Broadcaster>,
	root: CancellationToken,
}

impl Manager {
	pub fn new(config: ManagerConfig) -> Result<Self, ManagerError> {
		let watcher = Arc::new(Watcher::new(config.watch)?);
		let broadcaster = Arc::new(Broadcaster::new());
		let coordinator = Coordinator::new(Arc::clone(&watcher))
			.with_debounce(config.debounce)
			.with_capacity(config.capacity)
			.with_observer(Arc::clone(&broadcaster));

		Ok(Self {
			watcher,
			coordinator,
			broadcaster,
			root: CancellationToken::new(),
		})
	}

	/// Watches a file or directory. Returns the resolved path.
	pub async fn add_watch(&self, path: impl AsRef<Path>) -> Result<PathBuf, ManagerError> {
		Ok(self.watcher.add(path).await?)
	}

	pub async fn remove_watch(&self, path: impl AsRef<Path>) -> Result<(), ManagerError> {
		Ok(self.watcher.remove(path).await?)
	}

	pub async fn register_reloadable(&self, reloadable: Arc<dyn Reloadable>) -> Result<(), ManagerError> {
		Ok(self.coordinator.register(reloadable).await?)
	}

	pub async fn unregister_reloadable(&self, name: &str) -> bool {
		self.coordinator.unregister(name).await
	}

	pub async fn add_listener(
		&self,
		name: impl Into<String>,
		listener: impl Listener + 'static,
	) -> Result<(), ManagerError> {
		Ok(self.broadcaster.add_listener(name, listener).await?)
	}

	pub async fn remove_listener(&self, name: &str) -> bool {
		self.broadcaster.remove_listener(name).await
	}

	/// Starts watching and reloading. Already running is not an error.
	pub async fn start(&self) -> Result<(), ManagerError> {
		match self.coordinator.start(&self.root).await {
			Ok(()) | Err(ReloadError::AlreadyRunning) => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	/// Stops watching and waits for in-flight reloads. The manager can be started again.
	pub async fn stop(&self) {
		self.coordinator.stop().await;
	}

	/// Like [`stop`](Self::stop), but gives up waiting after `timeout`.
	///
	/// On timeout, in-flight reloads have already been told to cancel; the
	/// ones that ignore cancellation keep running in the background.
	pub async fn shutdown(&self, timeout: Duration) -> Result<(), ManagerError> {
		match tokio::time::timeout(timeout, self.coordinator.stop()).await {
			Ok(()) => Ok(()),
			Err(_) => {
				tracing::warn!(?timeout, "shutdown deadline exceeded");
				Err(ManagerError::ShutdownTimeout(timeout))
			}
		}
	}

	pub fn set_debounce(&self, debounce: Duration) {
		self.coordinator.set_debounce(debounce);
	}

	pub fn debounce(&self) -> Duration {
		self.coordinator.debounce()
	}

	pub async fn is_running(&self) -> bool {
		self.coordinator.is_running().await
	}

	/// Reloads every registered component immediately.
	pub async fn reload_now(&self) -> Arc<ReloadReport> {
		self.coordinator.reload_now().await
	}

	/// Subscribes to the report of every reload.
	pub fn subscribe(&self) -> broadcast::Receiver<Arc<ReloadReport>> {
		self.coordinator.subscribe()
	}

	pub fn watcher(&self) -> &Arc<Watcher> {
		&self.watcher
	}

	pub fn broadcaster(&self) -> &Arc<Broadcaster> {
		&self.broadcaster
	}
}

impl Drop for Manager {
	fn drop(&mut self) {
		self.root.cancel();
	}
}

impl std::fmt::Debug for Manager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Manager")
			.field("coordinator", &self.coordinator)
			.field("broadcaster", &self.broadcaster)
			.finish_non_exhaustive()
	}
}
