/* src/signal/watcher.rs */

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use futures_util::Stream;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::worker::process_events;
use super::{ChangeEvent, Filter, Result, SignalError, WatchConfig};

/// Watches a set of paths and emits normalized [`ChangeEvent`]s.
///
/// Paths can be added before or after [`start`](Self::start). The OS notifier
/// only exists while running; stopping releases it and closes the event channel.
pub struct Watcher {
	state: Mutex<WatchState>,
	filter: Filter,
	config: WatchConfig,
}

#[derive(Default)]
struct WatchState {
	paths: BTreeSet<PathBuf>,
	run: Option<Run>,
	events: Option<mpsc::Receiver<ChangeEvent>>,
}

struct Run {
	notifier: RecommendedWatcher,
	cancel: CancellationToken,
	task: JoinHandle<()>,
}

impl Watcher {
	/// Creates a stopped watcher with no paths.
	pub fn new(config: WatchConfig) -> Result<Self> {
		let filter = Filter::new(&config.ignore)?;
		Ok(Self {
			state: Mutex::new(WatchState::default()),
			filter,
			config,
		})
	}

	/// Resolves `path`, registers it with the OS notifier and adds it to the watch set.
	///
	/// OS registration failures are returned here even while stopped, naming
	/// the path. Adding a path that is already watched is a no-op. Returns
	/// the resolved path.
	pub async fn add(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
		let path = path.as_ref();
		let resolved = tokio::fs::canonicalize(path)
			.await
			.map_err(|source| SignalError::Path {
				path: path.to_path_buf(),
				source,
			})?;

		let mut state = self.state.lock().await;
		if state.paths.contains(&resolved) {
			return Ok(resolved);
		}

		match state.run.as_mut() {
			Some(run) => run
				.notifier
				.watch(&resolved, self.mode())
				.map_err(|e| SignalError::watch(&resolved, e))?,
			None => self.check_watchable(&resolved)?,
		}

		tracing::debug!(path = ?resolved, "watch added");
		state.paths.insert(resolved.clone());
		Ok(resolved)
	}

	/// Removes `path` from the watch set. Removing an unwatched path is a no-op.
	pub async fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
		let path = path.as_ref();
		let resolved = match tokio::fs::canonicalize(path).await {
			Ok(p) => p,
			// The path may already be gone from disk.
			Err(_) => std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
		};

		let mut state = self.state.lock().await;
		if !state.paths.remove(&resolved) {
			return Ok(());
		}
		tracing::debug!(path = ?resolved, "watch removed");

		if let Some(run) = state.run.as_mut() {
			match run.notifier.unwatch(&resolved) {
				Ok(()) => {}
				// The OS drops watches on deleted paths by itself.
				Err(e) if matches!(e.kind, notify::ErrorKind::WatchNotFound) => {}
				Err(e) => return Err(SignalError::watch(&resolved, e)),
			}
		}
		Ok(())
	}

	/// Starts delivering events. Calling this while running is a no-op.
	pub async fn start(&self) -> Result<()> {
		let mut state = self.state.lock().await;
		if state.run.is_some() {
			return Ok(());
		}

		let capacity = self.config.capacity.max(1);
		let (raw_tx, raw_rx) = mpsc::channel(capacity);

		let mut notifier =
			notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
				let _ = raw_tx.blocking_send(res);
			})?;

		for path in &state.paths {
			notifier
				.watch(path, self.mode())
				.map_err(|e| SignalError::watch(path, e))?;
		}

		let (tx, rx) = mpsc::channel(capacity);
		let cancel = CancellationToken::new();
		let task = tokio::spawn(process_events(
			raw_rx,
			tx,
			self.filter.clone(),
			cancel.clone(),
		));

		tracing::info!(paths = state.paths.len(), "watcher started");
		state.run = Some(Run {
			notifier,
			cancel,
			task,
		});
		state.events = Some(rx);
		Ok(())
	}

	/// Stops delivery and releases the OS notifier. Calling this while stopped is a no-op.
	///
	/// Returns once the worker has exited and the event channel is closed.
	pub async fn stop(&self) {
		let run = {
			let mut state = self.state.lock().await;
			state.events = None;
			state.run.take()
		};

		let Some(Run {
			notifier,
			cancel,
			task,
		}) = run
		else {
			return;
		};

		drop(notifier);
		cancel.cancel();
		if let Err(e) = task.await {
			tracing::warn!(error = %e, "watcher worker did not exit cleanly");
		}
		tracing::info!("watcher stopped");
	}

	/// Takes the event receiver of the current run.
	///
	/// Each run has exactly one receiver; later calls return `None` until the
	/// watcher is stopped and started again. The receiver yields `None` once
	/// the watcher stops.
	pub async fn events(&self) -> Option<mpsc::Receiver<ChangeEvent>> {
		self.state.lock().await.events.take()
	}

	/// Like [`events`](Self::events), wrapped as a [`Stream`].
	pub async fn event_stream(&self) -> Option<EventStream> {
		self.events().await.map(|rx| EventStream {
			inner: tokio_stream::wrappers::ReceiverStream::new(rx),
		})
	}

	/// Returns the resolved paths currently watched.
	pub async fn paths(&self) -> Vec<PathBuf> {
		self.state.lock().await.paths.iter().cloned().collect()
	}

	pub async fn is_running(&self) -> bool {
		self.state.lock().await.run.is_some()
	}

	/// Registers `path` with a short-lived notifier so OS errors surface before `start`.
	fn check_watchable(&self, path: &Path) -> Result<()> {
		let mut notifier = notify::recommended_watcher(|_: notify::Result<notify::Event>| {})?;
		notifier
			.watch(path, self.mode())
			.map_err(|e| SignalError::watch(path, e))
	}

	fn mode(&self) -> RecursiveMode {
		if self.config.recursive {
			RecursiveMode::Recursive
		} else {
			RecursiveMode::NonRecursive
		}
	}
}

impl Drop for Watcher {
	fn drop(&mut self) {
		if let Some(run) = self.state.get_mut().run.take() {
			run.cancel.cancel();
			run.task.abort();
		}
	}
}

impl std::fmt::Debug for Watcher {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Watcher")
			.field("filter", &self.filter)
			.field("config", &self.config)
			.finish_non_exhaustive()
	}
}

/// Stream of change events for one watcher run.
pub struct EventStream {
	inner: tokio_stream::wrappers::ReceiverStream<ChangeEvent>,
}

impl Stream for EventStream {
	type Item = ChangeEvent;

	fn poll_next(
		mut self: std::pin::Pin<&mut Self>,
		cx: &mut std::task::Context<'_>,
	) -> std::task::Poll<Option<Self::Item>> {
		std::pin::Pin::new(&mut self.inner).poll_next(cx)
	}
}
