/* src/reload/coordinator.rs */

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{ReloadError, ReloadReport, Reloadable};
use crate::signal::{Broadcaster, ChangeEvent, Watcher, panic_message};

/// Debounce window used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

const DEFAULT_CAPACITY: usize = 100;
const REPORT_CAPACITY: usize = 16;

/// Bridges watcher events to debounced reloads of every registered [`Reloadable`].
///
/// A burst of events is collected until no new event has arrived for the
/// debounce window (sliding: every event re-arms the timer), then all
/// reloadables run concurrently. Triggers never overlap.
pub struct Coordinator {
	watcher: Arc<Watcher>,
	shared: Arc<Shared>,
	observer: Option<Arc<Broadcaster>>,
	capacity: usize,
	lifecycle: Mutex<Option<Running>>,
}

struct Running {
	cancel: CancellationToken,
	tasks: Vec<JoinHandle<()>>,
}

struct Shared {
	reloadables: RwLock<HashMap<String, Arc<dyn Reloadable>>>,
	debounce_nanos: AtomicU64,
	/// Held for the duration of one trigger.
	gate: Mutex<()>,
	reports: broadcast::Sender<Arc<ReloadReport>>,
}

impl Coordinator {
	/// Creates a stopped coordinator driving `watcher`.
	pub fn new(watcher: Arc<Watcher>) -> Self {
		Self {
			watcher,
			shared: Arc::new(Shared::new(DEFAULT_DEBOUNCE)),
			observer: None,
			capacity: DEFAULT_CAPACITY,
			lifecycle: Mutex::new(None),
		}
	}

	pub fn with_debounce(self, debounce: Duration) -> Self {
		self.set_debounce(debounce);
		self
	}

	/// Offers every raw event to `broadcaster`. Delivery is best effort: events
	/// are dropped when observers fall `capacity` events behind.
	pub fn with_observer(mut self, broadcaster: Arc<Broadcaster>) -> Self {
		self.observer = Some(broadcaster);
		self
	}

	/// Sets the capacity of the internal event queues.
	pub fn with_capacity(mut self, capacity: usize) -> Self {
		self.capacity = capacity.max(1);
		self
	}

	pub fn watcher(&self) -> &Arc<Watcher> {
		&self.watcher
	}

	/// Registers a reloadable under its [`name`](Reloadable::name).
	///
	/// Safe to call while a reload is in flight; the new entry joins the next trigger.
	pub async fn register(&self, reloadable: Arc<dyn Reloadable>) -> Result<(), ReloadError> {
		self.shared.register(reloadable).await
	}

	/// Unregisters a reloadable, returning whether it was registered.
	pub async fn unregister(&self, name: &str) -> bool {
		self.shared.reloadables.write().await.remove(name).is_some()
	}

	/// Returns the registered names.
	pub async fn reloadables(&self) -> Vec<String> {
		self.shared.reloadables.read().await.keys().cloned().collect()
	}

	/// Changes the debounce window.
	///
	/// The new value applies the next time the timer is armed or re-armed;
	/// an already armed deadline is not moved.
	pub fn set_debounce(&self, debounce: Duration) {
		self.shared.set_debounce(debounce);
	}

	pub fn debounce(&self) -> Duration {
		self.shared.debounce()
	}

	/// Subscribes to the report of every trigger.
	pub fn subscribe(&self) -> broadcast::Receiver<Arc<ReloadReport>> {
		self.shared.reports.subscribe()
	}

	/// Starts the watcher and the event loops.
	///
	/// Cancelling `parent` has the same effect on in-flight reloads as
	/// [`stop`](Self::stop), without waiting for them.
	pub async fn start(&self, parent: &CancellationToken) -> Result<(), ReloadError> {
		let mut lifecycle = self.lifecycle.lock().await;
		if lifecycle.is_some() {
			return Err(ReloadError::AlreadyRunning);
		}

		self.watcher.start().await?;
		let Some(events) = self.watcher.events().await else {
			self.watcher.stop().await;
			return Err(ReloadError::EventsTaken);
		};

		let cancel = parent.child_token();
		let (tx, rx) = mpsc::channel(self.capacity);
		let mut tasks = Vec::with_capacity(3);

		let observe_tx = self.observer.as_ref().map(|broadcaster| {
			let (otx, orx) = mpsc::channel(self.capacity);
			tasks.push(tokio::spawn(observe(
				orx,
				Arc::clone(broadcaster),
				cancel.clone(),
			)));
			otx
		});

		tasks.push(tokio::spawn(forward(events, tx, observe_tx, cancel.clone())));
		tasks.push(tokio::spawn(coordinate(
			rx,
			Arc::clone(&self.shared),
			cancel.clone(),
		)));

		tracing::info!(debounce = ?self.debounce(), "coordinator started");
		*lifecycle = Some(Running { cancel, tasks });
		Ok(())
	}

	/// Stops the watcher and waits for every loop and in-flight reload to exit.
	///
	/// A pending, not yet triggered batch is discarded. No reload starts after
	/// this returns. Calling this while stopped is a no-op.
	pub async fn stop(&self) {
		let mut lifecycle = self.lifecycle.lock().await;
		let Some(Running { cancel, tasks }) = lifecycle.take() else {
			return;
		};

		cancel.cancel();
		self.watcher.stop().await;
		for task in tasks {
			if let Err(e) = task.await {
				tracing::warn!(error = %e, "coordinator task did not exit cleanly");
			}
		}
		tracing::info!("coordinator stopped");
	}

	pub async fn is_running(&self) -> bool {
		self.lifecycle.lock().await.is_some()
	}

	/// Reloads every registered component now, outside of any debounce window.
	pub async fn reload_now(&self) -> Arc<ReloadReport> {
		let cancel = match self.lifecycle.lock().await.as_ref() {
			Some(running) => running.cancel.clone(),
			None => CancellationToken::new(),
		};
		self.shared.trigger_reload(Vec::new(), cancel).await
	}
}

impl Drop for Coordinator {
	fn drop(&mut self) {
		if let Some(running) = self.lifecycle.get_mut().take() {
			running.cancel.cancel();
		}
	}
}

impl std::fmt::Debug for Coordinator {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Coordinator")
			.field("watcher", &self.watcher)
			.field("debounce", &self.debounce())
			.field("observed", &self.observer.is_some())
			.finish_non_exhaustive()
	}
}

impl Shared {
	fn new(debounce: Duration) -> Self {
		let shared = Self {
			reloadables: RwLock::new(HashMap::new()),
			debounce_nanos: AtomicU64::new(0),
			gate: Mutex::new(()),
			reports: broadcast::channel(REPORT_CAPACITY).0,
		};
		shared.set_debounce(debounce);
		shared
	}

	fn set_debounce(&self, debounce: Duration) {
		let nanos = u64::try_from(debounce.as_nanos()).unwrap_or(u64::MAX);
		self.debounce_nanos.store(nanos, Ordering::Relaxed);
	}

	fn debounce(&self) -> Duration {
		Duration::from_nanos(self.debounce_nanos.load(Ordering::Relaxed))
	}

	async fn register(&self, reloadable: Arc<dyn Reloadable>) -> Result<(), ReloadError> {
		let name = reloadable.name().to_string();
		let mut lock = self.reloadables.write().await;
		if lock.contains_key(&name) {
			return Err(ReloadError::DuplicateName { name });
		}
		tracing::debug!(reloadable = %name, "registered");
		lock.insert(name, reloadable);
		Ok(())
	}

	/// Runs every registered reloadable concurrently and waits for all of them.
	async fn trigger_reload(
		&self,
		events: Vec<ChangeEvent>,
		cancel: CancellationToken,
	) -> Arc<ReloadReport> {
		let _gate = self.gate.lock().await;
		let started = std::time::Instant::now();

		let targets: Vec<(String, Arc<dyn Reloadable>)> = {
			let lock = self.reloadables.read().await;
			lock.iter()
				.map(|(name, r)| (name.clone(), Arc::clone(r)))
				.collect()
		};

		tracing::info!(
			events = events.len(),
			reloadables = targets.len(),
			"reload triggered"
		);

		let mut tasks = JoinSet::new();
		for (name, reloadable) in targets {
			let token = cancel.clone();
			tasks.spawn(async move {
				let res = AssertUnwindSafe(reloadable.reload(token))
					.catch_unwind()
					.await
					.unwrap_or_else(|panic| Err(panic_message(&*panic).into()));
				(name, res)
			});
		}

		let mut report = ReloadReport {
			events,
			..ReloadReport::default()
		};

		while let Some(joined) = tasks.join_next().await {
			match joined {
				Ok((name, Ok(()))) => {
					tracing::debug!(reloadable = %name, "reloaded");
					report.succeeded.push(name);
				}
				Ok((name, Err(e))) => {
					tracing::error!(reloadable = %name, error = %e, "reload failed, keeping previous state");
					report.failed.push((name, e.to_string()));
				}
				Err(e) => {
					tracing::error!(error = %e, "reload task aborted");
				}
			}
		}
		report.succeeded.sort();
		report.failed.sort();

		report.elapsed = started.elapsed();
		if !report.failed.is_empty() {
			tracing::warn!(
				succeeded = report.succeeded.len(),
				failed = report.failed.len(),
				"reload finished with failures"
			);
		}

		let report = Arc::new(report);
		// No subscribers is fine.
		let _ = self.reports.send(Arc::clone(&report));
		report
	}
}

/// Moves watcher events onto the coordination queue and, best effort, the observer queue.
async fn forward(
	mut events: mpsc::Receiver<ChangeEvent>,
	tx: mpsc::Sender<ChangeEvent>,
	observe_tx: Option<mpsc::Sender<ChangeEvent>>,
	cancel: CancellationToken,
) {
	loop {
		let event = tokio::select! {
			_ = cancel.cancelled() => break,
			maybe = events.recv() => match maybe {
				Some(event) => event,
				None => {
					if !cancel.is_cancelled() {
						tracing::warn!("watcher event stream closed unexpectedly");
					}
					break;
				}
			},
		};

		if let Some(otx) = &observe_tx
			&& otx.try_send(event.clone()).is_err()
		{
			tracing::debug!(path = ?event.path, "observers lagging, raw event dropped");
		}

		tokio::select! {
			_ = cancel.cancelled() => break,
			sent = tx.send(event) => {
				if sent.is_err() {
					break;
				}
			}
		}
	}
}

async fn observe(
	mut rx: mpsc::Receiver<ChangeEvent>,
	broadcaster: Arc<Broadcaster>,
	cancel: CancellationToken,
) {
	loop {
		let event = tokio::select! {
			_ = cancel.cancelled() => break,
			maybe = rx.recv() => match maybe {
				Some(event) => event,
				None => break,
			},
		};

		if let Err(e) = broadcaster.broadcast(&cancel, &event).await {
			tracing::warn!(path = ?event.path, error = %e, "raw event delivery incomplete");
		}
	}
}

/// The debounce state machine. Owns the batch and the timer.
async fn coordinate(
	mut rx: mpsc::Receiver<ChangeEvent>,
	shared: Arc<Shared>,
	cancel: CancellationToken,
) {
	let mut batch: Vec<ChangeEvent> = Vec::new();
	let timer = tokio::time::sleep(Duration::ZERO);
	tokio::pin!(timer);
	let mut armed = false;
	let mut inflight = JoinSet::new();

	loop {
		tokio::select! {
			_ = cancel.cancelled() => break,
			maybe = rx.recv() => match maybe {
				Some(event) => {
					tracing::trace!(path = ?event.path, op = %event.op, "event buffered");
					batch.push(event);
					timer.as_mut().reset(Instant::now() + shared.debounce());
					armed = true;
				}
				None => break,
			},
			() = &mut timer, if armed => {
				armed = false;
				if !batch.is_empty() {
					let events = std::mem::take(&mut batch);
					let shared = Arc::clone(&shared);
					let cancel = cancel.clone();
					inflight.spawn(async move {
						shared.trigger_reload(events, cancel).await;
					});
				}
			}
			Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
				if let Err(e) = joined {
					tracing::error!(error = %e, "reload trigger aborted");
				}
			}
		}
	}

	if !batch.is_empty() {
		tracing::debug!(events = batch.len(), "discarding pending batch");
	}
	while let Some(joined) = inflight.join_next().await {
		if let Err(e) = joined {
			tracing::error!(error = %e, "reload trigger aborted");
		}
	}
}
