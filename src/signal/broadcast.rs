/* src/signal/broadcast.rs */

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{BoxError, ChangeEvent, panic_message};

/// Observer of raw change events.
///
/// Listeners see every event the watcher emits, before debouncing. They do
/// not take part in reload accounting.
#[async_trait]
pub trait Listener: Send + Sync {
	async fn on_event(&self, cancel: CancellationToken, event: ChangeEvent) -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> Listener for F
where
	F: Fn(CancellationToken, ChangeEvent) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
	async fn on_event(&self, cancel: CancellationToken, event: ChangeEvent) -> Result<(), BoxError> {
		(self)(cancel, event).await
	}
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
	#[error("listener already registered: {name}")]
	DuplicateName { name: String },

	#[error("broadcaster is closed")]
	Closed,

	/// One or more listeners returned an error; all of them still ran.
	#[error("{failed} of {total} listeners failed")]
	ListenersFailed { failed: usize, total: usize },
}

/// Fans a change event out to named listeners.
pub struct Broadcaster {
	listeners: RwLock<HashMap<String, Arc<dyn Listener>>>,
	cancel: CancellationToken,
	closed: AtomicBool,
}

impl Broadcaster {
	pub fn new() -> Self {
		Self {
			listeners: RwLock::new(HashMap::new()),
			cancel: CancellationToken::new(),
			closed: AtomicBool::new(false),
		}
	}

	/// Registers a listener under a unique name.
	pub async fn add_listener(
		&self,
		name: impl Into<String>,
		listener: impl Listener + 'static,
	) -> Result<(), BroadcastError> {
		let name = name.into();
		let mut lock = self.listeners.write().await;
		if self.closed.load(Ordering::Acquire) {
			return Err(BroadcastError::Closed);
		}
		if lock.contains_key(&name) {
			return Err(BroadcastError::DuplicateName { name });
		}
		lock.insert(name, Arc::new(listener));
		Ok(())
	}

	/// Removes a listener by name, returning whether it was registered.
	pub async fn remove_listener(&self, name: &str) -> bool {
		self.listeners.write().await.remove(name).is_some()
	}

	/// Returns the registered listener names.
	pub async fn listeners(&self) -> Vec<String> {
		self.listeners.read().await.keys().cloned().collect()
	}

	/// Runs every listener concurrently and waits for all of them.
	///
	/// A listener that errors or panics counts as failed; its siblings still
	/// run to completion.
	///
	/// If `cancel` fires mid-broadcast, listeners see their token cancelled but
	/// are still awaited.
	pub async fn broadcast(
		&self,
		cancel: &CancellationToken,
		event: &ChangeEvent,
	) -> Result<(), BroadcastError> {
		let snapshot: Vec<(String, Arc<dyn Listener>)> = {
			let lock = self.listeners.read().await;
			lock.iter()
				.map(|(name, l)| (name.clone(), Arc::clone(l)))
				.collect()
		};

		if snapshot.is_empty() {
			return Ok(());
		}

		let total = snapshot.len();
		let scope = self.cancel.child_token();
		let runs = join_all(snapshot.into_iter().map(|(name, listener)| {
			let token = scope.clone();
			let event = event.clone();
			async move {
				let res = AssertUnwindSafe(listener.on_event(token, event))
					.catch_unwind()
					.await
					.unwrap_or_else(|panic| Err(panic_message(&*panic).into()));
				(name, res)
			}
		}));
		tokio::pin!(runs);

		let results = tokio::select! {
			results = &mut runs => results,
			_ = cancel.cancelled() => {
				scope.cancel();
				runs.await
			}
		};

		let mut failed = 0;
		for (name, res) in results {
			if let Err(e) = res {
				failed += 1;
				tracing::warn!(listener = %name, path = ?event.path, error = %e, "listener failed");
			}
		}

		if failed == 0 {
			Ok(())
		} else {
			Err(BroadcastError::ListenersFailed { failed, total })
		}
	}

	/// Cancels in-flight listeners and drops all registrations.
	///
	/// Later broadcasts are no-ops; later registrations fail with [`BroadcastError::Closed`].
	pub async fn close(&self) {
		self.closed.store(true, Ordering::Release);
		self.cancel.cancel();
		self.listeners.write().await.clear();
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::Acquire)
	}
}

impl Default for Broadcaster {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Broadcaster {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Broadcaster")
			.field("closed", &self.is_closed())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::signal::Operation;
	use std::sync::atomic::AtomicUsize;
	use std::time::Duration;

	fn event() -> ChangeEvent {
		ChangeEvent::new("/d/spec.yaml", Operation::Write)
	}

	fn counting(counter: Arc<AtomicUsize>, fail: bool) -> impl Listener + 'static {
		move |_cancel: CancellationToken, _event: ChangeEvent| {
			let counter = counter.clone();
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				if fail {
					Err::<(), BoxError>("boom".into())
				} else {
					Ok(())
				}
			}
		}
	}

	#[tokio::test]
	async fn test_duplicate_listener() {
		let b = Broadcaster::new();
		let hits = Arc::new(AtomicUsize::new(0));
		b.add_listener("audit", counting(hits.clone(), false))
			.await
			.unwrap();
		let err = b
			.add_listener("audit", counting(hits, false))
			.await
			.unwrap_err();
		assert!(matches!(err, BroadcastError::DuplicateName { .. }));
	}

	#[tokio::test]
	async fn test_failures_do_not_stop_siblings() {
		let b = Broadcaster::new();
		let ok = Arc::new(AtomicUsize::new(0));
		let bad = Arc::new(AtomicUsize::new(0));
		b.add_listener("ok", counting(ok.clone(), false)).await.unwrap();
		b.add_listener("bad-1", counting(bad.clone(), true)).await.unwrap();
		b.add_listener("bad-2", counting(bad.clone(), true)).await.unwrap();

		let err = b
			.broadcast(&CancellationToken::new(), &event())
			.await
			.unwrap_err();
		match err {
			BroadcastError::ListenersFailed { failed, total } => {
				assert_eq!(failed, 2);
				assert_eq!(total, 3);
			}
			other => panic!("unexpected error: {other}"),
		}
		assert_eq!(ok.load(Ordering::SeqCst), 1);
		assert_eq!(bad.load(Ordering::SeqCst), 2);
	}

	struct Crashing;

	#[async_trait]
	impl Listener for Crashing {
		async fn on_event(&self, _cancel: CancellationToken, _event: ChangeEvent) -> Result<(), BoxError> {
			panic!("listener bug");
		}
	}

	#[tokio::test]
	async fn test_panicking_listener_counts_as_failure() {
		let b = Broadcaster::new();
		let hits = Arc::new(AtomicUsize::new(0));
		let slow_hits = hits.clone();
		b.add_listener("crash", Crashing).await.unwrap();
		b.add_listener(
			"slow",
			move |_cancel: CancellationToken, _event: ChangeEvent| {
				let hits = slow_hits.clone();
				async move {
					tokio::time::sleep(Duration::from_millis(20)).await;
					hits.fetch_add(1, Ordering::SeqCst);
					Ok::<(), BoxError>(())
				}
			},
		)
		.await
		.unwrap();

		for round in 1..=3 {
			let err = b
				.broadcast(&CancellationToken::new(), &event())
				.await
				.unwrap_err();
			assert!(matches!(
				err,
				BroadcastError::ListenersFailed {
					failed: 1,
					total: 2
				}
			));
			assert_eq!(hits.load(Ordering::SeqCst), round);
		}
	}

	#[tokio::test]
	async fn test_remove_listener_is_idempotent() {
		let b = Broadcaster::new();
		let hits = Arc::new(AtomicUsize::new(0));
		b.add_listener("a", counting(hits.clone(), false)).await.unwrap();
		assert!(b.remove_listener("a").await);
		assert!(!b.remove_listener("a").await);

		b.broadcast(&CancellationToken::new(), &event()).await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_close_makes_broadcast_noop() {
		let b = Broadcaster::new();
		let hits = Arc::new(AtomicUsize::new(0));
		b.add_listener("a", counting(hits.clone(), true)).await.unwrap();

		b.close().await;
		b.close().await;

		b.broadcast(&CancellationToken::new(), &event()).await.unwrap();
		assert_eq!(hits.load(Ordering::SeqCst), 0);
		assert!(matches!(
			b.add_listener("b", counting(hits, false)).await,
			Err(BroadcastError::Closed)
		));
	}

	#[tokio::test]
	async fn test_slow_listener_does_not_block_registration() {
		let b = Arc::new(Broadcaster::new());
		b.add_listener(
			"slow",
			|_cancel: CancellationToken, _event: ChangeEvent| async move {
				tokio::time::sleep(Duration::from_millis(200)).await;
				Ok::<(), BoxError>(())
			},
		)
		.await
		.unwrap();

		let running = {
			let b = b.clone();
			tokio::spawn(async move { b.broadcast(&CancellationToken::new(), &event()).await })
		};
		tokio::time::sleep(Duration::from_millis(20)).await;

		let hits = Arc::new(AtomicUsize::new(0));
		tokio::time::timeout(
			Duration::from_millis(100),
			b.add_listener("late", counting(hits, false)),
		)
		.await
		.expect("registration blocked by a running listener")
		.unwrap();

		running.await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn test_caller_cancel_reaches_listeners() {
		let b = Broadcaster::new();
		let seen = Arc::new(AtomicBool::new(false));
		let flag = seen.clone();
		b.add_listener("waiter", move |cancel: CancellationToken, _event: ChangeEvent| {
			let flag = flag.clone();
			async move {
				cancel.cancelled().await;
				flag.store(true, Ordering::SeqCst);
				Ok::<(), BoxError>(())
			}
		})
		.await
		.unwrap();

		let caller = CancellationToken::new();
		let trigger = caller.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			trigger.cancel();
		});

		b.broadcast(&caller, &event()).await.unwrap();
		assert!(seen.load(Ordering::SeqCst));
	}
}
