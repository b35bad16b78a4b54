/* src/holder/cell.rs */

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use arc_swap::ArcSwap;
use tokio::sync::broadcast;

use super::{Entry, HoldEvent, Meta};

/// Default event channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 16;

/// A single atomically swappable value.
///
/// Reads are wait-free and never observe a partially built value: the new
/// value is fully constructed before [`store`](Self::store) publishes it with
/// one pointer swap. Writers are expected to be serialized by the caller
/// (one reload at a time); concurrent stores are safe but versions may then
/// be published out of order.
pub struct LiveCell<T> {
	inner: ArcSwap<Entry<T>>,
	version: AtomicU64,
	events: broadcast::Sender<HoldEvent<T>>,
}

impl<T> LiveCell<T>
where
	T: Send + Sync,
{
	/// Creates a cell holding an initial value at version 1.
	pub fn new(value: T, source: impl Into<PathBuf>) -> Self {
		let entry = Entry {
			value: Arc::new(value),
			meta: Meta {
				source: source.into(),
				loaded_at: Instant::now(),
				version: 1,
			},
		};
		Self {
			inner: ArcSwap::from_pointee(entry),
			version: AtomicU64::new(1),
			events: broadcast::channel(DEFAULT_EVENT_CAPACITY).0,
		}
	}

	/// Returns the current value. This is a wait-free operation.
	pub fn get(&self) -> Arc<T> {
		Arc::clone(&self.inner.load().value)
	}

	/// Returns the current value and its metadata as one consistent snapshot.
	pub fn entry(&self) -> Arc<Entry<T>> {
		self.inner.load_full()
	}

	pub fn meta(&self) -> Meta {
		self.inner.load().meta.clone()
	}

	/// Version of the currently published value.
	pub fn version(&self) -> u64 {
		self.inner.load().meta.version
	}

	/// Publishes a fully built value, replacing the current one.
	pub fn store(&self, value: T, source: impl Into<PathBuf>) -> Arc<T> {
		let value = Arc::new(value);
		let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
		let meta = Meta {
			source: source.into(),
			loaded_at: Instant::now(),
			version,
		};

		let old = self.inner.swap(Arc::new(Entry {
			value: Arc::clone(&value),
			meta: meta.clone(),
		}));

		// No subscribers is fine.
		let _ = self.events.send(HoldEvent::Replaced {
			old: Arc::clone(&old.value),
			new: Arc::clone(&value),
			meta,
		});

		value
	}

	/// Subscribes to publish events.
	///
	/// Events may be dropped for subscribers that fall behind.
	pub fn subscribe(&self) -> broadcast::Receiver<HoldEvent<T>> {
		self.events.subscribe()
	}
}

impl<T> std::fmt::Debug for LiveCell<T>
where
	T: std::fmt::Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let entry = self.inner.load();
		f.debug_struct("LiveCell")
			.field("value", &entry.value)
			.field("version", &entry.meta.version)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::thread;

	#[test]
	fn test_store_bumps_version() {
		let cell = LiveCell::new(1u32, "a.yaml");
		assert_eq!(*cell.get(), 1);
		assert_eq!(cell.version(), 1);

		cell.store(2, "a.yaml");
		assert_eq!(*cell.get(), 2);
		assert_eq!(cell.version(), 2);
		assert_eq!(cell.meta().source, PathBuf::from("a.yaml"));
	}

	#[test]
	fn test_reader_keeps_old_value() {
		let cell = LiveCell::new(String::from("old"), "a.yaml");
		let held = cell.get();
		cell.store(String::from("new"), "a.yaml");
		assert_eq!(*held, "old");
		assert_eq!(*cell.get(), "new");
	}

	#[test]
	fn test_readers_never_see_torn_state() {
		// Each value is a pair that must always satisfy b == a * 2.
		let cell = Arc::new(LiveCell::new((0u64, 0u64), "pairs"));
		let writer = {
			let cell = cell.clone();
			thread::spawn(move || {
				for i in 1..2_000u64 {
					cell.store((i, i * 2), "pairs");
				}
			})
		};
		let readers: Vec<_> = (0..4)
			.map(|_| {
				let cell = cell.clone();
				thread::spawn(move || {
					for _ in 0..2_000 {
						let entry = cell.entry();
						let (a, b) = *entry.value;
						assert_eq!(b, a * 2);
					}
				})
			})
			.collect();

		writer.join().unwrap();
		for r in readers {
			r.join().unwrap();
		}
		assert_eq!(*cell.get(), (1_999, 3_998));
	}

	#[tokio::test]
	async fn test_subscribe_sees_replacement() {
		let cell = LiveCell::new(1u8, "x");
		let mut rx = cell.subscribe();
		cell.store(2, "x");
		let HoldEvent::Replaced { old, new, meta } = rx.recv().await.unwrap();
		assert_eq!((*old, *new, meta.version), (1, 2, 2));
	}
}
