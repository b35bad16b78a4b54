/* src/signal/worker.rs */

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ChangeEvent, Filter, Operation};

/// Normalizes raw notifications until the notifier goes away or `cancel` fires.
///
/// On exit, notifications already queued are flushed without waiting on the
/// consumer, then `tx` is dropped so the consumer sees a closed channel.
pub(crate) async fn process_events(
	mut raw_rx: mpsc::Receiver<notify::Result<notify::Event>>,
	tx: mpsc::Sender<ChangeEvent>,
	filter: Filter,
	cancel: CancellationToken,
) {
	loop {
		let res = tokio::select! {
			biased;
			maybe = raw_rx.recv() => match maybe {
				Some(res) => res,
				None => break,
			},
			_ = cancel.cancelled() => break,
		};

		let event = match res {
			Ok(event) => event,
			Err(e) => {
				tracing::warn!(error = %e, "filesystem notification error");
				continue;
			}
		};

		for change in normalize(event, &filter) {
			tokio::select! {
				biased;
				sent = tx.send(change) => {
					if sent.is_err() {
						tracing::debug!("event receiver dropped, watcher worker exiting");
						return;
					}
				}
				_ = cancel.cancelled() => return,
			}
		}
	}

	while let Ok(res) = raw_rx.try_recv() {
		let Ok(event) = res else { continue };
		for change in normalize(event, &filter) {
			if tx.try_send(change).is_err() {
				return;
			}
		}
	}
}

pub(crate) fn normalize(event: notify::Event, filter: &Filter) -> Vec<ChangeEvent> {
	let Some(op) = Operation::from_notify(&event.kind) else {
		return Vec::new();
	};

	event
		.paths
		.into_iter()
		.filter(|path| filter.allows(path))
		.map(|path| ChangeEvent { path, op })
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use notify::EventKind;
	use notify::event::{CreateKind, DataChange, ModifyKind};
	use std::path::PathBuf;

	fn raw(kind: EventKind, paths: &[&str]) -> notify::Event {
		let mut event = notify::Event::new(kind);
		for p in paths {
			event = event.add_path(PathBuf::from(p));
		}
		event
	}

	#[test]
	fn test_normalize_filters_paths() {
		let event = raw(
			EventKind::Modify(ModifyKind::Data(DataChange::Content)),
			&["/d/spec.yaml", "/d/.spec.yaml.swp", "/d/4913.tmp"],
		);
		let changes = normalize(event, &Filter::default());
		assert_eq!(changes, vec![ChangeEvent::new("/d/spec.yaml", Operation::Write)]);
	}

	#[tokio::test]
	async fn test_process_events_closes_after_notifier_drops() {
		let (raw_tx, raw_rx) = mpsc::channel(8);
		let (tx, mut rx) = mpsc::channel(8);
		let task = tokio::spawn(process_events(
			raw_rx,
			tx,
			Filter::default(),
			CancellationToken::new(),
		));

		raw_tx
			.send(Ok(raw(EventKind::Create(CreateKind::File), &["/d/a.yaml"])))
			.await
			.unwrap();
		raw_tx
			.send(Ok(raw(EventKind::Create(CreateKind::File), &["/d/~a.yaml"])))
			.await
			.unwrap();
		drop(raw_tx);

		assert_eq!(
			rx.recv().await,
			Some(ChangeEvent::new("/d/a.yaml", Operation::Create))
		);
		assert_eq!(rx.recv().await, None);
		task.await.unwrap();
	}

	#[tokio::test]
	async fn test_process_events_flushes_on_cancel() {
		let (raw_tx, raw_rx) = mpsc::channel(8);
		let (tx, mut rx) = mpsc::channel(8);
		let cancel = CancellationToken::new();

		raw_tx
			.send(Ok(raw(EventKind::Create(CreateKind::File), &["/d/a.yaml"])))
			.await
			.unwrap();
		cancel.cancel();

		process_events(raw_rx, tx, Filter::default(), cancel).await;

		assert_eq!(
			rx.recv().await,
			Some(ChangeEvent::new("/d/a.yaml", Operation::Create))
		);
		assert_eq!(rx.recv().await, None);
	}
}
