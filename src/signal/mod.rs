/* src/signal/mod.rs */

//!
//! Filesystem change detection and raw event fan-out.
//!
//! - [`Watcher`] turns OS notifications into a filtered [`ChangeEvent`] stream.
//! - [`Broadcaster`] delivers raw events to named [`Listener`]s.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

mod broadcast;
mod filter;
mod watcher;
mod worker;

pub use broadcast::{BroadcastError, Broadcaster, Listener};
pub use filter::Filter;
pub use watcher::{EventStream, Watcher};

/// Boxed error returned by listeners and reloadables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the watcher.
#[derive(thiserror::Error, Debug)]
pub enum SignalError {
	/// The path does not exist or could not be resolved.
	#[error("cannot watch {path:?}: {source}")]
	Path {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The OS notifier rejected the path.
	#[error("notifier failed for {path:?}: {source}")]
	Watch {
		path: PathBuf,
		#[source]
		source: notify::Error,
	},

	#[error("notifier error: {0}")]
	Notify(#[from] notify::Error),

	#[error("invalid ignore pattern: {0}")]
	Glob(#[from] globset::Error),
}

impl SignalError {
	pub(crate) fn watch(path: &Path, source: notify::Error) -> Self {
		Self::Watch {
			path: path.to_path_buf(),
			source,
		}
	}
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		format!("panicked: {s}")
	} else if let Some(s) = payload.downcast_ref::<String>() {
		format!("panicked: {s}")
	} else {
		"panicked".to_string()
	}
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, SignalError>;

/// Watcher behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
	/// Capacity of the raw and normalized event channels.
	pub capacity: usize,

	/// Watch directories recursively.
	pub recursive: bool,

	/// Extra glob patterns to suppress, matched against the full path.
	pub ignore: Vec<String>,
}

impl Default for WatchConfig {
	fn default() -> Self {
		Self {
			capacity: 100,
			recursive: false,
			ignore: Vec::new(),
		}
	}
}

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	Create,
	Write,
	Remove,
	Rename,
	Chmod,
}

impl Operation {
	/// Maps a notify event kind, or `None` for kinds that never trigger a reload.
	pub(crate) fn from_notify(kind: &notify::EventKind) -> Option<Self> {
		use notify::EventKind as NK;
		use notify::event::ModifyKind;

		match kind {
			NK::Create(_) => Some(Self::Create),
			NK::Remove(_) => Some(Self::Remove),
			NK::Modify(ModifyKind::Metadata(_)) => Some(Self::Chmod),
			NK::Modify(ModifyKind::Name(_)) => Some(Self::Rename),
			NK::Modify(_) | NK::Any => Some(Self::Write),
			NK::Access(_) | NK::Other => None,
		}
	}
}

impl std::fmt::Display for Operation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Create => "create",
			Self::Write => "write",
			Self::Remove => "remove",
			Self::Rename => "rename",
			Self::Chmod => "chmod",
		};
		f.write_str(s)
	}
}

/// A single normalized filesystem change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeEvent {
	pub path: PathBuf,
	pub op: Operation,
}

impl ChangeEvent {
	pub fn new(path: impl Into<PathBuf>, op: Operation) -> Self {
		Self {
			path: path.into(),
			op,
		}
	}
}
