/* src/reload/error.rs */

use std::time::Duration;

use thiserror::Error;

use crate::signal::{BroadcastError, SignalError};

/// Errors from the reload coordinator.
#[derive(Debug, Error)]
pub enum ReloadError {
	#[error("coordinator is already running")]
	AlreadyRunning,

	#[error("reloadable already registered: {name}")]
	DuplicateName { name: String },

	#[error("watcher event stream was already taken")]
	EventsTaken,

	#[error("Signal error: {0}")]
	Signal(#[from] SignalError),
}

/// Errors from the [`Manager`](super::Manager) facade.
#[derive(Debug, Error)]
pub enum ManagerError {
	#[error(transparent)]
	Reload(#[from] ReloadError),

	#[error(transparent)]
	Signal(#[from] SignalError),

	#[error(transparent)]
	Broadcast(#[from] BroadcastError),

	#[error("shutdown did not finish within {0:?}")]
	ShutdownTimeout(Duration),
}
