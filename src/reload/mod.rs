/* src/reload/mod.rs */

//!
//! Debounced, concurrent reload of registered components.
//!
//! - [`Coordinator`] turns watcher bursts into one reload across all [`Reloadable`]s.
//! - [`Manager`] composes a watcher, a coordinator and a broadcaster.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::signal::BoxError;

mod coordinator;
mod error;
mod manager;
mod report;

pub use coordinator::{Coordinator, DEFAULT_DEBOUNCE};
pub use error::{ManagerError, ReloadError};
pub use manager::{Manager, ManagerConfig};
pub use report::ReloadReport;

/// A component that can rebuild and republish its own state.
///
/// `reload` must build and validate the new state completely before making
/// it visible, and leave the current state untouched when it fails. It
/// should observe `cancel` at blocking points so shutdown is prompt.
#[async_trait]
pub trait Reloadable: Send + Sync {
	/// Stable, unique name used for registration and log attribution.
	fn name(&self) -> &str;

	async fn reload(&self, cancel: CancellationToken) -> Result<(), BoxError>;
}
