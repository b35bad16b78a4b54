/* src/reload/report.rs */

use std::time::Duration;

use crate::signal::ChangeEvent;

/// Outcome of one reload trigger.
#[derive(Debug, Clone, Default)]
pub struct ReloadReport {
	/// Events coalesced into this trigger; empty for a manual reload.
	pub events: Vec<ChangeEvent>,
	/// Reloadables that reloaded successfully.
	pub succeeded: Vec<String>,
	/// Reloadables that failed, with the error message.
	pub failed: Vec<(String, String)>,
	pub elapsed: Duration,
}

impl ReloadReport {
	pub fn is_success(&self) -> bool {
		self.failed.is_empty()
	}

	/// Returns true if the named reloadable took part in this trigger.
	pub fn includes(&self, name: &str) -> bool {
		self.succeeded.iter().any(|n| n == name) || self.failed.iter().any(|(n, _)| n == name)
	}
}
