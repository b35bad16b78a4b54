/* src/holder/meta.rs */

use std::path::PathBuf;
use std::time::Instant;

/// Metadata describing where a published value came from.
#[derive(Debug, Clone)]
pub struct Meta {
	/// Source file path.
	pub source: PathBuf,
	/// When the value was published.
	pub loaded_at: Instant,
	/// Starts at 1 and increments on every publish.
	pub version: u64,
}
