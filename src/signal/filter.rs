/* src/signal/filter.rs */

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use super::Result;

/// Suppresses editor noise and user-supplied ignore globs.
///
/// A path is noise when its file name starts with `.` or `~`, or its
/// extension is `tmp` or `swp`.
#[derive(Debug, Clone, Default)]
pub struct Filter {
	ignore: Option<GlobSet>,
}

impl Filter {
	/// Builds a filter from extra glob patterns (e.g. `**/*.bak`).
	pub fn new(patterns: &[String]) -> Result<Self> {
		if patterns.is_empty() {
			return Ok(Self { ignore: None });
		}

		let mut builder = GlobSetBuilder::new();
		for p in patterns {
			builder.add(Glob::new(p)?);
		}
		Ok(Self {
			ignore: Some(builder.build()?),
		})
	}

	/// Returns true if an event for `path` should be emitted.
	pub fn allows(&self, path: &Path) -> bool {
		if is_noise(path) {
			return false;
		}

		match &self.ignore {
			Some(set) => !set.is_match(path),
			None => true,
		}
	}
}

fn is_noise(path: &Path) -> bool {
	let hidden = path
		.file_name()
		.and_then(|n| n.to_str())
		.is_some_and(|n| n.starts_with('.') || n.starts_with('~'));

	let transient = path
		.extension()
		.and_then(|e| e.to_str())
		.is_some_and(|e| e == "tmp" || e == "swp");

	hidden || transient
}
