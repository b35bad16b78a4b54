/* src/config.rs */

//!
//! Runtime settings for the mock server.
//!
//! Settings live in their own file (JSON, YAML or TOML) and hot-reload
//! independently from the OpenAPI document through a
//! [`LiveFile`](crate::controller::LiveFile).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::loader::PreProcess;

/// Upper bound for artificial response latency.
pub const MAX_LATENCY_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
	/// Delay added before every mocked response.
	#[validate(range(max = MAX_LATENCY_MS))]
	pub latency_ms: u64,

	/// Extra headers attached to every response.
	#[validate(custom(function = "validate_headers"))]
	pub headers: BTreeMap<String, String>,

	/// Status returned when no route matches.
	#[validate(range(min = 400, max = 599))]
	pub fallback_status: u16,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			latency_ms: 0,
			headers: BTreeMap::new(),
			fallback_status: 404,
		}
	}
}

impl Settings {
	pub fn latency(&self) -> Duration {
		Duration::from_millis(self.latency_ms)
	}
}

impl PreProcess for Settings {
	fn pre_process(&mut self) {
		self.headers = std::mem::take(&mut self.headers)
			.into_iter()
			.map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
			.collect();
	}
}

fn validate_headers(headers: &BTreeMap<String, String>) -> Result<(), ValidationError> {
	for (name, value) in headers {
		let name_ok = !name.is_empty()
			&& name
				.bytes()
				.all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
		if !name_ok {
			return Err(ValidationError::new("header_name"));
		}
		if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
			return Err(ValidationError::new("header_value"));
		}
	}
	Ok(())
}
