/* src/openapi/validate.rs */

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use super::Document;

/// Whether `key` is a valid response key: `default`, `1XX`..`5XX`, or a
/// three-digit status code in `100..=599`.
pub fn is_response_key(key: &str) -> bool {
	if key == "default" {
		return true;
	}
	let bytes = key.as_bytes();
	if bytes.len() != 3 || !(b'1'..=b'5').contains(&bytes[0]) {
		return false;
	}
	let rest = &bytes[1..];
	rest == b"XX" || rest.iter().all(u8::is_ascii_digit)
}

fn error(code: &'static str, message: String) -> ValidationError {
	let mut err = ValidationError::new(code);
	err.message = Some(Cow::Owned(message));
	err
}

impl Validate for Document {
	fn validate(&self) -> Result<(), ValidationErrors> {
		let mut errors = ValidationErrors::new();

		if !self.openapi.starts_with("3.") {
			errors.add(
				"openapi",
				error("version", format!("unsupported version {:?}", self.openapi)),
			);
		}

		for (path, item) in &self.paths {
			if !path.starts_with('/') {
				errors.add("paths", error("path", format!("{path:?} must start with '/'")));
			}
			for (method, op) in item.operations() {
				if op.responses.is_empty() {
					errors.add(
						"responses",
						error("empty", format!("{method} {path} has no responses")),
					);
				}
				for key in op.responses.keys() {
					if !is_response_key(key) {
						errors.add(
							"responses",
							error("key", format!("{method} {path} has invalid response key {key:?}")),
						);
					}
				}
			}
		}

		if errors.is_empty() { Ok(()) } else { Err(errors) }
	}
}
