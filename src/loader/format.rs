/* src/loader/format.rs */

use super::{FmtError, Format};
use serde::de::DeserializeOwned;

/// The document formats understood by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyFormat {
	/// `serde_json`
	Json,
	/// `toml`
	Toml,
	/// `serde_yaml`
	Yaml,
}

impl AnyFormat {
	/// All formats, in probing order.
	pub const ALL: [AnyFormat; 3] = [AnyFormat::Json, AnyFormat::Yaml, AnyFormat::Toml];

	/// Picks the format handling `ext` (without the dot, case-insensitive).
	pub fn from_extension(ext: &str) -> Option<Self> {
		let ext = ext.to_ascii_lowercase();
		Self::ALL
			.into_iter()
			.find(|f| f.extensions().contains(&ext.as_str()))
	}

	pub fn name(&self) -> &'static str {
		match self {
			Self::Json => "json",
			Self::Toml => "toml",
			Self::Yaml => "yaml",
		}
	}
}

impl Format for AnyFormat {
	fn extensions(&self) -> &'static [&'static str] {
		match self {
			Self::Json => &["json"],
			Self::Toml => &["toml"],
			Self::Yaml => &["yaml", "yml"],
		}
	}

	fn parse<T: DeserializeOwned>(&self, input: &[u8]) -> Result<T, FmtError> {
		let parsed = match self {
			Self::Json => serde_json::from_slice(input).map_err(|e| e.to_string()),
			Self::Yaml => serde_yaml::from_slice(input).map_err(|e| e.to_string()),
			Self::Toml => std::str::from_utf8(input)
				.map_err(|e| e.to_string())
				.and_then(|s| toml::from_str(s).map_err(|e| e.to_string())),
		};
		parsed.map_err(|msg| FmtError::ParseError(format!("{}: {}", self.name(), msg)))
	}
}
