/* src/openapi/example.rs */

use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::{Components, MediaType};

/// How many `$ref` hops are followed before a branch is cut off with `null`.
pub const MAX_REF_DEPTH: usize = 8;

const SCHEMA_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExampleError {
	#[error("unresolvable reference {0:?}")]
	UnresolvedRef(String),
}

/// Produces example payloads for media types of one document.
#[derive(Debug, Clone, Copy)]
pub struct Synthesizer<'a> {
	components: &'a Components,
}

impl<'a> Synthesizer<'a> {
	pub fn new(components: &'a Components) -> Self {
		Self { components }
	}

	/// Explicit `example` first, then the first `examples` value, then the schema.
	///
	/// Returns `None` when the media type carries nothing to build from.
	pub fn media(&self, media: &MediaType) -> Result<Option<Value>, ExampleError> {
		if let Some(example) = &media.example {
			return Ok(Some(example.clone()));
		}
		if let Some(value) = media.examples.values().find_map(|e| e.value.as_ref()) {
			return Ok(Some(value.clone()));
		}
		media.schema.as_ref().map(|s| self.schema(s)).transpose()
	}

	pub fn schema(&self, schema: &Value) -> Result<Value, ExampleError> {
		self.walk(schema, 0)
	}

	fn walk(&self, schema: &Value, depth: usize) -> Result<Value, ExampleError> {
		let Some(obj) = schema.as_object() else {
			// `true`, `false` and anything malformed.
			return Ok(Value::Null);
		};

		if let Some(v) = obj.get("example").or_else(|| obj.get("default")) {
			return Ok(v.clone());
		}
		if let Some(first) = obj.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
			return Ok(first.clone());
		}
		if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
			return self.follow(reference, depth);
		}
		if let Some(parts) = obj.get("allOf").and_then(Value::as_array) {
			return self.merge(parts, depth);
		}
		for key in ["oneOf", "anyOf"] {
			if let Some(first) = obj.get(key).and_then(Value::as_array).and_then(|a| a.first()) {
				return self.walk(first, depth);
			}
		}

		match schema_type(obj) {
			Some("object") => self.object(obj, depth),
			Some("array") => match obj.get("items") {
				Some(items) => Ok(Value::Array(vec![self.walk(items, depth)?])),
				None => Ok(Value::Array(Vec::new())),
			},
			Some("string") => Ok(Value::String(string_for(obj).to_string())),
			Some("integer") => Ok(Value::Number(
				obj.get("minimum")
					.and_then(Value::as_i64)
					.map(Number::from)
					.unwrap_or_else(|| Number::from(0)),
			)),
			Some("number") => Ok(obj
				.get("minimum")
				.filter(|m| m.is_number())
				.cloned()
				.unwrap_or_else(|| Value::from(0.0))),
			Some("boolean") => Ok(Value::Bool(true)),
			None if obj.contains_key("properties") => self.object(obj, depth),
			_ => Ok(Value::Null),
		}
	}

	fn follow(&self, reference: &str, depth: usize) -> Result<Value, ExampleError> {
		let target = reference
			.strip_prefix(SCHEMA_PREFIX)
			.and_then(|name| self.components.schemas.get(name))
			.ok_or_else(|| ExampleError::UnresolvedRef(reference.to_string()))?;
		if depth >= MAX_REF_DEPTH {
			return Ok(Value::Null);
		}
		self.walk(target, depth + 1)
	}

	fn merge(&self, parts: &[Value], depth: usize) -> Result<Value, ExampleError> {
		let mut merged = Map::new();
		let mut last = Value::Null;
		for part in parts {
			match self.walk(part, depth)? {
				Value::Object(map) => merged.extend(map),
				other => last = other,
			}
		}
		if merged.is_empty() { Ok(last) } else { Ok(Value::Object(merged)) }
	}

	fn object(&self, obj: &Map<String, Value>, depth: usize) -> Result<Value, ExampleError> {
		let mut out = Map::new();
		if let Some(props) = obj.get("properties").and_then(Value::as_object) {
			for (name, prop) in props {
				out.insert(name.clone(), self.walk(prop, depth)?);
			}
		}
		Ok(Value::Object(out))
	}
}

/// `type` may be a string or, in 3.1 documents, a list such as `["string", "null"]`.
fn schema_type(obj: &Map<String, Value>) -> Option<&str> {
	match obj.get("type")? {
		Value::String(t) => Some(t),
		Value::Array(types) => types
			.iter()
			.filter_map(Value::as_str)
			.find(|t| *t != "null")
			.or(Some("null")),
		_ => None,
	}
}

fn string_for(obj: &Map<String, Value>) -> &'static str {
	match obj.get("format").and_then(Value::as_str) {
		Some("date-time") => "2024-01-01T00:00:00Z",
		Some("date") => "2024-01-01",
		Some("email") => "user@example.com",
		Some("uuid") => "00000000-0000-4000-8000-000000000000",
		Some("uri") | Some("url") => "https://example.com",
		_ => "string",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn components(schemas: Value) -> Components {
		Components {
			schemas: serde_json::from_value(schemas).unwrap(),
		}
	}

	#[test]
	fn test_media_precedence() {
		let c = Components::default();
		let synth = Synthesizer::new(&c);

		let media: MediaType = serde_json::from_value(json!({
			"example": {"a": 1},
			"examples": {"one": {"value": {"b": 2}}},
			"schema": {"type": "string"}
		}))
		.unwrap();
		assert_eq!(synth.media(&media).unwrap(), Some(json!({"a": 1})));

		let media: MediaType = serde_json::from_value(json!({
			"examples": {"empty": {"summary": "nothing"}, "one": {"value": [1]}},
			"schema": {"type": "string"}
		}))
		.unwrap();
		assert_eq!(synth.media(&media).unwrap(), Some(json!([1])));

		assert_eq!(synth.media(&MediaType::default()).unwrap(), None);
	}

	#[test]
	fn test_schema_placeholders() {
		let c = Components::default();
		let synth = Synthesizer::new(&c);
		let schema = json!({
			"type": "object",
			"properties": {
				"id": {"type": "string", "format": "uuid"},
				"age": {"type": "integer", "minimum": 18},
				"score": {"type": "number"},
				"kind": {"type": "string", "enum": ["cat", "dog"]},
				"tags": {"type": "array", "items": {"type": "string"}},
				"born": {"type": "string", "format": "date"},
				"nick": {"type": ["string", "null"], "default": "rex"},
				"ok": {"type": "boolean"}
			}
		});
		assert_eq!(
			synth.schema(&schema).unwrap(),
			json!({
				"id": "00000000-0000-4000-8000-000000000000",
				"age": 18,
				"score": 0.0,
				"kind": "cat",
				"tags": ["string"],
				"born": "2024-01-01",
				"nick": "rex",
				"ok": true
			})
		);
	}

	#[test]
	fn test_refs_compose_and_cycles_stop() {
		let c = components(json!({
			"Named": {"type": "object", "properties": {"name": {"type": "string"}}},
			"Pet": {"allOf": [
				{"$ref": "#/components/schemas/Named"},
				{"properties": {"email": {"type": "string", "format": "email"}}}
			]},
			"Node": {"type": "object", "properties": {"next": {"$ref": "#/components/schemas/Node"}}},
			"Either": {"oneOf": [{"type": "integer"}, {"type": "string"}]}
		}));
		let synth = Synthesizer::new(&c);

		assert_eq!(
			synth.schema(&json!({"$ref": "#/components/schemas/Pet"})).unwrap(),
			json!({"name": "string", "email": "user@example.com"})
		);
		assert_eq!(
			synth.schema(&json!({"$ref": "#/components/schemas/Either"})).unwrap(),
			json!(0)
		);

		let mut node = synth.schema(&json!({"$ref": "#/components/schemas/Node"})).unwrap();
		let mut hops = 0;
		while let Some(next) = node.get("next").cloned() {
			node = next;
			hops += 1;
		}
		assert_eq!(node, Value::Null);
		assert_eq!(hops, MAX_REF_DEPTH);
	}

	#[test]
	fn test_unresolved_ref_fails() {
		let c = Components::default();
		let synth = Synthesizer::new(&c);
		assert_eq!(
			synth.schema(&json!({"$ref": "#/components/schemas/Missing"})),
			Err(ExampleError::UnresolvedRef("#/components/schemas/Missing".to_string()))
		);
		assert!(synth.schema(&json!({"$ref": "other.yaml#/Pet"})).is_err());
	}
}
