/* src/openapi/document.rs */

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::loader::PreProcess;

/// Root of an OpenAPI 3.x document.
///
/// Only the parts needed to mock responses are modeled; everything else is
/// ignored on deserialization. Maps keep declaration order.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
	pub openapi: String,
	#[serde(default)]
	pub info: Info,
	#[serde(default)]
	pub paths: IndexMap<String, PathItem>,
	#[serde(default)]
	pub components: Components,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Info {
	#[serde(default)]
	pub title: String,
	#[serde(default)]
	pub version: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathItem {
	pub get: Option<Operation>,
	pub put: Option<Operation>,
	pub post: Option<Operation>,
	pub delete: Option<Operation>,
	pub options: Option<Operation>,
	pub head: Option<Operation>,
	pub patch: Option<Operation>,
	pub trace: Option<Operation>,
}

impl PathItem {
	/// Defined operations in a fixed method order.
	pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
		[
			(Method::Get, &self.get),
			(Method::Put, &self.put),
			(Method::Post, &self.post),
			(Method::Delete, &self.delete),
			(Method::Options, &self.options),
			(Method::Head, &self.head),
			(Method::Patch, &self.patch),
			(Method::Trace, &self.trace),
		]
		.into_iter()
		.filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
	pub operation_id: Option<String>,
	pub summary: Option<String>,
	#[serde(default)]
	pub responses: IndexMap<String, Response>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Response {
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
	pub schema: Option<Value>,
	pub example: Option<Value>,
	#[serde(default)]
	pub examples: IndexMap<String, ExampleObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExampleObject {
	pub summary: Option<String>,
	pub value: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Components {
	#[serde(default)]
	pub schemas: BTreeMap<String, Value>,
}

/// HTTP methods an OpenAPI path item can define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
	Get,
	Put,
	Post,
	Delete,
	Options,
	Head,
	Patch,
	Trace,
}

impl Method {
	pub fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Put => "PUT",
			Method::Post => "POST",
			Method::Delete => "DELETE",
			Method::Options => "OPTIONS",
			Method::Head => "HEAD",
			Method::Patch => "PATCH",
			Method::Trace => "TRACE",
		}
	}
}

impl fmt::Display for Method {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Document {
	/// Number of operations across all paths.
	pub fn operation_count(&self) -> usize {
		self.paths.values().map(|item| item.operations().count()).sum()
	}
}

impl PreProcess for Document {
	fn pre_process(&mut self) {
		self.openapi = self.openapi.trim().to_string();
	}
}
