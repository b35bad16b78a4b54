/* src/server/pipeline.rs */

use axum::body::Bytes;
use axum::http::{Method, StatusCode};

use super::BuildError;
use super::route::{Lookup, RouteTable};
use crate::openapi::{self, Document, Operation, Synthesizer};

const JSON: &str = "application/json";

/// A response rendered once at build time and served as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
	pub status: StatusCode,
	pub content_type: Option<String>,
	pub body: Bytes,
}

/// Everything needed to answer requests for one version of the document.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
	title: String,
	version: String,
	operations: usize,
	routes: RouteTable<CachedResponse>,
}

impl Pipeline {
	/// Compiles routes and renders one response per operation.
	pub fn build(doc: &Document) -> Result<Self, BuildError> {
		let synth = Synthesizer::new(&doc.components);
		let mut routes = RouteTable::new();
		let mut operations = 0;

		for (path, item) in &doc.paths {
			for (method, op) in item.operations() {
				let response = render(&synth, method, path, op)?;
				routes.insert(path, http_method(method), response)?;
				operations += 1;
			}
		}

		Ok(Self {
			title: doc.info.title.clone(),
			version: doc.info.version.clone(),
			operations,
			routes: routes.finish(),
		})
	}

	pub fn lookup<'t, 'p>(&'t self, method: &Method, path: &'p str) -> Lookup<'t, 'p, CachedResponse> {
		self.routes.lookup(method, path)
	}

	pub fn title(&self) -> &str {
		&self.title
	}

	/// `info.version` of the source document.
	pub fn api_version(&self) -> &str {
		&self.version
	}

	pub fn operation_count(&self) -> usize {
		self.operations
	}

	pub fn route_count(&self) -> usize {
		self.routes.len()
	}
}

fn http_method(method: openapi::Method) -> Method {
	match method {
		openapi::Method::Get => Method::GET,
		openapi::Method::Put => Method::PUT,
		openapi::Method::Post => Method::POST,
		openapi::Method::Delete => Method::DELETE,
		openapi::Method::Options => Method::OPTIONS,
		openapi::Method::Head => Method::HEAD,
		openapi::Method::Patch => Method::PATCH,
		openapi::Method::Trace => Method::TRACE,
	}
}

/// Orders response keys: 2XX codes, then `default`, then everything else.
fn preference(key: &str) -> Option<(u8, u16)> {
	if key == "default" {
		return Some((1, 200));
	}
	if !openapi::is_response_key(key) {
		return None;
	}
	let code = match key.strip_suffix("XX") {
		Some(class) => class.parse::<u16>().ok()? * 100,
		None => key.parse::<u16>().ok()?,
	};
	let tier = if (200..300).contains(&code) { 0 } else { 2 };
	Some((tier, code))
}

fn render(
	synth: &Synthesizer<'_>,
	method: openapi::Method,
	path: &str,
	op: &Operation,
) -> Result<CachedResponse, BuildError> {
	let mut best = None;
	for (key, response) in &op.responses {
		let rank = preference(key).ok_or_else(|| BuildError::ResponseKey {
			method: method.to_string(),
			path: path.to_string(),
			key: key.clone(),
		})?;
		if best.as_ref().is_none_or(|(r, _)| rank < *r) {
			best = Some((rank, response));
		}
	}

	let Some(((_, code), response)) = best else {
		return Ok(CachedResponse {
			status: StatusCode::OK,
			content_type: None,
			body: Bytes::new(),
		});
	};
	let status = StatusCode::from_u16(code).unwrap_or(StatusCode::OK);

	let media = response
		.content
		.get_key_value(JSON)
		.or_else(|| response.content.first());
	let Some((content_type, media)) = media else {
		return Ok(CachedResponse {
			status,
			content_type: None,
			body: Bytes::new(),
		});
	};

	let example = synth.media(media).map_err(|source| BuildError::Example {
		method: method.to_string(),
		path: path.to_string(),
		source,
	})?;

	let body = match example {
		None => Bytes::new(),
		_ if !allows_body(status) => Bytes::new(),
		Some(serde_json::Value::String(text)) if !content_type.contains("json") => Bytes::from(text),
		Some(value) => Bytes::from(serde_json::to_vec(&value)?),
	};

	Ok(CachedResponse {
		status,
		content_type: (!body.is_empty()).then(|| content_type.clone()),
		body,
	})
}

fn allows_body(status: StatusCode) -> bool {
	!(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}
