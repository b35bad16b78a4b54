/* src/server/handler.rs */

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::MockService;
use super::route::Lookup;

/// Carries the version of the pipeline that answered.
pub const VERSION_HEADER: &str = "x-livemock-version";

/// Fallback handler answering every request from the current pipeline.
///
/// The pipeline and the settings are each read once, so a reload landing
/// mid-request never mixes two versions in one response.
pub(crate) async fn serve_mock(
	State(service): State<Arc<MockService>>,
	method: Method,
	uri: Uri,
) -> Response {
	let entry = service.pipeline().entry();
	let settings = service.settings();
	let path = uri.path();

	if !settings.latency().is_zero() {
		tokio::time::sleep(settings.latency()).await;
	}

	let mut lookup = entry.value.lookup(&method, path);
	if method == Method::HEAD && !matches!(lookup, Lookup::Found { .. }) {
		lookup = entry.value.lookup(&Method::GET, path);
	}

	let mut response = match lookup {
		Lookup::Found { template, value, .. } => {
			tracing::debug!(%method, path, template, status = value.status.as_u16(), "mocked");
			let mut response = Response::new(Body::from(value.body.clone()));
			*response.status_mut() = value.status;
			if let Some(ct) = value.content_type.as_deref().and_then(|ct| HeaderValue::from_str(ct).ok()) {
				response.headers_mut().insert(header::CONTENT_TYPE, ct);
			}
			response
		}
		Lookup::MethodNotAllowed { allow } => {
			tracing::debug!(%method, path, "method not allowed");
			let allow = allow.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
			let mut response = (
				StatusCode::METHOD_NOT_ALLOWED,
				axum::Json(json!({"error": "method not allowed", "method": method.as_str(), "path": path})),
			)
				.into_response();
			if let Ok(value) = HeaderValue::from_str(&allow) {
				response.headers_mut().insert(header::ALLOW, value);
			}
			response
		}
		Lookup::NotFound => {
			tracing::debug!(%method, path, "no route");
			let status = StatusCode::from_u16(settings.fallback_status).unwrap_or(StatusCode::NOT_FOUND);
			(status, axum::Json(json!({"error": "not found", "path": path}))).into_response()
		}
	};

	apply_headers(response.headers_mut(), &settings.headers);
	response
		.headers_mut()
		.insert(VERSION_HEADER, HeaderValue::from(entry.meta.version));
	response
}

fn apply_headers<'a>(target: &mut HeaderMap, extra: impl IntoIterator<Item = (&'a String, &'a String)>) {
	for (name, value) in extra {
		match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
			(Ok(name), Ok(value)) => {
				target.insert(name, value);
			}
			_ => tracing::warn!(header = %name, "skipping invalid header"),
		}
	}
}
