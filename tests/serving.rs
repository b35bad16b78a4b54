/* tests/serving.rs */

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use livemock::config::Settings;
use livemock::controller::LiveFile;
use livemock::reload::{Manager, ManagerConfig, Reloadable};
use livemock::server::{MockService, VERSION_HEADER};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

const PETS_V1: &str = r#"
openapi: 3.0.3
info:
  title: Pets
  version: "1"
paths:
  /pets:
    get:
      responses:
        '200':
          description: list
          content:
            application/json:
              schema:
                type: array
                items:
                  $ref: '#/components/schemas/Pet'
  /pets/{id}:
    get:
      responses:
        '200':
          description: one
          content:
            application/json:
              example: {id: 1, name: rex}
    delete:
      responses:
        '204':
          description: gone
components:
  schemas:
    Pet:
      type: object
      properties:
        id: {type: integer, minimum: 1}
        name: {type: string}
"#;

const PETS_V2: &str = r#"
openapi: 3.0.3
info: {title: Pets, version: "2"}
paths:
  /pets/{id}:
    get:
      responses:
        '200':
          description: one
          content:
            application/json:
              example: {id: 2, name: fido}
"#;

async fn call(service: &Arc<MockService>, method: &str, uri: &str) -> Response {
	let request = Request::builder()
		.method(method)
		.uri(uri)
		.body(Body::empty())
		.unwrap();
	service.router().oneshot(request).await.unwrap()
}

async fn body(response: Response) -> serde_json::Value {
	let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&bytes).unwrap()
}

fn version(response: &Response) -> &str {
	response.headers()[VERSION_HEADER].to_str().unwrap()
}

#[tokio::test]
async fn test_serves_examples_and_errors() {
	let dir = tempfile::tempdir().unwrap();
	let spec = dir.path().join("pets.yaml");
	tokio::fs::write(&spec, PETS_V1).await.unwrap();
	let service = Arc::new(MockService::load(&spec).await.unwrap());

	let res = call(&service, "GET", "/pets").await;
	assert_eq!(res.status(), StatusCode::OK);
	assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
	assert_eq!(version(&res), "1");
	assert_eq!(body(res).await, serde_json::json!([{"id": 1, "name": "string"}]));

	let res = call(&service, "GET", "/pets/42").await;
	assert_eq!(body(res).await, serde_json::json!({"id": 1, "name": "rex"}));

	let res = call(&service, "DELETE", "/pets/42").await;
	assert_eq!(res.status(), StatusCode::NO_CONTENT);

	let res = call(&service, "POST", "/pets/42").await;
	assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
	assert_eq!(res.headers()[header::ALLOW], "GET, DELETE");

	let res = call(&service, "GET", "/owners").await;
	assert_eq!(res.status(), StatusCode::NOT_FOUND);
	assert_eq!(body(res).await["path"], "/owners");
}

#[tokio::test]
async fn test_failed_reload_keeps_serving_previous_pipeline() {
	let dir = tempfile::tempdir().unwrap();
	let spec = dir.path().join("pets.yaml");
	tokio::fs::write(&spec, PETS_V1).await.unwrap();
	let service = Arc::new(MockService::load(&spec).await.unwrap());

	// Not OpenAPI 3.
	tokio::fs::write(&spec, "openapi: '2.0'\npaths: {}\n").await.unwrap();
	assert!(service.reload(CancellationToken::new()).await.is_err());

	// Dangling reference.
	tokio::fs::write(
		&spec,
		PETS_V1.replace("#/components/schemas/Pet", "#/components/schemas/Cat"),
	)
	.await
	.unwrap();
	let err = service.reload(CancellationToken::new()).await.unwrap_err();
	assert!(err.to_string().contains("#/components/schemas/Cat"));

	let res = call(&service, "GET", "/pets/1").await;
	assert_eq!(version(&res), "1");
	assert_eq!(body(res).await["name"], "rex");

	tokio::fs::write(&spec, PETS_V2).await.unwrap();
	service.reload(CancellationToken::new()).await.unwrap();
	let res = call(&service, "GET", "/pets/1").await;
	assert_eq!(version(&res), "2");
	assert_eq!(body(res).await["name"], "fido");
	assert_eq!(call(&service, "GET", "/pets").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_apply_per_request() {
	let dir = tempfile::tempdir().unwrap();
	let spec = dir.path().join("pets.json");
	let yaml: serde_json::Value = serde_yaml::from_str(PETS_V1).unwrap();
	tokio::fs::write(&spec, serde_json::to_vec(&yaml).unwrap())
		.await
		.unwrap();

	let config = dir.path().join("settings.toml");
	tokio::fs::write(&config, "fallback_status = 418\n[headers]\nX-Mock = \"on\"\n")
		.await
		.unwrap();
	let settings = Arc::new(LiveFile::<Settings>::load(&config).await.unwrap());
	let service = Arc::new(
		MockService::load(&spec)
			.await
			.unwrap()
			.with_settings(settings.clone()),
	);

	let res = call(&service, "GET", "/nowhere").await;
	assert_eq!(res.status(), StatusCode::IM_A_TEAPOT);
	assert_eq!(res.headers()["x-mock"], "on");

	tokio::fs::write(&config, "latency_ms = 30\n").await.unwrap();
	settings.reload(CancellationToken::new()).await.unwrap();

	let started = std::time::Instant::now();
	let res = call(&service, "GET", "/nowhere").await;
	assert!(started.elapsed() >= Duration::from_millis(30));
	assert_eq!(res.status(), StatusCode::NOT_FOUND);
	assert!(res.headers().get("x-mock").is_none());
}

#[tokio::test]
async fn test_file_change_swaps_pipeline_end_to_end() {
	let dir = tempfile::tempdir().unwrap();
	let spec = dir.path().join("pets.yaml");
	tokio::fs::write(&spec, PETS_V1).await.unwrap();
	let service = Arc::new(MockService::load(&spec).await.unwrap());

	let manager = Manager::new(ManagerConfig {
		debounce: Duration::from_millis(50),
		..ManagerConfig::default()
	})
	.unwrap();
	manager.add_watch(dir.path()).await.unwrap();
	manager.register_reloadable(service.clone()).await.unwrap();
	let mut reports = manager.subscribe();
	manager.start().await.unwrap();

	tokio::fs::write(&spec, PETS_V2).await.unwrap();
	let report = timeout(Duration::from_secs(5), reports.recv())
		.await
		.expect("no reload")
		.unwrap();
	assert_eq!(report.succeeded, vec![MockService::NAME.to_string()]);

	let res = call(&service, "GET", "/pets/9").await;
	assert_eq!(body(res).await["id"], 2);

	manager.shutdown(Duration::from_secs(5)).await.unwrap();
}
