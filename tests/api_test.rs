//! HTTP surface tests driven through the router without a listening socket.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use flowd::api::state::AppState;
use flowd::config::Config;
use flowd::dispatch::{Dispatcher, RetryPolicy};
use flowd::execution::ExecutionInstance;
use flowd::executor::{ExecutorRegistry, KIND_SHELL};
use flowd::job::JobId;
use flowd::kv::FjallKv;
use flowd::observability::Metrics;
use flowd::store::Store;

struct TestApp {
    router: Router,
    store: Store,
    _temp_dir: TempDir,
}

fn build_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let kv = Arc::new(FjallKv::open(temp_dir.path().join("kv")).unwrap());
    let store = Store::open(kv, "/flow").unwrap();

    let registry = Arc::new(ExecutorRegistry::with_defaults());
    let metrics = Arc::new(Metrics::new());

    // Dispatchers stay stopped; these tests exercise registration and
    // storage, not the tick loop.
    let mut dispatchers = BTreeMap::new();
    dispatchers.insert(
        KIND_SHELL.to_string(),
        Arc::new(Dispatcher::new(
            KIND_SHELL,
            store.clone(),
            registry,
            metrics.clone(),
            RetryPolicy::default(),
            4,
        )),
    );

    let state = AppState::new(Config::default(), store.clone(), dispatchers, metrics);
    TestApp {
        router: flowd::api::router(state),
        store,
        _temp_dir: temp_dir,
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn backup_job() -> Value {
    json!({
        "id": { "name": "backup", "namespace": "ops" },
        "schedule": { "type": "interval", "period_secs": 60 },
        "executor": "shell",
        "executorParameters": { "command": "tar czf /tmp/backup.tgz /data" }
    })
}

#[tokio::test]
async fn test_health() {
    let app = build_app();
    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_and_fetch_job() {
    let app = build_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/v1/job", backup_job()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = response_json(response).await;
    assert_eq!(created["id"]["name"], "backup");

    let response = app
        .router
        .oneshot(get("/v1/job/ops/backup"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = response_json(response).await;
    assert_eq!(fetched["executor"], "shell");
    assert_eq!(fetched["schedule"]["type"], "interval");
}

#[tokio::test]
async fn test_create_job_accepts_yaml() {
    let app = build_app();
    let body = concat!(
        "id:\n",
        "  name: reindex\n",
        "  namespace: ops\n",
        "schedule:\n",
        "  type: cron\n",
        "  expression: \"0 0 12 * * *\"\n",
        "executor: shell\n",
    );

    let request = Request::builder()
        .method("POST")
        .uri("/v1/job")
        .header(header::CONTENT_TYPE, "application/yaml")
        .body(Body::from(body))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let job = app.store.get_job(&JobId::new("ops", "reindex")).unwrap();
    assert_eq!(job.executor, "shell");
}

#[tokio::test]
async fn test_create_job_rejects_unknown_media_type() {
    let app = build_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/job")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("name,namespace"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_create_job_rejects_malformed_json() {
    let app = build_app();
    let request = Request::builder()
        .method("POST")
        .uri("/v1/job")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_job_without_schedule_is_unprocessable() {
    let app = build_app();
    let body = json!({
        "id": { "name": "orphan", "namespace": "ops" },
        "executor": "shell"
    });
    let response = app
        .router
        .oneshot(json_request("POST", "/v1/job", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_job_with_unknown_executor_is_unprocessable() {
    let app = build_app();
    let mut body = backup_job();
    body["executor"] = json!("teleport");
    let response = app
        .router
        .oneshot(json_request("POST", "/v1/job", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_jobs_with_namespace_filter() {
    let app = build_app();
    for (ns, name) in [("ops", "backup"), ("ops", "reindex"), ("data", "etl")] {
        let mut body = backup_job();
        body["id"] = json!({ "name": name, "namespace": ns });
        let response = app
            .router
            .clone()
            .oneshot(json_request("POST", "/v1/job", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app.router.clone().oneshot(get("/v1/jobs")).await.unwrap();
    let all = response_json(response).await;
    assert_eq!(all.as_array().unwrap().len(), 3);

    let response = app
        .router
        .oneshot(get("/v1/jobs?namespace=ops"))
        .await
        .unwrap();
    let filtered = response_json(response).await;
    assert_eq!(filtered.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_get_missing_job_is_404() {
    let app = build_app();
    let response = app.router.oneshot(get("/v1/job/ops/ghost")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_job() {
    let app = build_app();
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/v1/job", backup_job()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/job/ops/backup")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app.router.oneshot(get("/v1/job/ops/backup")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_missing_job_is_404() {
    let app = build_app();
    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/job/ops/ghost")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_job_executions_grouped_descending() {
    let app = build_app();
    let response = app
        .router
        .clone()
        .oneshot(json_request("POST", "/v1/job", backup_job()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let id = JobId::new("ops", "backup");
    for group in [100i64, 200] {
        let mut instance = ExecutionInstance::new(id.clone());
        instance.group = group;
        app.store.set_execution(&instance).unwrap();
    }

    let response = app
        .router
        .oneshot(get("/v1/job/ops/backup/executions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let groups = body["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["group"], 200);
    assert_eq!(groups[1]["group"], 100);
}

#[tokio::test]
async fn test_executions_for_missing_job_is_404() {
    let app = build_app();
    let response = app
        .router
        .oneshot(get("/v1/job/ops/ghost/executions"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
