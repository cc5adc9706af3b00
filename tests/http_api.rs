mod common;

use architect_codegen::{app, AppState, MemoryMetadataStore, StaticCatalog};
use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

fn router() -> Router {
    app(AppState::new(common::service()))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(v) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, bytes) = send(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn import_order(app: &Router) -> i64 {
    let (status, body) = send_json(
        app,
        Method::POST,
        "/api/v1/codegen/import",
        Some(json!({ "table_names": ["t_order"] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["imported"][0]["table_id"].as_i64().unwrap()
}

#[tokio::test]
async fn probes_answer() {
    let app = router();
    let (status, body) = send_json(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let (status, body) = send_json(&app, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata_store"], "ok");
}

#[tokio::test]
async fn catalog_listing_hides_excluded_and_imported_tables() {
    let app = router();
    let (status, body) = send_json(&app, Method::GET, "/api/v1/codegen/db/tables", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);

    import_order(&app).await;
    let (_, body) = send_json(&app, Method::GET, "/api/v1/codegen/db/tables", None).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["table_name"], "t_customer");

    let (status, body) = send_json(&app, Method::GET, "/api/v1/codegen/db/tables/t_order/columns", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], 3);
}

#[tokio::test]
async fn preview_returns_rendered_files() {
    let app = router();
    let id = import_order(&app).await;
    let (status, body) = send_json(&app, Method::GET, &format!("/api/v1/codegen/tables/{}/preview", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let files = body["data"].as_array().unwrap();
    assert_eq!(files.len(), 4);
    assert_eq!(files[0]["file_path"], "app/order/entity.rs");
    assert!(files[3]["content"].as_str().unwrap().contains("/order/:orderId"));
}

#[tokio::test]
async fn download_one_is_a_zip_attachment() {
    let app = router();
    let id = import_order(&app).await;
    let (status, headers, bytes) = send(&app, Method::GET, &format!("/api/v1/codegen/tables/{}/download", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        format!("attachment; filename=\"codegen_table_{}.zip\"", id).as_str()
    );
    assert_eq!(headers["x-codegen-succeeded"], "1");
    assert_eq!(zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 4);
}

#[tokio::test]
async fn batch_download_reports_partial_failures() {
    let app = router();
    let id = import_order(&app).await;
    let (status, headers, bytes) = send(
        &app,
        Method::POST,
        "/api/v1/codegen/download",
        Some(json!({ "table_ids": [id, 999] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-codegen-succeeded"], "1");
    assert_eq!(headers["x-codegen-failed"], "1");
    assert_eq!(zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 4);
}

#[tokio::test]
async fn unknown_table_is_not_found() {
    let app = router();
    let (status, body) = send_json(&app, Method::GET, "/api/v1/codegen/tables/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send_json(&app, Method::GET, "/api/v1/codegen/db/tables/t_missing/columns", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reimport_with_error_policy_is_rejected() {
    let app = router();
    import_order(&app).await;
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/v1/codegen/import",
        Some(json!({ "table_names": ["t_order"], "policy": "error" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn stale_column_edit_is_a_conflict() {
    let app = router();
    let id = import_order(&app).await;
    let (_, detail) = send_json(&app, Method::GET, &format!("/api/v1/codegen/tables/{}", id), None).await;
    let version = detail["data"]["table"]["version"].as_i64().unwrap();
    let column_id = detail["data"]["columns"][1]["column_id"].as_i64().unwrap();
    let uri = format!("/api/v1/codegen/tables/{}/columns", id);
    let body = json!({
        "expected_version": version,
        "columns": [{ "column_id": column_id, "is_list": false }]
    });

    let (status, updated) = send_json(&app, Method::PUT, &uri, Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"][1]["is_list"], false);

    let (status, err) = send_json(&app, Method::PUT, &uri, Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["error"]["code"], "conflict");
}

#[tokio::test]
async fn delete_then_batch_delete() {
    let app = router();
    let id = import_order(&app).await;
    let (status, _) = send_json(&app, Method::DELETE, &format!("/api/v1/codegen/tables/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send_json(&app, Method::DELETE, &format!("/api/v1/codegen/tables/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send_json(
        &app,
        Method::POST,
        "/api/v1/codegen/tables/batch-delete",
        Some(json!({ "table_ids": [id] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], 0);
}

#[tokio::test]
async fn unreachable_catalog_is_service_unavailable() {
    let svc = common::service_over(Arc::new(common::DownCatalog), Arc::new(MemoryMetadataStore::new()));
    let api = app(AppState::new(svc));
    let (status, body) = send_json(&api, Method::GET, "/api/v1/codegen/db/tables", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "connectivity_error");

    let (status, _) = send_json(
        &api,
        Method::POST,
        "/api/v1/codegen/import",
        Some(json!({ "table_names": ["t_order"] })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn colliding_tables_are_counted_as_failed() {
    let catalog = common::catalog().with_table(
        "sys_order",
        "",
        vec![StaticCatalog::serial_pk("order_id", "int")],
    );
    let svc = common::service_over(Arc::new(catalog), Arc::new(MemoryMetadataStore::new()));
    let api = app(AppState::new(svc));
    let (_, body) = send_json(
        &api,
        Method::POST,
        "/api/v1/codegen/import",
        Some(json!({ "table_names": ["t_order", "sys_order"] })),
    )
    .await;
    let ids: Vec<i64> = body["data"]["imported"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table_id"].as_i64().unwrap())
        .collect();
    let (status, headers, bytes) = send(&api, Method::POST, "/api/v1/codegen/download", Some(json!({ "table_ids": ids }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-codegen-succeeded"], "1");
    assert_eq!(headers["x-codegen-failed"], "1");
    assert_eq!(zip::ZipArchive::new(Cursor::new(bytes)).unwrap().len(), 4);
}

#[tokio::test]
async fn version_reports_api_prefix() {
    let (status, body) = send_json(&router(), Method::GET, "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "architect-codegen");
    assert_eq!(body["api_prefix"], "/api/v1/codegen");
}

#[tokio::test]
async fn readiness_fails_while_the_store_is_down() {
    let store = Arc::new(common::FlakyStore::default());
    let api = app(AppState::new(common::service_over(Arc::new(common::catalog()), store.clone())));
    store.go_down();
    let (status, body) = send_json(&api, Method::GET, "/ready", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["metadata_store"], "unavailable");
}
