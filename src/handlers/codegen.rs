//! Code generation handlers: imported-table metadata, catalog browsing, import, preview and download.

use crate::error::AppError;
use crate::model::{ColumnPatch, TableFilter, TablePatch};
use crate::response::{success_many, success_one, success_one_ok, success_page};
use crate::service::Archive;
use crate::settings::ImportPolicy;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

pub const SUCCEEDED_HEADER: &str = "x-codegen-succeeded";
pub const FAILED_HEADER: &str = "x-codegen-failed";

#[derive(Debug, Deserialize)]
pub struct ImportBody {
    pub table_names: Vec<String>,
    /// Overrides the configured import policy for this call.
    #[serde(default)]
    pub policy: Option<ImportPolicy>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnsBody {
    #[serde(default)]
    pub expected_version: Option<i64>,
    pub columns: Vec<ColumnPatch>,
}

#[derive(Debug, Deserialize)]
pub struct TableIdsBody {
    pub table_ids: Vec<i64>,
}

fn zip_response(archive: Archive, succeeded: usize, failed: usize) -> Result<Response, AppError> {
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", archive.filename))
        .map_err(|e| AppError::Archive(format!("invalid filename {}: {}", archive.filename, e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(CONTENT_DISPOSITION, disposition);
    headers.insert(HeaderName::from_static(SUCCEEDED_HEADER), HeaderValue::from(succeeded));
    headers.insert(HeaderName::from_static(FAILED_HEADER), HeaderValue::from(failed));
    Ok((StatusCode::OK, headers, archive.bytes).into_response())
}

/// GET /tables: imported tables, filtered by `table_name` / `table_comment`, paged.
pub async fn list_tables(
    State(state): State<AppState>,
    Query(filter): Query<TableFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_page(state.codegen.list_tables(&filter).await?))
}

/// GET /tables/:id: table metadata with its columns.
pub async fn get_table(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(state.codegen.get_table_detail(id).await?))
}

/// PATCH /tables/:id: merge present keys; `expected_version` guards against lost updates.
pub async fn patch_table(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<TablePatch>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one_ok(state.codegen.update_table(id, &patch).await?))
}

/// PUT /tables/:id/columns: column patches keyed by column_id, applied all or nothing.
pub async fn put_columns(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ColumnsBody>,
) -> Result<impl IntoResponse, AppError> {
    let columns = state
        .codegen
        .update_columns(id, body.expected_version, &body.columns)
        .await?;
    Ok(success_many(columns))
}

/// DELETE /tables/:id
pub async fn delete_table(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, AppError> {
    state.codegen.delete_table(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /tables/batch-delete
pub async fn batch_delete(
    State(state): State<AppState>,
    Json(body): Json<TableIdsBody>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.codegen.batch_delete(&body.table_ids).await?;
    Ok(success_one_ok(serde_json::json!({ "deleted": deleted })))
}

/// GET /tables/:id/preview: rendered files, nothing written anywhere.
pub async fn preview(State(state): State<AppState>, Path(id): Path<i64>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.codegen.preview(id).await?))
}

/// GET /tables/:id/download: zip of one table's artifacts.
pub async fn download_one(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, AppError> {
    let archive = state.codegen.generate_single(id).await?;
    zip_response(archive, 1, 0)
}

/// POST /download: zip of many tables. Per-table failures are counted in the response headers.
pub async fn download_batch(
    State(state): State<AppState>,
    Json(body): Json<TableIdsBody>,
) -> Result<Response, AppError> {
    let outcome = state.codegen.generate_batch(&body.table_ids).await?;
    zip_response(outcome.archive, outcome.succeeded.len(), outcome.failures.len())
}

/// GET /db/tables: catalog tables not yet imported.
pub async fn list_db_tables(
    State(state): State<AppState>,
    Query(filter): Query<TableFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_page(state.codegen.list_importable_tables(&filter).await?))
}

/// GET /db/tables/:name/columns: catalog columns, before import.
pub async fn describe_db_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.codegen.describe_table(&name).await?))
}

/// POST /import
pub async fn import_tables(
    State(state): State<AppState>,
    Json(body): Json<ImportBody>,
) -> Result<impl IntoResponse, AppError> {
    let report = state.codegen.import_tables(&body.table_names, body.policy).await?;
    Ok(success_one(report))
}
