//! Code generation routes. Mounted under `/api/v1/codegen` by [`crate::routes::app`].

use crate::handlers::codegen::{
    batch_delete, delete_table, describe_db_table, download_batch, download_one, get_table, import_tables,
    list_db_tables, list_tables, patch_table, preview, put_columns,
};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

/// Request bodies are small JSON documents.
const BODY_LIMIT: usize = 1024 * 1024;

pub fn codegen_routes(state: AppState) -> Router {
    Router::new()
        .route("/tables", get(list_tables))
        .route("/tables/batch-delete", post(batch_delete))
        .route("/tables/:id", get(get_table).patch(patch_table).delete(delete_table))
        .route("/tables/:id/columns", put(put_columns))
        .route("/tables/:id/preview", get(preview))
        .route("/tables/:id/download", get(download_one))
        .route("/download", post(download_batch))
        .route("/db/tables", get(list_db_tables))
        .route("/db/tables/:name/columns", get(describe_db_table))
        .route("/import", post(import_tables))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .with_state(state)
}
