//! Metadata store: persisted GenTable/GenColumn records.

mod memory;
mod postgres;

pub use memory::MemoryMetadataStore;
pub use postgres::{ensure_database_exists, ensure_gen_tables, PgMetadataStore};

use crate::error::AppError;
use crate::model::{ColumnPatch, GenColumn, GenTable, NewGenColumn, NewGenTable, Page, TableFilter, TablePatch};
use async_trait::async_trait;
use std::collections::HashSet;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), AppError>;

    async fn imported_names(&self) -> Result<HashSet<String>, AppError>;

    async fn find_by_name(&self, table_name: &str) -> Result<Option<GenTable>, AppError>;

    /// Write one table and all of its columns atomically. A taken name is a conflict.
    async fn insert_table(&self, table: NewGenTable, columns: Vec<NewGenColumn>) -> Result<GenTable, AppError>;

    async fn get_table(&self, table_id: i64) -> Result<Option<GenTable>, AppError>;

    /// Ordered by table_id.
    async fn list_tables(&self, filter: &TableFilter) -> Result<Page<GenTable>, AppError>;

    /// Ordered by sort_order, then column_id.
    async fn list_columns(&self, table_id: i64) -> Result<Vec<GenColumn>, AppError>;

    /// Field-merge patch. Bumps the version.
    async fn update_table(&self, table_id: i64, patch: &TablePatch) -> Result<GenTable, AppError>;

    /// Identity-keyed column patches, all or nothing. Bumps the owning table's version.
    async fn update_columns(
        &self,
        table_id: i64,
        expected_version: Option<i64>,
        patches: &[ColumnPatch],
    ) -> Result<Vec<GenColumn>, AppError>;

    /// Deletes tables (and their columns). Returns the number of tables removed.
    async fn delete_tables(&self, table_ids: &[i64]) -> Result<u64, AppError>;
}

/// Optimistic concurrency check shared by both backends.
pub(crate) fn check_version(table: &GenTable, expected: Option<i64>) -> Result<(), AppError> {
    match expected {
        Some(v) if v != table.version => Err(AppError::Conflict(format!(
            "table '{}' was modified concurrently: expected version {}, current {}",
            table.table_name, v, table.version
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn unknown_column(table_id: i64, column_id: i64) -> AppError {
    AppError::NotFound(format!("column {} in table {}", column_id, table_id))
}
