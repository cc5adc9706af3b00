#![allow(dead_code)]

use architect_codegen::catalog::{CatalogTable, ColumnDescriptor};
use architect_codegen::model::{
    ColumnPatch, GenColumn, GenTable, NewGenColumn, NewGenTable, Page, TableFilter, TablePatch,
};
use architect_codegen::{
    AppError, CatalogReader, CodegenService, GenSettings, MemoryMetadataStore, MetadataStore, StaticCatalog,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Catalog with an order table (serial pk, varchar, datetime) and a customer table.
pub fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_table(
            "t_order",
            "Orders",
            vec![
                StaticCatalog::serial_pk("order_id", "int"),
                StaticCatalog::column("order_no", "varchar(30)"),
                StaticCatalog::column("create_time", "datetime"),
            ],
        )
        .with_table(
            "t_customer",
            "Customers",
            vec![
                StaticCatalog::serial_pk("customer_id", "bigint"),
                StaticCatalog::column("customer_name", "varchar(64)"),
            ],
        )
        .with_table("_sqlx_migrations", "", vec![StaticCatalog::column("version", "bigint")])
}

pub fn service() -> CodegenService {
    service_over(Arc::new(catalog()), Arc::new(MemoryMetadataStore::new()))
}

pub fn service_over(catalog: Arc<dyn CatalogReader>, store: Arc<dyn MetadataStore>) -> CodegenService {
    CodegenService::new(catalog, store, GenSettings::default())
}

fn unreachable() -> AppError {
    AppError::Connectivity("connection refused".into())
}

/// A catalog whose database cannot be reached.
pub struct DownCatalog;

#[async_trait]
impl CatalogReader for DownCatalog {
    async fn list_tables(&self, _excluded_prefixes: &[String]) -> Result<Vec<CatalogTable>, AppError> {
        Err(unreachable())
    }

    async fn describe_table(&self, _table_name: &str) -> Result<Vec<ColumnDescriptor>, AppError> {
        Err(unreachable())
    }
}

/// In-memory store that starts failing every read once `go_down` is called.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryMetadataStore,
    down: AtomicBool,
}

impl FlakyStore {
    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) {
            Err(unreachable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataStore for FlakyStore {
    async fn ping(&self) -> Result<(), AppError> {
        self.check()?;
        self.inner.ping().await
    }

    async fn imported_names(&self) -> Result<HashSet<String>, AppError> {
        self.check()?;
        self.inner.imported_names().await
    }

    async fn find_by_name(&self, table_name: &str) -> Result<Option<GenTable>, AppError> {
        self.check()?;
        self.inner.find_by_name(table_name).await
    }

    async fn insert_table(&self, table: NewGenTable, columns: Vec<NewGenColumn>) -> Result<GenTable, AppError> {
        self.check()?;
        self.inner.insert_table(table, columns).await
    }

    async fn get_table(&self, table_id: i64) -> Result<Option<GenTable>, AppError> {
        self.check()?;
        self.inner.get_table(table_id).await
    }

    async fn list_tables(&self, filter: &TableFilter) -> Result<Page<GenTable>, AppError> {
        self.check()?;
        self.inner.list_tables(filter).await
    }

    async fn list_columns(&self, table_id: i64) -> Result<Vec<GenColumn>, AppError> {
        self.check()?;
        self.inner.list_columns(table_id).await
    }

    async fn update_table(&self, table_id: i64, patch: &TablePatch) -> Result<GenTable, AppError> {
        self.check()?;
        self.inner.update_table(table_id, patch).await
    }

    async fn update_columns(
        &self,
        table_id: i64,
        expected_version: Option<i64>,
        patches: &[ColumnPatch],
    ) -> Result<Vec<GenColumn>, AppError> {
        self.check()?;
        self.inner.update_columns(table_id, expected_version, patches).await
    }

    async fn delete_tables(&self, table_ids: &[i64]) -> Result<u64, AppError> {
        self.check()?;
        self.inner.delete_tables(table_ids).await
    }
}
