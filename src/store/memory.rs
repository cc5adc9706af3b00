//! In-process metadata store. Same semantics as the PostgreSQL store, without persistence.

use super::{check_version, unknown_column, MetadataStore};
use crate::error::AppError;
use crate::model::{ColumnPatch, GenColumn, GenTable, NewGenColumn, NewGenTable, Page, TableFilter, TablePatch};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_table_id: i64,
    next_column_id: i64,
    tables: BTreeMap<i64, GenTable>,
    columns: BTreeMap<i64, Vec<GenColumn>>,
}

#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: RwLock<Inner>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        MemoryMetadataStore::default()
    }
}

fn lock_err<T>(_: T) -> AppError {
    AppError::Internal("metadata store lock poisoned".into())
}

fn sorted(mut columns: Vec<GenColumn>) -> Vec<GenColumn> {
    columns.sort_by_key(|c| (c.sort_order, c.column_id));
    columns
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn ping(&self) -> Result<(), AppError> {
        let _guard = self.inner.read().map_err(lock_err)?;
        Ok(())
    }

    async fn imported_names(&self) -> Result<HashSet<String>, AppError> {
        let guard = self.inner.read().map_err(lock_err)?;
        Ok(guard.tables.values().map(|t| t.table_name.clone()).collect())
    }

    async fn find_by_name(&self, table_name: &str) -> Result<Option<GenTable>, AppError> {
        let guard = self.inner.read().map_err(lock_err)?;
        Ok(guard.tables.values().find(|t| t.table_name == table_name).cloned())
    }

    async fn insert_table(&self, table: NewGenTable, columns: Vec<NewGenColumn>) -> Result<GenTable, AppError> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        if guard.tables.values().any(|t| t.table_name == table.table_name) {
            return Err(AppError::Conflict(format!("table already imported: {}", table.table_name)));
        }
        guard.next_table_id += 1;
        let table_id = guard.next_table_id;
        let now = Utc::now();
        let created = GenTable {
            table_id,
            table_name: table.table_name,
            table_comment: table.table_comment,
            class_name: table.class_name,
            package_name: table.package_name,
            module_name: table.module_name,
            business_name: table.business_name,
            function_name: table.function_name,
            author: table.author,
            template_category: table.template_category,
            options: table.options,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let mut rows = Vec::with_capacity(columns.len());
        for c in columns {
            guard.next_column_id += 1;
            rows.push(c.into_column(guard.next_column_id, table_id));
        }
        guard.tables.insert(table_id, created.clone());
        guard.columns.insert(table_id, rows);
        Ok(created)
    }

    async fn get_table(&self, table_id: i64) -> Result<Option<GenTable>, AppError> {
        let guard = self.inner.read().map_err(lock_err)?;
        Ok(guard.tables.get(&table_id).cloned())
    }

    async fn list_tables(&self, filter: &TableFilter) -> Result<Page<GenTable>, AppError> {
        let guard = self.inner.read().map_err(lock_err)?;
        let matching: Vec<GenTable> = guard
            .tables
            .values()
            .filter(|t| filter.matches(&t.table_name, &t.table_comment))
            .cloned()
            .collect();
        Ok(Page::from_all(matching, filter))
    }

    async fn list_columns(&self, table_id: i64) -> Result<Vec<GenColumn>, AppError> {
        let guard = self.inner.read().map_err(lock_err)?;
        Ok(sorted(guard.columns.get(&table_id).cloned().unwrap_or_default()))
    }

    async fn update_table(&self, table_id: i64, patch: &TablePatch) -> Result<GenTable, AppError> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        let table = guard
            .tables
            .get_mut(&table_id)
            .ok_or_else(|| AppError::NotFound(format!("table {}", table_id)))?;
        check_version(table, patch.expected_version)?;
        patch.apply(table);
        table.version += 1;
        table.updated_at = Utc::now();
        Ok(table.clone())
    }

    async fn update_columns(
        &self,
        table_id: i64,
        expected_version: Option<i64>,
        patches: &[ColumnPatch],
    ) -> Result<Vec<GenColumn>, AppError> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        let table = guard
            .tables
            .get(&table_id)
            .ok_or_else(|| AppError::NotFound(format!("table {}", table_id)))?;
        check_version(table, expected_version)?;

        // Patch a copy so a bad column id leaves the stored rows untouched.
        let mut columns = guard.columns.get(&table_id).cloned().unwrap_or_default();
        for patch in patches {
            let column = columns
                .iter_mut()
                .find(|c| c.column_id == patch.column_id)
                .ok_or_else(|| unknown_column(table_id, patch.column_id))?;
            patch.apply(column);
        }
        guard.columns.insert(table_id, columns.clone());
        if let Some(table) = guard.tables.get_mut(&table_id) {
            table.version += 1;
            table.updated_at = Utc::now();
        }
        Ok(sorted(columns))
    }

    async fn delete_tables(&self, table_ids: &[i64]) -> Result<u64, AppError> {
        let mut guard = self.inner.write().map_err(lock_err)?;
        let mut removed = 0;
        for id in table_ids {
            if guard.tables.remove(id).is_some() {
                removed += 1;
            }
            guard.columns.remove(id);
        }
        Ok(removed)
    }
}
