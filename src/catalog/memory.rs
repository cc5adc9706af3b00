//! In-memory catalog: a fixed set of table definitions. Used by embedders without a live database and by tests.

use super::{is_excluded, CatalogReader, CatalogTable, ColumnDescriptor, KeyRole};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct StaticCatalog {
    tables: BTreeMap<String, (String, Vec<ColumnDescriptor>)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        StaticCatalog::default()
    }

    /// Add or replace a table. Ordinal positions are assigned from slice order.
    pub fn with_table(mut self, table_name: &str, table_comment: &str, columns: Vec<ColumnDescriptor>) -> Self {
        let columns = columns
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.ordinal_position = i as i32 + 1;
                c
            })
            .collect();
        self.tables
            .insert(table_name.to_string(), (table_comment.to_string(), columns));
        self
    }

    /// Shorthand column: `(name, raw type)`, nullable, no key role.
    pub fn column(name: &str, column_type: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            column_name: name.to_string(),
            column_comment: String::new(),
            column_type: column_type.to_string(),
            nullable: true,
            key_role: KeyRole::None,
            is_increment: false,
            ordinal_position: 0,
        }
    }

    /// Shorthand for an autoincrement primary key column.
    pub fn serial_pk(name: &str, column_type: &str) -> ColumnDescriptor {
        ColumnDescriptor {
            nullable: false,
            key_role: KeyRole::Primary,
            is_increment: true,
            ..Self::column(name, column_type)
        }
    }
}

#[async_trait]
impl CatalogReader for StaticCatalog {
    async fn list_tables(&self, excluded_prefixes: &[String]) -> Result<Vec<CatalogTable>, AppError> {
        Ok(self
            .tables
            .iter()
            .filter(|(name, _)| !is_excluded(name, excluded_prefixes))
            .map(|(name, (comment, _))| CatalogTable {
                table_name: name.clone(),
                table_comment: comment.clone(),
            })
            .collect())
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>, AppError> {
        Ok(self
            .tables
            .get(table_name)
            .map(|(_, cols)| cols.clone())
            .unwrap_or_default())
    }
}
