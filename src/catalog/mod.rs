//! Schema catalog reader: importable tables and per-table column descriptors from the live database.

mod memory;
mod postgres;

pub use memory::StaticCatalog;
pub use postgres::PgCatalog;

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Key role of a column as reported by the catalog.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    Primary,
    Unique,
    #[default]
    None,
}

impl KeyRole {
    pub(crate) fn from_catalog(code: &str) -> Self {
        match code {
            "PRI" => KeyRole::Primary,
            "UNI" => KeyRole::Unique,
            _ => KeyRole::None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogTable {
    pub table_name: String,
    pub table_comment: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub column_name: String,
    pub column_comment: String,
    /// Raw type as the engine formats it, e.g. "character varying(30)".
    pub column_type: String,
    pub nullable: bool,
    pub key_role: KeyRole,
    pub is_increment: bool,
    /// 1-based.
    pub ordinal_position: i32,
}

impl ColumnDescriptor {
    pub fn is_pk(&self) -> bool {
        self.key_role == KeyRole::Primary
    }
}

#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// Base tables in the catalog, minus names starting with any of `excluded_prefixes`. Ordered by name.
    async fn list_tables(&self, excluded_prefixes: &[String]) -> Result<Vec<CatalogTable>, AppError>;

    /// Columns in ordinal order. Unknown tables yield an empty list.
    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>, AppError>;
}

pub(crate) fn is_excluded(table_name: &str, excluded_prefixes: &[String]) -> bool {
    let lower = table_name.to_lowercase();
    excluded_prefixes
        .iter()
        .any(|p| !p.is_empty() && lower.starts_with(&p.to_lowercase()))
}
