//! PostgreSQL catalog reader. Scoped to one schema; reads pg_catalog directly.

use super::{is_excluded, CatalogReader, CatalogTable, ColumnDescriptor, KeyRole};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

const LIST_TABLES_SQL: &str = r#"
    SELECT c.relname::text AS table_name,
           COALESCE(obj_description(c.oid, 'pg_class'), '') AS table_comment
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relkind IN ('r', 'p')
      AND NOT c.relispartition
    ORDER BY c.relname
"#;

const DESCRIBE_TABLE_SQL: &str = r#"
    SELECT a.attname::text AS column_name,
           COALESCE(col_description(a.attrelid, a.attnum), '') AS column_comment,
           format_type(a.atttypid, a.atttypmod) AS column_type,
           NOT a.attnotnull AS nullable,
           CASE
               WHEN EXISTS (
                   SELECT 1 FROM pg_catalog.pg_index i
                   WHERE i.indrelid = a.attrelid AND i.indisprimary AND a.attnum = ANY(i.indkey)
               ) THEN 'PRI'
               WHEN EXISTS (
                   SELECT 1 FROM pg_catalog.pg_index i
                   WHERE i.indrelid = a.attrelid AND i.indisunique AND i.indnatts = 1 AND a.attnum = ANY(i.indkey)
               ) THEN 'UNI'
               ELSE ''
           END AS key_role,
           (a.attidentity <> '' OR COALESCE(pg_get_expr(d.adbin, d.adrelid), '') LIKE 'nextval(%') AS is_increment,
           a.attnum::int4 AS ordinal_position
    FROM pg_catalog.pg_attribute a
    JOIN pg_catalog.pg_class c ON c.oid = a.attrelid
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
    WHERE n.nspname = $1
      AND c.relname = $2
      AND a.attnum > 0
      AND NOT a.attisdropped
    ORDER BY a.attnum
"#;

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
    schema: String,
}

impl PgCatalog {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgCatalog {
            pool,
            schema: schema.into(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }
}

#[async_trait]
impl CatalogReader for PgCatalog {
    async fn list_tables(&self, excluded_prefixes: &[String]) -> Result<Vec<CatalogTable>, AppError> {
        tracing::debug!(sql = %LIST_TABLES_SQL, schema = %self.schema, "catalog query");
        let rows: Vec<(String, String)> = sqlx::query_as(LIST_TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from_catalog)?;
        Ok(rows
            .into_iter()
            .filter(|(name, _)| !is_excluded(name, excluded_prefixes))
            .map(|(table_name, table_comment)| CatalogTable {
                table_name,
                table_comment,
            })
            .collect())
    }

    async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>, AppError> {
        tracing::debug!(sql = %DESCRIBE_TABLE_SQL, schema = %self.schema, table = %table_name, "catalog query");
        let rows: Vec<(String, String, String, bool, String, bool, i32)> = sqlx::query_as(DESCRIBE_TABLE_SQL)
            .bind(&self.schema)
            .bind(table_name)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from_catalog)?;
        Ok(rows
            .into_iter()
            .map(
                |(column_name, column_comment, column_type, nullable, key_role, is_increment, ordinal_position)| {
                    ColumnDescriptor {
                        column_name,
                        column_comment,
                        column_type,
                        nullable,
                        key_role: KeyRole::from_catalog(&key_role),
                        is_increment,
                        ordinal_position,
                    }
                },
            )
            .collect())
    }
}
