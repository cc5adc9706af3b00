//! gen_* table DDL and metadata persistence. Tables live in a schema named from `CODEGEN_SCHEMA` (default `codegen`).

use super::{check_version, unknown_column, MetadataStore};
use crate::error::AppError;
use crate::model::{
    ColumnPatch, GenColumn, GenTable, NewGenColumn, NewGenTable, Page, TableFilter, TableOptions, TablePatch,
};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{ConnectOptions, PgPool, Row};
use std::collections::HashSet;
use std::str::FromStr;

const TABLE_COLUMNS: &str = "table_id, table_name, table_comment, class_name, package_name, module_name, \
    business_name, function_name, author, template_category, options, version, created_at, updated_at";

const COLUMN_COLUMNS: &str = "column_id, table_id, column_name, column_comment, db_type, mapped_type, field_name, \
    is_pk, is_increment, is_required, is_insert, is_edit, is_list, is_query, query_operator, control_type, \
    dict_reference, sort_order";

/// Create the metadata schema if not exists, then gen_table and gen_table_column.
pub async fn ensure_gen_tables(pool: &PgPool, schema: &str) -> Result<(), AppError> {
    let schema = quote_ident(schema);
    sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", schema))
        .execute(pool)
        .await?;

    let table_ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.gen_table (
            table_id BIGSERIAL PRIMARY KEY,
            table_name TEXT NOT NULL UNIQUE,
            table_comment TEXT NOT NULL DEFAULT '',
            class_name TEXT NOT NULL,
            package_name TEXT NOT NULL,
            module_name TEXT NOT NULL,
            business_name TEXT NOT NULL,
            function_name TEXT NOT NULL,
            author TEXT NOT NULL,
            template_category TEXT NOT NULL DEFAULT 'single-table-crud',
            options JSONB NOT NULL DEFAULT '{{}}'::jsonb,
            version BIGINT NOT NULL DEFAULT 1,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
        schema
    );
    sqlx::query(&table_ddl).execute(pool).await?;

    let column_ddl = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {schema}.gen_table_column (
            column_id BIGSERIAL PRIMARY KEY,
            table_id BIGINT NOT NULL REFERENCES {schema}.gen_table (table_id) ON DELETE CASCADE,
            column_name TEXT NOT NULL,
            column_comment TEXT NOT NULL DEFAULT '',
            db_type TEXT NOT NULL,
            mapped_type TEXT NOT NULL,
            field_name TEXT NOT NULL,
            is_pk BOOLEAN NOT NULL DEFAULT FALSE,
            is_increment BOOLEAN NOT NULL DEFAULT FALSE,
            is_required BOOLEAN NOT NULL DEFAULT FALSE,
            is_insert BOOLEAN NOT NULL DEFAULT FALSE,
            is_edit BOOLEAN NOT NULL DEFAULT FALSE,
            is_list BOOLEAN NOT NULL DEFAULT FALSE,
            is_query BOOLEAN NOT NULL DEFAULT FALSE,
            query_operator TEXT NOT NULL DEFAULT 'EQ',
            control_type TEXT NOT NULL DEFAULT 'input',
            dict_reference TEXT,
            sort_order INT NOT NULL DEFAULT 0
        )
        "#,
        schema = schema
    );
    sqlx::query(&column_ddl).execute(pool).await?;
    let index_ddl = format!(
        "CREATE INDEX IF NOT EXISTS gen_table_column_table_id_idx ON {}.gen_table_column (table_id, sort_order)",
        schema
    );
    sqlx::query(&index_ddl).execute(pool).await?;
    Ok(())
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(AppError::from_catalog)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url.rfind('/').ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))? + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .map(|c| c == "23505")
        .unwrap_or(false)
}

fn table_from_row(row: &PgRow) -> Result<GenTable, AppError> {
    let category: String = row.try_get("template_category")?;
    let options: serde_json::Value = row.try_get("options")?;
    let options: TableOptions = serde_json::from_value(options)
        .map_err(|e| AppError::Validation(format!("stored table options: {}", e)))?;
    Ok(GenTable {
        table_id: row.try_get("table_id")?,
        table_name: row.try_get("table_name")?,
        table_comment: row.try_get("table_comment")?,
        class_name: row.try_get("class_name")?,
        package_name: row.try_get("package_name")?,
        module_name: row.try_get("module_name")?,
        business_name: row.try_get("business_name")?,
        function_name: row.try_get("function_name")?,
        author: row.try_get("author")?,
        template_category: category.parse()?,
        options,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn column_from_row(row: &PgRow) -> Result<GenColumn, AppError> {
    let mapped_type: String = row.try_get("mapped_type")?;
    let query_operator: String = row.try_get("query_operator")?;
    let control_type: String = row.try_get("control_type")?;
    Ok(GenColumn {
        column_id: row.try_get("column_id")?,
        table_id: row.try_get("table_id")?,
        column_name: row.try_get("column_name")?,
        column_comment: row.try_get("column_comment")?,
        db_type: row.try_get("db_type")?,
        mapped_type: mapped_type.parse()?,
        field_name: row.try_get("field_name")?,
        is_pk: row.try_get("is_pk")?,
        is_increment: row.try_get("is_increment")?,
        is_required: row.try_get("is_required")?,
        is_insert: row.try_get("is_insert")?,
        is_edit: row.try_get("is_edit")?,
        is_list: row.try_get("is_list")?,
        is_query: row.try_get("is_query")?,
        query_operator: query_operator.parse()?,
        control_type: control_type.parse()?,
        dict_reference: row.try_get("dict_reference")?,
        sort_order: row.try_get("sort_order")?,
    })
}

#[derive(Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
    schema: String,
}

impl PgMetadataStore {
    /// Does not run DDL; call [`ensure_gen_tables`] first.
    pub fn new(pool: PgPool, schema: &str) -> Self {
        PgMetadataStore {
            pool,
            schema: quote_ident(schema),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn gen_table(&self) -> String {
        format!("{}.gen_table", self.schema)
    }

    fn gen_table_column(&self) -> String {
        format!("{}.gen_table_column", self.schema)
    }

    async fn lock_table(&self, tx: &mut sqlx::PgConnection, table_id: i64) -> Result<GenTable, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE table_id = $1 FOR UPDATE", TABLE_COLUMNS, self.gen_table());
        tracing::debug!(sql = %sql, table_id, "query (tx)");
        let row = sqlx::query(&sql)
            .bind(table_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("table {}", table_id)))?;
        table_from_row(&row)
    }

    async fn columns_in(&self, conn: &mut sqlx::PgConnection, table_id: i64) -> Result<Vec<GenColumn>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE table_id = $1 ORDER BY sort_order, column_id",
            COLUMN_COLUMNS,
            self.gen_table_column()
        );
        tracing::debug!(sql = %sql, table_id, "query");
        let rows = sqlx::query(&sql).bind(table_id).fetch_all(&mut *conn).await?;
        rows.iter().map(column_from_row).collect()
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from_catalog)?;
        Ok(())
    }

    async fn imported_names(&self) -> Result<HashSet<String>, AppError> {
        let sql = format!("SELECT table_name FROM {}", self.gen_table());
        tracing::debug!(sql = %sql, "query");
        let names: Vec<String> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(names.into_iter().collect())
    }

    async fn find_by_name(&self, table_name: &str) -> Result<Option<GenTable>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE table_name = $1", TABLE_COLUMNS, self.gen_table());
        tracing::debug!(sql = %sql, table_name = %table_name, "query");
        let row = sqlx::query(&sql).bind(table_name).fetch_optional(&self.pool).await?;
        row.as_ref().map(table_from_row).transpose()
    }

    async fn insert_table(&self, table: NewGenTable, columns: Vec<NewGenColumn>) -> Result<GenTable, AppError> {
        let options = serde_json::to_value(&table.options)
            .map_err(|e| AppError::Validation(format!("table options: {}", e)))?;
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "INSERT INTO {} (table_name, table_comment, class_name, package_name, module_name, business_name, \
             function_name, author, template_category, options) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
            self.gen_table(),
            TABLE_COLUMNS
        );
        tracing::debug!(sql = %sql, table_name = %table.table_name, "query (tx)");
        let row = sqlx::query(&sql)
            .bind(&table.table_name)
            .bind(&table.table_comment)
            .bind(&table.class_name)
            .bind(&table.package_name)
            .bind(&table.module_name)
            .bind(&table.business_name)
            .bind(&table.function_name)
            .bind(&table.author)
            .bind(table.template_category.as_str())
            .bind(&options)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::Conflict(format!("table already imported: {}", table.table_name))
                } else {
                    AppError::Db(e)
                }
            })?;
        let created = table_from_row(&row)?;

        let column_sql = format!(
            "INSERT INTO {} (table_id, column_name, column_comment, db_type, mapped_type, field_name, is_pk, \
             is_increment, is_required, is_insert, is_edit, is_list, is_query, query_operator, control_type, \
             dict_reference, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
            self.gen_table_column()
        );
        for c in &columns {
            tracing::debug!(sql = %column_sql, column = %c.column_name, "query (tx)");
            sqlx::query(&column_sql)
                .bind(created.table_id)
                .bind(&c.column_name)
                .bind(&c.column_comment)
                .bind(&c.db_type)
                .bind(c.mapped_type.as_str())
                .bind(&c.field_name)
                .bind(c.is_pk)
                .bind(c.is_increment)
                .bind(c.is_required)
                .bind(c.is_insert)
                .bind(c.is_edit)
                .bind(c.is_list)
                .bind(c.is_query)
                .bind(c.query_operator.as_str())
                .bind(c.control_type.as_str())
                .bind(&c.dict_reference)
                .bind(c.sort_order)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(created)
    }

    async fn get_table(&self, table_id: i64) -> Result<Option<GenTable>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE table_id = $1", TABLE_COLUMNS, self.gen_table());
        tracing::debug!(sql = %sql, table_id, "query");
        let row = sqlx::query(&sql).bind(table_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(table_from_row).transpose()
    }

    async fn list_tables(&self, filter: &TableFilter) -> Result<Page<GenTable>, AppError> {
        let predicate = "($1::text IS NULL OR table_name ILIKE $1 ESCAPE '\\') \
                         AND ($2::text IS NULL OR table_comment ILIKE $2 ESCAPE '\\')";
        let name_pattern = filter.table_name.as_deref().map(contains_pattern);
        let comment_pattern = filter.table_comment.as_deref().map(contains_pattern);
        let count_sql = format!("SELECT COUNT(*) FROM {} WHERE {}", self.gen_table(), predicate);
        tracing::debug!(sql = %count_sql, "query");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&name_pattern)
            .bind(&comment_pattern)
            .fetch_one(&self.pool)
            .await?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY table_id LIMIT $3 OFFSET $4",
            TABLE_COLUMNS,
            self.gen_table(),
            predicate
        );
        tracing::debug!(sql = %sql, page = filter.page(), page_size = filter.page_size(), "query");
        let rows = sqlx::query(&sql)
            .bind(&name_pattern)
            .bind(&comment_pattern)
            .bind(i64::from(filter.page_size()))
            .bind(filter.offset() as i64)
            .fetch_all(&self.pool)
            .await?;
        let items = rows.iter().map(table_from_row).collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            total: total.max(0) as u64,
            page: filter.page(),
            page_size: filter.page_size(),
        })
    }

    async fn list_columns(&self, table_id: i64) -> Result<Vec<GenColumn>, AppError> {
        let mut conn = self.pool.acquire().await?;
        self.columns_in(&mut conn, table_id).await
    }

    async fn update_table(&self, table_id: i64, patch: &TablePatch) -> Result<GenTable, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut table = self.lock_table(&mut tx, table_id).await?;
        check_version(&table, patch.expected_version)?;
        patch.apply(&mut table);
        let options = serde_json::to_value(&table.options)
            .map_err(|e| AppError::Validation(format!("table options: {}", e)))?;
        let sql = format!(
            "UPDATE {} SET table_comment = $2, class_name = $3, package_name = $4, module_name = $5, \
             business_name = $6, function_name = $7, author = $8, template_category = $9, options = $10, \
             version = version + 1, updated_at = NOW() WHERE table_id = $1 RETURNING {}",
            self.gen_table(),
            TABLE_COLUMNS
        );
        tracing::debug!(sql = %sql, table_id, "query (tx)");
        let row = sqlx::query(&sql)
            .bind(table_id)
            .bind(&table.table_comment)
            .bind(&table.class_name)
            .bind(&table.package_name)
            .bind(&table.module_name)
            .bind(&table.business_name)
            .bind(&table.function_name)
            .bind(&table.author)
            .bind(table.template_category.as_str())
            .bind(&options)
            .fetch_one(&mut *tx)
            .await?;
        let updated = table_from_row(&row)?;
        tx.commit().await?;
        Ok(updated)
    }

    async fn update_columns(
        &self,
        table_id: i64,
        expected_version: Option<i64>,
        patches: &[ColumnPatch],
    ) -> Result<Vec<GenColumn>, AppError> {
        let mut tx = self.pool.begin().await?;
        let table = self.lock_table(&mut tx, table_id).await?;
        check_version(&table, expected_version)?;
        let mut columns = self.columns_in(&mut tx, table_id).await?;

        let sql = format!(
            "UPDATE {} SET column_comment = $2, mapped_type = $3, field_name = $4, is_pk = $5, is_increment = $6, \
             is_required = $7, is_insert = $8, is_edit = $9, is_list = $10, is_query = $11, query_operator = $12, \
             control_type = $13, dict_reference = $14, sort_order = $15 WHERE column_id = $1",
            self.gen_table_column()
        );
        for patch in patches {
            let column = columns
                .iter_mut()
                .find(|c| c.column_id == patch.column_id)
                .ok_or_else(|| unknown_column(table_id, patch.column_id))?;
            patch.apply(column);
            tracing::debug!(sql = %sql, column_id = column.column_id, "query (tx)");
            sqlx::query(&sql)
                .bind(column.column_id)
                .bind(&column.column_comment)
                .bind(column.mapped_type.as_str())
                .bind(&column.field_name)
                .bind(column.is_pk)
                .bind(column.is_increment)
                .bind(column.is_required)
                .bind(column.is_insert)
                .bind(column.is_edit)
                .bind(column.is_list)
                .bind(column.is_query)
                .bind(column.query_operator.as_str())
                .bind(column.control_type.as_str())
                .bind(&column.dict_reference)
                .bind(column.sort_order)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(&format!(
            "UPDATE {} SET version = version + 1, updated_at = NOW() WHERE table_id = $1",
            self.gen_table()
        ))
        .bind(table_id)
        .execute(&mut *tx)
        .await?;
        let columns = self.columns_in(&mut tx, table_id).await?;
        tx.commit().await?;
        Ok(columns)
    }

    async fn delete_tables(&self, table_ids: &[i64]) -> Result<u64, AppError> {
        if table_ids.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM {} WHERE table_id = ANY($1)", self.gen_table());
        tracing::debug!(sql = %sql, table_ids = ?table_ids, "query");
        let result = sqlx::query(&sql).bind(table_ids).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// `ILIKE ... ESCAPE '\'` pattern matching `needle` as a literal substring.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
