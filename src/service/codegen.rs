//! Code generation service: import, edit, preview and download over a catalog and a metadata store.

use super::validation::MetadataValidator;
use crate::catalog::{CatalogReader, CatalogTable, ColumnDescriptor};
use crate::error::AppError;
use crate::mapping::{infer_column_defaults, map_db_type, seed_flags, Naming};
use crate::model::{
    ColumnPatch, GenColumn, GenTable, NewGenColumn, NewGenTable, Page, RenderedFile, TableFilter, TableOptions,
    TablePatch,
};
use crate::package::{pack, ArchiveName};
use crate::settings::{GenSettings, ImportPolicy};
use crate::store::MetadataStore;
use crate::synth::render_table;
use chrono::Utc;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Outcome of an import: what was written and which names were left alone.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: Vec<GenTable>,
    pub skipped: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TableDetail {
    pub table: GenTable,
    pub columns: Vec<GenColumn>,
}

/// A ready-to-download archive.
#[derive(Clone, Debug)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct BatchFailure {
    pub table_id: i64,
    pub reason: String,
}

#[derive(Clone, Debug)]
pub struct BatchOutcome {
    pub archive: Archive,
    pub succeeded: Vec<i64>,
    pub failures: Vec<BatchFailure>,
}

#[derive(Clone)]
pub struct CodegenService {
    catalog: Arc<dyn CatalogReader>,
    store: Arc<dyn MetadataStore>,
    settings: Arc<GenSettings>,
    naming: Naming,
}

/// Order-preserving dedupe.
fn unique<T: Clone + Eq + std::hash::Hash>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::new();
    items.iter().filter(|i| seen.insert((*i).clone())).cloned().collect()
}

fn warn_multiple_pk(table_name: &str, columns: impl Iterator<Item = (bool, String)>) {
    let flagged: Vec<String> = columns.filter(|(pk, _)| *pk).map(|(_, name)| name).collect();
    if flagged.len() > 1 {
        tracing::warn!(
            table = %table_name,
            columns = ?flagged,
            "several columns flagged as primary key; generation uses the first"
        );
    }
}

impl CodegenService {
    pub fn new(
        catalog: Arc<dyn CatalogReader>,
        store: Arc<dyn MetadataStore>,
        settings: GenSettings,
    ) -> Self {
        let naming = Naming::new(settings.table_prefixes.clone(), settings.auto_remove_prefix);
        CodegenService {
            catalog,
            store,
            settings: Arc::new(settings),
            naming,
        }
    }

    pub fn settings(&self) -> &GenSettings {
        &self.settings
    }

    /// Metadata store round trip.
    pub async fn ping(&self) -> Result<(), AppError> {
        self.store.ping().await
    }

    /// Catalog tables that are neither excluded nor already imported.
    pub async fn list_importable_tables(&self, filter: &TableFilter) -> Result<Page<CatalogTable>, AppError> {
        let all = self.catalog.list_tables(&self.settings.excluded_prefixes).await?;
        let imported = self.store.imported_names().await?;
        let importable: Vec<CatalogTable> = all
            .into_iter()
            .filter(|t| !imported.contains(&t.table_name))
            .filter(|t| filter.matches(&t.table_name, &t.table_comment))
            .collect();
        Ok(Page::from_all(importable, filter))
    }

    /// Catalog columns of one table. A name the catalog does not know is NotFound.
    pub async fn describe_table(&self, table_name: &str) -> Result<Vec<ColumnDescriptor>, AppError> {
        let columns = self.catalog.describe_table(table_name).await?;
        if columns.is_empty() {
            return Err(AppError::NotFound(format!("table not in catalog: {}", table_name)));
        }
        Ok(columns)
    }

    fn new_table(&self, table_name: &str, table_comment: &str) -> NewGenTable {
        let class_name = self.naming.class_name(table_name);
        NewGenTable {
            table_name: table_name.to_string(),
            table_comment: table_comment.to_string(),
            function_name: Naming::function_name(table_comment, &class_name),
            business_name: self.naming.business_name(table_name),
            class_name,
            package_name: self.settings.package_name.clone(),
            module_name: Naming::module_name(&self.settings.package_name),
            author: self.settings.author.clone(),
            template_category: self.settings.default_category,
            options: TableOptions::default(),
        }
    }

    fn new_column(d: &ColumnDescriptor) -> NewGenColumn {
        let defaults = infer_column_defaults(&d.column_name, &d.column_type);
        let flags = seed_flags(&d.column_name, &d.column_type, d.nullable, d.is_pk(), d.is_increment);
        NewGenColumn {
            column_name: d.column_name.clone(),
            column_comment: d.column_comment.clone(),
            db_type: d.column_type.clone(),
            mapped_type: map_db_type(&d.column_type),
            field_name: Naming::field_name(&d.column_name),
            is_pk: d.is_pk(),
            is_increment: d.is_increment,
            is_required: flags.is_required,
            is_insert: flags.is_insert,
            is_edit: flags.is_edit,
            is_list: flags.is_list,
            is_query: defaults.is_query,
            query_operator: defaults.query_operator,
            control_type: defaults.control_type,
            dict_reference: None,
            sort_order: d.ordinal_position,
        }
    }

    /// Import catalog tables by name. Every name is described before anything is written, so an
    /// unknown name fails the call without partial imports. `policy` defaults to the configured one.
    pub async fn import_tables(
        &self,
        table_names: &[String],
        policy: Option<ImportPolicy>,
    ) -> Result<ImportReport, AppError> {
        let policy = policy.unwrap_or(self.settings.import_policy);
        let names: Vec<String> = unique(
            &table_names
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect::<Vec<_>>(),
        );
        if names.is_empty() {
            return Err(AppError::Validation("no table names given".into()));
        }

        let imported = self.store.imported_names().await?;
        let (already, pending): (Vec<String>, Vec<String>) = names.into_iter().partition(|n| imported.contains(n));
        if policy == ImportPolicy::Error && !already.is_empty() {
            return Err(AppError::Validation(format!("already imported: {}", already.join(", "))));
        }

        let comments: HashMap<String, String> = self
            .catalog
            .list_tables(&[])
            .await?
            .into_iter()
            .map(|t| (t.table_name, t.table_comment))
            .collect();
        let mut described = Vec::with_capacity(pending.len());
        for name in pending {
            let columns = self.describe_table(&name).await?;
            described.push((name, columns));
        }

        let mut report = ImportReport {
            imported: Vec::new(),
            skipped: already,
        };
        for (name, descriptors) in described {
            let comment = comments.get(&name).map(String::as_str).unwrap_or("");
            let table = self.new_table(&name, comment);
            let columns: Vec<NewGenColumn> = descriptors.iter().map(Self::new_column).collect();
            warn_multiple_pk(&name, columns.iter().map(|c| (c.is_pk, c.column_name.clone())));
            match self.store.insert_table(table, columns).await {
                Ok(created) => {
                    tracing::info!(table = %created.table_name, table_id = created.table_id, "table imported");
                    report.imported.push(created);
                }
                // Lost a race with a concurrent import of the same name.
                Err(AppError::Conflict(_)) if policy == ImportPolicy::Skip => report.skipped.push(name),
                Err(AppError::Conflict(msg)) => return Err(AppError::Validation(msg)),
                Err(e) => return Err(e),
            }
        }
        if !report.skipped.is_empty() {
            tracing::info!(skipped = ?report.skipped, "already-imported tables skipped");
        }
        Ok(report)
    }

    async fn require_table(&self, table_id: i64) -> Result<GenTable, AppError> {
        self.store
            .get_table(table_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("table {}", table_id)))
    }

    pub async fn get_table_detail(&self, table_id: i64) -> Result<TableDetail, AppError> {
        let table = self.require_table(table_id).await?;
        let columns = self.store.list_columns(table_id).await?;
        Ok(TableDetail { table, columns })
    }

    pub async fn list_tables(&self, filter: &TableFilter) -> Result<Page<GenTable>, AppError> {
        self.store.list_tables(filter).await
    }

    pub async fn update_table(&self, table_id: i64, patch: &TablePatch) -> Result<GenTable, AppError> {
        let current = self.require_table(table_id).await?;
        let columns = self.store.list_columns(table_id).await?;
        let mut merged = current;
        patch.apply(&mut merged);
        MetadataValidator::validate_table(patch, &merged, &columns)?;
        self.store.update_table(table_id, patch).await
    }

    pub async fn update_columns(
        &self,
        table_id: i64,
        expected_version: Option<i64>,
        patches: &[ColumnPatch],
    ) -> Result<Vec<GenColumn>, AppError> {
        if patches.is_empty() {
            return Err(AppError::Validation("no column patches given".into()));
        }
        MetadataValidator::validate_column_patches(patches)?;
        let table = self.require_table(table_id).await?;
        let columns = self.store.update_columns(table_id, expected_version, patches).await?;
        warn_multiple_pk(&table.table_name, columns.iter().map(|c| (c.is_pk, c.column_name.clone())));
        Ok(columns)
    }

    pub async fn delete_table(&self, table_id: i64) -> Result<(), AppError> {
        match self.store.delete_tables(&[table_id]).await? {
            0 => Err(AppError::NotFound(format!("table {}", table_id))),
            _ => Ok(()),
        }
    }

    /// Returns the number of tables removed; unknown ids are ignored.
    pub async fn batch_delete(&self, table_ids: &[i64]) -> Result<u64, AppError> {
        let ids = unique(table_ids);
        if ids.is_empty() {
            return Err(AppError::Validation("no table ids given".into()));
        }
        self.store.delete_tables(&ids).await
    }

    /// Rendered files for one table. No filesystem I/O.
    pub async fn preview(&self, table_id: i64) -> Result<Vec<RenderedFile>, AppError> {
        let table = self.require_table(table_id).await?;
        let columns = self.store.list_columns(table_id).await?;
        render_table(&table, &columns)
    }

    pub async fn generate_single(&self, table_id: i64) -> Result<Archive, AppError> {
        let files = self.preview(table_id).await?;
        let (bytes, filename) = pack(&files, ArchiveName::Table(table_id))?;
        Ok(Archive { bytes, filename })
    }

    /// One archive for many tables. Unknown ids, render failures and tables whose paths are already
    /// taken by an earlier table are isolated per table; store failures abort. Fails only when no
    /// table could be rendered.
    pub async fn generate_batch(&self, table_ids: &[i64]) -> Result<BatchOutcome, AppError> {
        let ids = unique(table_ids);
        if ids.is_empty() {
            return Err(AppError::Validation("no table ids given".into()));
        }
        let mut files = Vec::new();
        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        // Archive path -> table that produced it.
        let mut owners: HashMap<String, i64> = HashMap::new();
        for id in ids {
            match self.preview(id).await {
                Ok(rendered) => {
                    let collision = rendered
                        .iter()
                        .find_map(|f| owners.get(&f.file_path).map(|owner| (f.file_path.as_str(), *owner)));
                    if let Some((path, owner)) = collision {
                        tracing::warn!(table_id = id, path = %path, owner, "table skipped in batch: path collision");
                        failures.push(BatchFailure {
                            table_id: id,
                            reason: format!("{} is already generated by table {}", path, owner),
                        });
                        continue;
                    }
                    owners.extend(rendered.iter().map(|f| (f.file_path.clone(), id)));
                    files.extend(rendered);
                    succeeded.push(id);
                }
                Err(e @ (AppError::NotFound(_) | AppError::Render { .. })) => {
                    tracing::warn!(table_id = id, error = %e, "table skipped in batch");
                    failures.push(BatchFailure {
                        table_id: id,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        if succeeded.is_empty() {
            let reasons: Vec<String> = failures
                .iter()
                .map(|f| format!("table {}: {}", f.table_id, f.reason))
                .collect();
            return Err(AppError::Validation(format!(
                "nothing could be generated: {}",
                reasons.join("; ")
            )));
        }
        let (bytes, filename) = pack(&files, ArchiveName::Batch(Utc::now()))?;
        tracing::info!(
            succeeded = succeeded.len(),
            failed = failures.len(),
            filename = %filename,
            "batch archive built"
        );
        Ok(BatchOutcome {
            archive: Archive { bytes, filename },
            succeeded,
            failures,
        })
    }
}
