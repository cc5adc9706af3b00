//! Generator settings from environment. Every key has a default so an empty environment works.

use crate::model::TemplateCategory;
use std::str::FromStr;

/// What `import_tables` does with a name that is already imported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPolicy {
    /// Leave the existing row alone and report the name as skipped.
    #[default]
    Skip,
    /// Reject the whole import with a validation error naming the table.
    Error,
}

impl FromStr for ImportPolicy {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(ImportPolicy::Skip),
            "error" => Ok(ImportPolicy::Error),
            _ => Err(crate::error::AppError::BadRequest(format!(
                "invalid import policy: {} (expected skip or error)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenSettings {
    /// Schema holding the gen_* metadata tables (`CODEGEN_SCHEMA`).
    pub store_schema: String,
    /// Schema the catalog reader introspects (`CODEGEN_CATALOG_SCHEMA`).
    pub catalog_schema: String,
    pub author: String,
    pub package_name: String,
    /// Strip `table_prefixes` when deriving class/business names.
    pub auto_remove_prefix: bool,
    pub table_prefixes: Vec<String>,
    /// Catalog tables starting with any of these are never importable.
    pub excluded_prefixes: Vec<String>,
    pub import_policy: ImportPolicy,
    pub default_category: TemplateCategory,
}

impl Default for GenSettings {
    fn default() -> Self {
        GenSettings {
            store_schema: "codegen".into(),
            catalog_schema: "public".into(),
            author: "architect".into(),
            package_name: "app".into(),
            auto_remove_prefix: true,
            table_prefixes: vec!["sys_".into(), "t_".into()],
            excluded_prefixes: vec![
                "_sqlx".into(),
                "_sys_".into(),
                "gen_".into(),
                "qrtz_".into(),
                "pg_".into(),
            ],
            import_policy: ImportPolicy::Skip,
            default_category: TemplateCategory::SingleTableCrud,
        }
    }
}

impl GenSettings {
    /// Read `CODEGEN_*` variables. Unparseable values fall back to the default with a warning.
    pub fn from_env() -> Self {
        let d = GenSettings::default();
        GenSettings {
            store_schema: env_or("CODEGEN_SCHEMA", d.store_schema),
            catalog_schema: env_or("CODEGEN_CATALOG_SCHEMA", d.catalog_schema),
            author: env_or("CODEGEN_AUTHOR", d.author),
            package_name: env_or("CODEGEN_PACKAGE_NAME", d.package_name),
            auto_remove_prefix: env_parsed("CODEGEN_AUTO_REMOVE_PREFIX", d.auto_remove_prefix),
            table_prefixes: env_list("CODEGEN_TABLE_PREFIXES").unwrap_or(d.table_prefixes),
            excluded_prefixes: env_list("CODEGEN_EXCLUDED_PREFIXES").unwrap_or(d.excluded_prefixes),
            import_policy: env_parsed("CODEGEN_IMPORT_POLICY", d.import_policy),
            default_category: env_parsed("CODEGEN_TEMPLATE_CATEGORY", d.default_category),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{}: cannot parse '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}

/// Comma separated list; unset means "use default", set-but-empty means "no entries".
fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}
