//! Metadata edit validation: identifiers that end up in generated code and tree options.

use crate::error::AppError;
use crate::model::{ColumnPatch, GenColumn, GenTable, TablePatch, TemplateCategory};
use regex::Regex;
use std::sync::OnceLock;

fn pascal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("static regex"))
}

fn snake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("static regex"))
}

fn camel_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex"))
}

fn package_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z_][a-z0-9_]*)*$").expect("static regex"))
}

fn check(field: &str, value: &str, re: &Regex, expected: &str) -> Result<(), AppError> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be {} (got {:?})", field, expected, value)))
    }
}

pub struct MetadataValidator;

impl MetadataValidator {
    /// Check the identifiers a patch sets, then the merged table's tree options against its columns.
    pub fn validate_table(patch: &TablePatch, merged: &GenTable, columns: &[GenColumn]) -> Result<(), AppError> {
        if let Some(v) = &patch.class_name {
            check("class_name", v, pascal_re(), "a PascalCase identifier")?;
        }
        if let Some(v) = &patch.business_name {
            check("business_name", v, snake_re(), "a snake_case identifier")?;
        }
        if let Some(v) = &patch.module_name {
            check("module_name", v, snake_re(), "a snake_case identifier")?;
        }
        if let Some(v) = &patch.package_name {
            check("package_name", v, package_re(), "dot-separated lowercase identifiers")?;
        }
        if merged.template_category == TemplateCategory::TreeTable {
            Self::validate_tree(merged, columns)?;
        }
        Ok(())
    }

    fn validate_tree(table: &GenTable, columns: &[GenColumn]) -> Result<(), AppError> {
        let options = &table.options;
        let required = [
            ("tree_code", options.tree_code.as_deref()),
            ("tree_parent_code", options.tree_parent_code.as_deref()),
        ];
        for (key, value) in required {
            let column = value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::Validation(format!("{} is required for tree-table", key)))?;
            if !columns.iter().any(|c| c.column_name == column) {
                return Err(AppError::Validation(format!(
                    "{} refers to unknown column {} of {}",
                    key, column, table.table_name
                )));
            }
        }
        if let Some(name) = options.tree_name.as_deref().filter(|v| !v.is_empty()) {
            if !columns.iter().any(|c| c.column_name == name) {
                return Err(AppError::Validation(format!(
                    "tree_name refers to unknown column {} of {}",
                    name, table.table_name
                )));
            }
        }
        Ok(())
    }

    /// Only the fields present in each patch are checked.
    pub fn validate_column_patches(patches: &[ColumnPatch]) -> Result<(), AppError> {
        for patch in patches {
            if let Some(field_name) = &patch.field_name {
                check("field_name", field_name, camel_re(), "an identifier")?;
            }
        }
        Ok(())
    }
}
