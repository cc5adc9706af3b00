//! Generated-table metadata: the records the rest of the engine operates on.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which artifact template set a table renders with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateCategory {
    #[default]
    #[serde(rename = "single-table-crud")]
    SingleTableCrud,
    #[serde(rename = "tree-table")]
    TreeTable,
}

impl TemplateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateCategory::SingleTableCrud => "single-table-crud",
            TemplateCategory::TreeTable => "tree-table",
        }
    }
}

impl fmt::Display for TemplateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single-table-crud" | "crud" => Ok(TemplateCategory::SingleTableCrud),
            "tree-table" | "tree" => Ok(TemplateCategory::TreeTable),
            _ => Err(AppError::Validation(format!(
                "invalid template category: {} (expected single-table-crud or tree-table)",
                s
            ))),
        }
    }
}

/// Target-type taxonomy for raw column types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappedType {
    Integer,
    Float,
    Boolean,
    Datetime,
    Date,
    Time,
    Structured,
    String,
}

impl MappedType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappedType::Integer => "integer",
            MappedType::Float => "float",
            MappedType::Boolean => "boolean",
            MappedType::Datetime => "datetime",
            MappedType::Date => "date",
            MappedType::Time => "time",
            MappedType::Structured => "structured",
            MappedType::String => "string",
        }
    }

    /// Rust type used by the bundled templates.
    pub fn rust_type(&self) -> &'static str {
        match self {
            MappedType::Integer => "i64",
            MappedType::Float => "f64",
            MappedType::Boolean => "bool",
            MappedType::Datetime => "chrono::NaiveDateTime",
            MappedType::Date => "chrono::NaiveDate",
            MappedType::Time => "chrono::NaiveTime",
            MappedType::Structured => "serde_json::Value",
            MappedType::String => "String",
        }
    }
}

impl FromStr for MappedType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "integer" => MappedType::Integer,
            "float" => MappedType::Float,
            "boolean" => MappedType::Boolean,
            "datetime" => MappedType::Datetime,
            "date" => MappedType::Date,
            "time" => MappedType::Time,
            "structured" => MappedType::Structured,
            "string" => MappedType::String,
            _ => return Err(AppError::Validation(format!("invalid mapped type: {}", s))),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueryOperator {
    #[default]
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl QueryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "EQ",
            QueryOperator::Ne => "NE",
            QueryOperator::Gt => "GT",
            QueryOperator::Gte => "GTE",
            QueryOperator::Lt => "LT",
            QueryOperator::Lte => "LTE",
            QueryOperator::Like => "LIKE",
        }
    }

    /// SQL operator rendered into generated list filters.
    pub fn sql(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "<>",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Like => "LIKE",
        }
    }
}

impl FromStr for QueryOperator {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_uppercase().as_str() {
            "EQ" => QueryOperator::Eq,
            "NE" => QueryOperator::Ne,
            "GT" => QueryOperator::Gt,
            "GTE" => QueryOperator::Gte,
            "LT" => QueryOperator::Lt,
            "LTE" => QueryOperator::Lte,
            "LIKE" => QueryOperator::Like,
            _ => return Err(AppError::Validation(format!("invalid query operator: {}", s))),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    #[default]
    Input,
    Textarea,
    Select,
    Checkbox,
    Radio,
    Date,
    Time,
    Datetime,
    Upload,
}

impl ControlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlType::Input => "input",
            ControlType::Textarea => "textarea",
            ControlType::Select => "select",
            ControlType::Checkbox => "checkbox",
            ControlType::Radio => "radio",
            ControlType::Date => "date",
            ControlType::Time => "time",
            ControlType::Datetime => "datetime",
            ControlType::Upload => "upload",
        }
    }
}

impl FromStr for ControlType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "input" => ControlType::Input,
            "textarea" => ControlType::Textarea,
            "select" => ControlType::Select,
            "checkbox" => ControlType::Checkbox,
            "radio" => ControlType::Radio,
            "date" => ControlType::Date,
            "time" => ControlType::Time,
            "datetime" => ControlType::Datetime,
            "upload" => ControlType::Upload,
            _ => return Err(AppError::Validation(format!("invalid control type: {}", s))),
        })
    }
}

/// Extra per-table options. Tree tables need the self-referencing key pair.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_parent_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenTable {
    pub table_id: i64,
    pub table_name: String,
    pub table_comment: String,
    pub class_name: String,
    pub package_name: String,
    pub module_name: String,
    pub business_name: String,
    pub function_name: String,
    pub author: String,
    pub template_category: TemplateCategory,
    pub options: TableOptions,
    /// Optimistic concurrency token; bumped by every table or column edit.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenColumn {
    pub column_id: i64,
    pub table_id: i64,
    pub column_name: String,
    pub column_comment: String,
    pub db_type: String,
    pub mapped_type: MappedType,
    pub field_name: String,
    pub is_pk: bool,
    pub is_increment: bool,
    pub is_required: bool,
    pub is_insert: bool,
    pub is_edit: bool,
    pub is_list: bool,
    pub is_query: bool,
    pub query_operator: QueryOperator,
    pub control_type: ControlType,
    #[serde(default)]
    pub dict_reference: Option<String>,
    pub sort_order: i32,
}

/// Table row before the store assigns ids and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct NewGenTable {
    pub table_name: String,
    pub table_comment: String,
    pub class_name: String,
    pub package_name: String,
    pub module_name: String,
    pub business_name: String,
    pub function_name: String,
    pub author: String,
    pub template_category: TemplateCategory,
    pub options: TableOptions,
}

/// Column row before the store assigns ids.
#[derive(Clone, Debug, PartialEq)]
pub struct NewGenColumn {
    pub column_name: String,
    pub column_comment: String,
    pub db_type: String,
    pub mapped_type: MappedType,
    pub field_name: String,
    pub is_pk: bool,
    pub is_increment: bool,
    pub is_required: bool,
    pub is_insert: bool,
    pub is_edit: bool,
    pub is_list: bool,
    pub is_query: bool,
    pub query_operator: QueryOperator,
    pub control_type: ControlType,
    pub dict_reference: Option<String>,
    pub sort_order: i32,
}

impl NewGenColumn {
    pub fn into_column(self, column_id: i64, table_id: i64) -> GenColumn {
        GenColumn {
            column_id,
            table_id,
            column_name: self.column_name,
            column_comment: self.column_comment,
            db_type: self.db_type,
            mapped_type: self.mapped_type,
            field_name: self.field_name,
            is_pk: self.is_pk,
            is_increment: self.is_increment,
            is_required: self.is_required,
            is_insert: self.is_insert,
            is_edit: self.is_edit,
            is_list: self.is_list,
            is_query: self.is_query,
            query_operator: self.query_operator,
            control_type: self.control_type,
            dict_reference: self.dict_reference,
            sort_order: self.sort_order,
        }
    }
}

/// Table-level patch: only present keys are merged.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TablePatch {
    #[serde(default)]
    pub expected_version: Option<i64>,
    #[serde(default)]
    pub table_comment: Option<String>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub module_name: Option<String>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default)]
    pub function_name: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub template_category: Option<TemplateCategory>,
    #[serde(default)]
    pub options: Option<TableOptions>,
}

impl TablePatch {
    /// Merge present keys into `table`. Does not touch version or timestamps.
    pub fn apply(&self, table: &mut GenTable) {
        if let Some(v) = &self.table_comment {
            table.table_comment = v.clone();
        }
        if let Some(v) = &self.class_name {
            table.class_name = v.clone();
        }
        if let Some(v) = &self.package_name {
            table.package_name = v.clone();
        }
        if let Some(v) = &self.module_name {
            table.module_name = v.clone();
        }
        if let Some(v) = &self.business_name {
            table.business_name = v.clone();
        }
        if let Some(v) = &self.function_name {
            table.function_name = v.clone();
        }
        if let Some(v) = &self.author {
            table.author = v.clone();
        }
        if let Some(v) = self.template_category {
            table.template_category = v;
        }
        if let Some(v) = &self.options {
            table.options = v.clone();
        }
    }
}

/// Column-level patch, keyed by the target column's id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ColumnPatch {
    pub column_id: i64,
    #[serde(default)]
    pub column_comment: Option<String>,
    #[serde(default)]
    pub mapped_type: Option<MappedType>,
    #[serde(default)]
    pub field_name: Option<String>,
    #[serde(default)]
    pub is_pk: Option<bool>,
    #[serde(default)]
    pub is_increment: Option<bool>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub is_insert: Option<bool>,
    #[serde(default)]
    pub is_edit: Option<bool>,
    #[serde(default)]
    pub is_list: Option<bool>,
    #[serde(default)]
    pub is_query: Option<bool>,
    #[serde(default)]
    pub query_operator: Option<QueryOperator>,
    #[serde(default)]
    pub control_type: Option<ControlType>,
    /// `Some(None)` clears the reference; absent leaves it unchanged.
    #[serde(default, with = "double_option")]
    pub dict_reference: Option<Option<String>>,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

impl ColumnPatch {
    pub fn apply(&self, column: &mut GenColumn) {
        if let Some(v) = &self.column_comment {
            column.column_comment = v.clone();
        }
        if let Some(v) = self.mapped_type {
            column.mapped_type = v;
        }
        if let Some(v) = &self.field_name {
            column.field_name = v.clone();
        }
        macro_rules! merge_flag {
            ($($flag:ident),*) => {
                $(if let Some(v) = self.$flag {
                    column.$flag = v;
                })*
            };
        }
        merge_flag!(is_pk, is_increment, is_required, is_insert, is_edit, is_list, is_query);
        if let Some(v) = self.query_operator {
            column.query_operator = v;
        }
        if let Some(v) = self.control_type {
            column.control_type = v;
        }
        if let Some(v) = &self.dict_reference {
            column.dict_reference = v.clone();
        }
        if let Some(v) = self.sort_order {
            column.sort_order = v;
        }
    }
}

mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(v: &Option<Option<String>>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match v {
            Some(inner) => inner.serialize(s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(d).map(Some)
    }
}

/// Listing filter for imported tables (substring match on name/comment).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TableFilter {
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub table_comment: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl TableFilter {
    const DEFAULT_PAGE_SIZE: u32 = 20;
    const MAX_PAGE_SIZE: u32 = 500;

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
            .clamp(1, Self::MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    pub fn matches(&self, name: &str, comment: &str) -> bool {
        let name_ok = self
            .table_name
            .as_deref()
            .map(|n| name.to_lowercase().contains(&n.to_lowercase()))
            .unwrap_or(true);
        let comment_ok = self
            .table_comment
            .as_deref()
            .map(|c| comment.to_lowercase().contains(&c.to_lowercase()))
            .unwrap_or(true);
        name_ok && comment_ok
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Slice an already-filtered, ordered list.
    pub fn from_all(all: Vec<T>, filter: &TableFilter) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size() as usize)
            .collect();
        Page {
            items,
            total,
            page: filter.page(),
            page_size: filter.page_size(),
        }
    }
}

/// One rendered artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RenderedFile {
    pub artifact: String,
    pub file_path: String,
    pub content: String,
}
