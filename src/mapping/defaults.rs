//! Import-time column defaults. Applied once when a table is imported; later edits are never re-derived.

use super::types::{is_large_text, map_db_type};
use crate::model::{ControlType, MappedType, QueryOperator};

/// Last name segments that make a column queryable by default.
const QUERY_SEGMENTS: &[&str] = &["id", "name", "title", "type", "status", "code"];

/// Name fragments searched with LIKE instead of EQ.
const LIKE_FRAGMENTS: &[&str] = &["name", "title", "content", "remark", "description", "address", "email"];

/// Audit columns maintained by the backend itself: not insertable, not editable.
const AUDIT_COLUMNS: &[&str] = &[
    "create_by",
    "create_time",
    "created_at",
    "created_by",
    "update_by",
    "update_time",
    "updated_at",
    "updated_by",
    "del_flag",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnDefaults {
    pub is_query: bool,
    pub control_type: ControlType,
    pub query_operator: QueryOperator,
}

/// Seed query flag, control type and query operator from the column name and raw type.
pub fn infer_column_defaults(column_name: &str, raw_type: &str) -> ColumnDefaults {
    let name = column_name.to_lowercase();
    let last_segment = name.rsplit('_').next().unwrap_or(&name);
    let is_query = QUERY_SEGMENTS.contains(&last_segment);
    let query_operator = if LIKE_FRAGMENTS.iter().any(|f| name.contains(f)) {
        QueryOperator::Like
    } else {
        QueryOperator::Eq
    };
    ColumnDefaults {
        is_query,
        control_type: control_type_for(&name, raw_type),
        query_operator,
    }
}

fn control_type_for(name: &str, raw_type: &str) -> ControlType {
    if ["image", "avatar", "file", "attachment"].iter().any(|f| name.contains(f)) {
        return ControlType::Upload;
    }
    if name.contains("status") || name.ends_with("_flag") {
        return ControlType::Radio;
    }
    if name.contains("type") || name.contains("sex") || name.contains("gender") {
        return ControlType::Select;
    }
    if ["content", "remark", "description"].iter().any(|f| name.contains(f)) || is_large_text(raw_type) {
        return ControlType::Textarea;
    }
    match map_db_type(raw_type) {
        MappedType::Datetime => ControlType::Datetime,
        MappedType::Date => ControlType::Date,
        MappedType::Time => ControlType::Time,
        MappedType::Boolean => ControlType::Checkbox,
        MappedType::Structured => ControlType::Textarea,
        _ => ControlType::Input,
    }
}

/// Insert/edit/list/required flags seeded from the catalog descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnFlags {
    pub is_required: bool,
    pub is_insert: bool,
    pub is_edit: bool,
    pub is_list: bool,
}

pub fn seed_flags(column_name: &str, raw_type: &str, nullable: bool, is_pk: bool, is_increment: bool) -> ColumnFlags {
    let audit = AUDIT_COLUMNS.contains(&column_name.to_lowercase().as_str());
    let bulky = is_large_text(raw_type) || map_db_type(raw_type) == MappedType::Structured;
    ColumnFlags {
        is_required: !nullable && !is_increment && !audit,
        is_insert: !is_increment && !audit,
        is_edit: !is_pk && !audit,
        is_list: !bulky,
    }
}
