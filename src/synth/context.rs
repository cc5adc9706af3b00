//! Generation context: the scope a table's artifact templates are expanded against.

use crate::error::TemplateError;
use crate::mapping::{convert_case, IdentifierStyle};
use crate::model::{GenColumn, GenTable};
use crate::template::{Record, RecordSchema, Scope, Value};
use chrono::Utc;

/// Fields every `${c.*}` reference inside `#foreach ($c in $columns)` can use.
pub static COLUMN_RECORD: RecordSchema = RecordSchema::new(
    "column",
    &[
        "column_id",
        "column_name",
        "column_comment",
        "db_type",
        "mapped_type",
        "rust_type",
        "field_type",
        "field_name",
        "field_name_pascal",
        "rust_field",
        "is_pk",
        "is_increment",
        "is_required",
        "is_insert",
        "is_edit",
        "is_list",
        "is_query",
        "query_operator",
        "query_sql",
        "control_type",
        "dict_reference",
        "sort_order",
    ],
);

const RUST_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn", "else", "enum",
    "extern", "false", "final", "fn", "for", "if", "impl", "in", "let", "loop", "macro", "match", "mod", "move",
    "mut", "override", "priv", "pub", "ref", "return", "static", "struct", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Snake-case Rust identifier for a column, escaping keywords.
pub fn rust_field(column_name: &str) -> String {
    let snake: String = convert_case(column_name, IdentifierStyle::Snake)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let snake = if snake.is_empty() { "field".to_string() } else { snake };
    let snake = if snake.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", snake)
    } else {
        snake
    };
    match snake.as_str() {
        "self" | "super" | "crate" => format!("{}_", snake),
        s if RUST_KEYWORDS.contains(&s) => format!("r#{}", snake),
        _ => snake,
    }
}

/// Declared type of a column in the generated entity.
fn field_type(column: &GenColumn) -> String {
    let base = column.mapped_type.rust_type();
    if column.is_pk || column.is_required {
        base.to_string()
    } else {
        format!("Option<{}>", base)
    }
}

fn column_record(column: &GenColumn) -> Result<Record, TemplateError> {
    COLUMN_RECORD.record([
        column.column_id.to_string(),
        column.column_name.clone(),
        column.column_comment.clone(),
        column.db_type.clone(),
        column.mapped_type.as_str().to_string(),
        column.mapped_type.rust_type().to_string(),
        field_type(column),
        column.field_name.clone(),
        convert_case(&column.field_name, IdentifierStyle::Pascal),
        rust_field(&column.column_name),
        column.is_pk.to_string(),
        column.is_increment.to_string(),
        column.is_required.to_string(),
        column.is_insert.to_string(),
        column.is_edit.to_string(),
        column.is_list.to_string(),
        column.is_query.to_string(),
        column.query_operator.as_str().to_string(),
        column.query_operator.sql().to_string(),
        column.control_type.as_str().to_string(),
        column.dict_reference.clone().unwrap_or_default(),
        column.sort_order.to_string(),
    ])
}

/// Rust expression yielding `Option<String>` for a tree key column of `row`.
fn tree_key_expr(columns: &[GenColumn], column_name: Option<&str>) -> String {
    match column_name.and_then(|name| columns.iter().find(|c| c.column_name == name)) {
        Some(c) if c.is_pk || c.is_required => format!("Some(row.{}.to_string())", rust_field(&c.column_name)),
        Some(c) => format!("row.{}.as_ref().map(|v| v.to_string())", rust_field(&c.column_name)),
        None => "None".to_string(),
    }
}

/// The derived primary key: the first column flagged `is_pk`.
pub fn primary_key<'a>(table: &GenTable, columns: &'a [GenColumn]) -> Option<&'a GenColumn> {
    let mut flagged = columns.iter().filter(|c| c.is_pk);
    let first = flagged.next();
    let extra: Vec<&str> = flagged.map(|c| c.column_name.as_str()).collect();
    if let Some(pk) = first {
        if !extra.is_empty() {
            tracing::warn!(
                table = %table.table_name,
                primary_key = %pk.column_name,
                ignored = ?extra,
                "several columns flagged as primary key; using the first"
            );
        }
    }
    first
}

#[derive(Clone, Debug)]
pub struct GenerationContext {
    pub scope: Scope,
    pub primary_key: Option<GenColumn>,
}

/// Build the expansion scope for one table. `columns` must already be in sort order.
pub fn build_context(table: &GenTable, columns: &[GenColumn]) -> Result<GenerationContext, TemplateError> {
    let pk = primary_key(table, columns);
    let records = columns.iter().map(column_record).collect::<Result<Vec<_>, _>>()?;
    let column_list = columns
        .iter()
        .map(|c| c.column_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut scope = Scope::new();
    let mut set = |key: &str, value: Value| {
        scope.insert(key.to_string(), value);
    };
    set("table_name", table.table_name.as_str().into());
    set("table_comment", table.table_comment.as_str().into());
    set("class_name", table.class_name.as_str().into());
    set("package_name", table.package_name.as_str().into());
    set("package_path", table.package_name.replace('.', "/").into());
    set("module_name", table.module_name.as_str().into());
    set("business_name", table.business_name.as_str().into());
    set("function_name", table.function_name.as_str().into());
    set("author", table.author.as_str().into());
    set("datetime", Utc::now().format("%Y-%m-%d %H:%M:%S").to_string().into());
    set("template_category", table.template_category.as_str().into());
    set("column_list", column_list.into());
    set("has_pk", pk.is_some().into());
    set("has_query", columns.iter().any(|c| c.is_query).into());
    set("pk_column_name", pk.map(|c| c.column_name.clone()).unwrap_or_default().into());
    set("pk_field_name", pk.map(|c| c.field_name.clone()).unwrap_or_default().into());
    set(
        "pk_field_pascal",
        pk.map(|c| convert_case(&c.field_name, IdentifierStyle::Pascal))
            .unwrap_or_default()
            .into(),
    );
    set("pk_rust_field", pk.map(|c| rust_field(&c.column_name)).unwrap_or_default().into());
    set(
        "pk_rust_type",
        pk.map(|c| c.mapped_type.rust_type()).unwrap_or_default().into(),
    );
    let options = &table.options;
    set("tree_code", options.tree_code.clone().unwrap_or_default().into());
    set("tree_parent_code", options.tree_parent_code.clone().unwrap_or_default().into());
    set("tree_name", options.tree_name.clone().unwrap_or_default().into());
    set("tree_code_key", tree_key_expr(columns, options.tree_code.as_deref()).into());
    set("tree_parent_key", tree_key_expr(columns, options.tree_parent_code.as_deref()).into());
    set("columns", records.into());

    Ok(GenerationContext {
        scope,
        primary_key: pk.cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ControlType, MappedType, QueryOperator, TableOptions, TemplateCategory};

    fn table() -> GenTable {
        GenTable {
            table_id: 1,
            table_name: "t_order".into(),
            table_comment: "Orders".into(),
            class_name: "Order".into(),
            package_name: "com.acme.shop".into(),
            module_name: "shop".into(),
            business_name: "order".into(),
            function_name: "Orders".into(),
            author: "dev".into(),
            template_category: TemplateCategory::SingleTableCrud,
            options: TableOptions::default(),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn column(id: i64, name: &str, mapped: MappedType, is_pk: bool) -> GenColumn {
        GenColumn {
            column_id: id,
            table_id: 1,
            column_name: name.into(),
            column_comment: String::new(),
            db_type: "integer".into(),
            mapped_type: mapped,
            field_name: convert_case(name, IdentifierStyle::Camel),
            is_pk,
            is_increment: is_pk,
            is_required: false,
            is_insert: !is_pk,
            is_edit: !is_pk,
            is_list: true,
            is_query: false,
            query_operator: QueryOperator::Eq,
            control_type: ControlType::Input,
            dict_reference: None,
            sort_order: id as i32,
        }
    }

    fn text<'a>(ctx: &'a GenerationContext, key: &str) -> &'a str {
        match ctx.scope.get(key) {
            Some(Value::Text(s)) => s,
            other => panic!("{} is not text: {:?}", key, other),
        }
    }

    #[test]
    fn exposes_identifiers_and_primary_key() {
        let cols = vec![
            column(1, "order_id", MappedType::Integer, true),
            column(2, "order_no", MappedType::String, false),
        ];
        let ctx = build_context(&table(), &cols).unwrap();
        assert_eq!(text(&ctx, "class_name"), "Order");
        assert_eq!(text(&ctx, "package_path"), "com/acme/shop");
        assert_eq!(text(&ctx, "pk_field_name"), "orderId");
        assert_eq!(text(&ctx, "pk_field_pascal"), "OrderId");
        assert_eq!(text(&ctx, "pk_rust_type"), "i64");
        assert_eq!(text(&ctx, "has_pk"), "true");
        assert_eq!(text(&ctx, "column_list"), "order_id, order_no");
        match ctx.scope.get("columns") {
            Some(Value::List(records)) => {
                assert_eq!(records.len(), 2);
                assert_eq!(records[1].get("field_name"), Some("orderNo"));
                assert_eq!(records[1].get("field_type"), Some("Option<String>"));
                assert_eq!(records[0].get("field_type"), Some("i64"));
            }
            other => panic!("columns is not a list: {:?}", other),
        }
    }

    #[test]
    fn first_flagged_column_is_the_primary_key() {
        let cols = vec![
            column(1, "a", MappedType::Integer, false),
            column(2, "b", MappedType::Integer, true),
            column(3, "c", MappedType::Integer, true),
        ];
        let ctx = build_context(&table(), &cols).unwrap();
        assert_eq!(ctx.primary_key.map(|c| c.column_name), Some("b".to_string()));
    }

    #[test]
    fn no_primary_key_is_allowed() {
        let cols = vec![column(1, "a", MappedType::Integer, false)];
        let ctx = build_context(&table(), &cols).unwrap();
        assert!(ctx.primary_key.is_none());
        assert_eq!(text(&ctx, "has_pk"), "false");
        assert_eq!(text(&ctx, "pk_field_name"), "");
    }

    #[test]
    fn rust_fields_escape_keywords() {
        assert_eq!(rust_field("type"), "r#type");
        assert_eq!(rust_field("self"), "self_");
        assert_eq!(rust_field("OrderNo"), "order_no");
        assert_eq!(rust_field("1st"), "_1st");
        assert_eq!(rust_field("unit price"), "unit_price");
    }

    #[test]
    fn tree_keys_follow_nullability() {
        let mut t = table();
        t.options = TableOptions {
            tree_code: Some("menu_id".into()),
            tree_parent_code: Some("parent_id".into()),
            tree_name: None,
        };
        let cols = vec![
            column(1, "menu_id", MappedType::Integer, true),
            column(2, "parent_id", MappedType::Integer, false),
        ];
        let ctx = build_context(&t, &cols).unwrap();
        assert_eq!(text(&ctx, "tree_code_key"), "Some(row.menu_id.to_string())");
        assert_eq!(text(&ctx, "tree_parent_key"), "row.parent_id.as_ref().map(|v| v.to_string())");
    }
}
