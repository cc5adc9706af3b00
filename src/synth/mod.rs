//! Code synthesizer: generation context, artifact selection and rendering.

mod artifacts;
mod context;

pub use artifacts::{list_artifact_templates, ArtifactKind, ArtifactTemplate};
pub use context::{build_context, primary_key, rust_field, GenerationContext, COLUMN_RECORD};

use crate::error::AppError;
use crate::model::{GenColumn, GenTable, RenderedFile};
use crate::template::{Scope, Template};

fn render_error(table: &GenTable, kind: ArtifactKind, message: impl ToString) -> AppError {
    AppError::Render {
        table: table.table_name.clone(),
        artifact: kind.as_str().to_string(),
        message: message.to_string(),
    }
}

/// Relative archive path: no leading slash, no empty segments.
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .collect::<Vec<_>>()
        .join("/")
}

fn render_artifact(table: &GenTable, artifact: &ArtifactTemplate, scope: &Scope) -> Result<RenderedFile, AppError> {
    let content = Template::parse(artifact.source)
        .map_err(|e| render_error(table, artifact.kind, e))?
        .render(scope);
    let file_path = Template::parse(artifact.path_pattern)
        .map_err(|e| render_error(table, artifact.kind, e))?
        .render(scope);
    let file_path = normalize_path(&file_path);
    if file_path.is_empty() {
        return Err(render_error(table, artifact.kind, "path pattern expanded to an empty path"));
    }
    Ok(RenderedFile {
        artifact: artifact.kind.as_str().to_string(),
        file_path,
        content,
    })
}

/// Render every artifact of the table's category. Any failure aborts the whole table.
pub fn render_table(table: &GenTable, columns: &[GenColumn]) -> Result<Vec<RenderedFile>, AppError> {
    let ctx = build_context(table, columns).map_err(|e| AppError::Render {
        table: table.table_name.clone(),
        artifact: "context".to_string(),
        message: e.to_string(),
    })?;
    let templates = list_artifact_templates(table.template_category);
    let mut files = Vec::with_capacity(templates.len());
    for artifact in &templates {
        let file = render_artifact(table, artifact, &ctx.scope)?;
        tracing::debug!(
            table = %table.table_name,
            artifact = %artifact.kind,
            path = %file.file_path,
            bytes = file.content.len(),
            "rendered artifact"
        );
        files.push(file);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{convert_case, IdentifierStyle};
    use crate::model::{ControlType, MappedType, QueryOperator, TableOptions, TemplateCategory};
    use chrono::Utc;

    fn order_table(category: TemplateCategory) -> GenTable {
        GenTable {
            table_id: 7,
            table_name: "t_order".into(),
            table_comment: "Orders".into(),
            class_name: "Order".into(),
            package_name: "app".into(),
            module_name: "app".into(),
            business_name: "order".into(),
            function_name: "Orders".into(),
            author: "dev".into(),
            template_category: category,
            options: TableOptions {
                tree_code: Some("order_id".into()),
                tree_parent_code: Some("parent_id".into()),
                tree_name: None,
            },
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn column(id: i64, name: &str, mapped: MappedType, is_pk: bool, is_query: bool) -> GenColumn {
        GenColumn {
            column_id: id,
            table_id: 7,
            column_name: name.into(),
            column_comment: format!("{} column", name),
            db_type: "text".into(),
            mapped_type: mapped,
            field_name: convert_case(name, IdentifierStyle::Camel),
            is_pk,
            is_increment: is_pk,
            is_required: !is_pk,
            is_insert: !is_pk,
            is_edit: !is_pk,
            is_list: true,
            is_query,
            query_operator: if name.ends_with("_no") { QueryOperator::Like } else { QueryOperator::Eq },
            control_type: ControlType::Input,
            dict_reference: None,
            sort_order: id as i32,
        }
    }

    fn columns() -> Vec<GenColumn> {
        vec![
            column(1, "order_id", MappedType::Integer, true, true),
            column(2, "order_no", MappedType::String, false, true),
            column(3, "parent_id", MappedType::Integer, false, false),
        ]
    }

    #[test]
    fn crud_renders_four_files_under_package_path() {
        let files = render_table(&order_table(TemplateCategory::SingleTableCrud), &columns()).unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.file_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "app/order/entity.rs",
                "app/order/contracts.rs",
                "app/order/service.rs",
                "app/order/routes.rs"
            ]
        );
        for f in &files {
            assert!(f.content.contains("orderId"), "{} lacks orderId", f.artifact);
            assert!(!f.content.contains("#foreach"), "{} kept a directive", f.artifact);
            assert!(!f.content.contains("${"), "{} kept a placeholder", f.artifact);
        }
    }

    #[test]
    fn entity_lists_every_column_in_order() {
        let files = render_table(&order_table(TemplateCategory::SingleTableCrud), &columns()).unwrap();
        let entity = &files[0].content;
        assert!(entity.contains("pub struct Order {"));
        let a = entity.find("pub order_id: i64,").unwrap();
        let b = entity.find("pub order_no: String,").unwrap();
        let c = entity.find("pub parent_id: i64,").unwrap();
        assert!(a < b && b < c);
        assert!(entity.contains("#[serde(rename = \"orderNo\")]"));
        assert!(entity.contains("pub const PRIMARY_KEY: &'static str = \"order_id\";"));
    }

    #[test]
    fn like_columns_render_like_filters() {
        let files = render_table(&order_table(TemplateCategory::SingleTableCrud), &columns()).unwrap();
        let service = &files[2].content;
        assert!(service.contains("order_no::text LIKE"));
        assert!(service.contains("\" AND order_id = \""));
    }

    #[test]
    fn route_uses_primary_key_path() {
        let files = render_table(&order_table(TemplateCategory::SingleTableCrud), &columns()).unwrap();
        assert!(files[3].content.contains("\"/order/:orderId\""));
        assert!(files[3].content.contains("pub fn order_routes(pool: PgPool) -> Router"));
    }

    #[test]
    fn tree_renders_node_contract() {
        let files = render_table(&order_table(TemplateCategory::TreeTable), &columns()).unwrap();
        assert_eq!(files.len(), 5);
        let node = files.iter().find(|f| f.artifact == "tree_node").unwrap();
        assert_eq!(node.file_path, "app/order/tree.rs");
        assert!(node.content.contains("Some(row.order_id.to_string())"));
        assert!(node.content.contains("Some(row.parent_id.to_string())"));
    }

    #[test]
    fn paths_are_normalized() {
        assert_eq!(normalize_path("/com/acme//order/./entity.rs"), "com/acme/order/entity.rs");
        assert_eq!(normalize_path("../x.rs"), "x.rs");
    }
}
