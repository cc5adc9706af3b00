mod common;

use architect_codegen::model::{ColumnPatch, QueryOperator, TableFilter, TablePatch, TemplateCategory, TableOptions};
use architect_codegen::{AppError, ImportPolicy, MemoryMetadataStore, StaticCatalog};
use std::io::{Cursor, Read};
use std::sync::Arc;
use zip::ZipArchive;

fn names(archive: &ZipArchive<Cursor<Vec<u8>>>) -> Vec<String> {
    let mut names: Vec<String> = archive.file_names().map(String::from).collect();
    names.sort();
    names
}

#[tokio::test]
async fn imported_column_count_matches_catalog() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let described = svc.describe_table("t_order").await.unwrap();
    let detail = svc.get_table_detail(report.imported[0].table_id).await.unwrap();
    assert_eq!(detail.columns.len(), described.len());
    let names: Vec<_> = detail.columns.iter().map(|c| c.column_name.as_str()).collect();
    assert_eq!(names, vec!["order_id", "order_no", "create_time"]);
}

#[tokio::test]
async fn order_preview_has_four_consistent_artifacts() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let files = svc.preview(report.imported[0].table_id).await.unwrap();
    assert_eq!(files.len(), 4);
    let artifacts: Vec<_> = files.iter().map(|f| f.artifact.as_str()).collect();
    assert_eq!(artifacts, vec!["entity", "contracts", "service", "route"]);
    for f in &files {
        assert!(f.content.contains("orderId"), "{} lacks orderId", f.file_path);
        assert!(!f.content.contains("orderID"), "{} spells the key differently", f.file_path);
        assert!(!f.content.contains("OrderID"), "{} spells the key differently", f.file_path);
    }
    let entity = &files[0].content;
    assert!(entity.contains("pub struct Order {"));
    assert!(entity.contains("pub order_id: i64,"));
    assert!(entity.contains("pub order_no: Option<String>,"));
    assert!(entity.contains("pub create_time: Option<chrono::NaiveDateTime>,"));
}

#[tokio::test]
async fn importing_twice_keeps_one_row() {
    let svc = common::service();
    svc.import_tables(&["t_order".into()], None).await.unwrap();
    let again = svc
        .import_tables(&["t_order".into(), "t_order".into()], Some(ImportPolicy::Skip))
        .await
        .unwrap();
    assert!(again.imported.is_empty());
    assert_eq!(again.skipped, vec!["t_order".to_string()]);
    let page = svc
        .list_tables(&TableFilter {
            table_name: Some("order".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn error_policy_rejects_reimport() {
    let svc = common::service();
    svc.import_tables(&["t_order".into()], None).await.unwrap();
    let err = svc
        .import_tables(&["t_customer".into(), "t_order".into()], Some(ImportPolicy::Error))
        .await
        .unwrap_err();
    match err {
        AppError::Validation(msg) => assert!(msg.contains("t_order")),
        other => panic!("unexpected error: {:?}", other),
    }
    // Nothing else from the rejected call was written.
    assert!(svc.list_tables(&TableFilter::default()).await.unwrap().items.len() == 1);
}

#[tokio::test]
async fn batch_archive_holds_both_tables_without_collisions() {
    let svc = common::service();
    let report = svc
        .import_tables(&["t_order".into(), "t_customer".into()], None)
        .await
        .unwrap();
    let ids: Vec<i64> = report.imported.iter().map(|t| t.table_id).collect();
    let outcome = svc.generate_batch(&ids).await.unwrap();
    assert_eq!(outcome.succeeded.len(), 2);
    assert!(outcome.failures.is_empty());
    assert!(outcome.archive.filename.starts_with("codegen_batch_"));

    let archive = ZipArchive::new(Cursor::new(outcome.archive.bytes)).unwrap();
    assert_eq!(
        names(&archive),
        vec![
            "app/customer/contracts.rs",
            "app/customer/entity.rs",
            "app/customer/routes.rs",
            "app/customer/service.rs",
            "app/order/contracts.rs",
            "app/order/entity.rs",
            "app/order/routes.rs",
            "app/order/service.rs",
        ]
    );
}

#[tokio::test]
async fn batch_isolates_unknown_tables() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let id = report.imported[0].table_id;
    let outcome = svc.generate_batch(&[id, 4242]).await.unwrap();
    assert_eq!(outcome.succeeded, vec![id]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].table_id, 4242);

    let err = svc.generate_batch(&[4242, 4343]).await.unwrap_err();
    match err {
        AppError::Validation(msg) => assert!(msg.contains("4242") && msg.contains("4343")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn single_download_names_the_table() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let id = report.imported[0].table_id;
    let archive = svc.generate_single(id).await.unwrap();
    assert_eq!(archive.filename, format!("codegen_table_{}.zip", id));
    let mut zip = ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
    let mut entity = String::new();
    zip.by_name("app/order/entity.rs").unwrap().read_to_string(&mut entity).unwrap();
    assert!(entity.contains("#[serde(rename = \"orderNo\")]"));
}

#[tokio::test]
async fn column_edits_override_import_defaults() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let id = report.imported[0].table_id;
    let detail = svc.get_table_detail(id).await.unwrap();
    let order_no = detail.columns.iter().find(|c| c.column_name == "order_no").unwrap();
    assert!(!order_no.is_query);

    let patch = ColumnPatch {
        column_id: order_no.column_id,
        is_query: Some(true),
        query_operator: Some(QueryOperator::Like),
        ..Default::default()
    };
    let columns = svc.update_columns(id, Some(detail.table.version), &[patch]).await.unwrap();
    assert!(columns.iter().any(|c| c.column_name == "order_no" && c.is_query));

    let files = svc.preview(id).await.unwrap();
    assert!(files[2].content.contains("order_no::text LIKE"));
}

#[tokio::test]
async fn stale_version_is_a_conflict() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let table = &report.imported[0];
    let patch = TablePatch {
        expected_version: Some(table.version),
        author: Some("someone".into()),
        ..Default::default()
    };
    let updated = svc.update_table(table.table_id, &patch).await.unwrap();
    assert_eq!(updated.version, table.version + 1);
    assert_eq!(updated.author, "someone");

    let err = svc.update_table(table.table_id, &patch).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let detail = svc.get_table_detail(table.table_id).await.unwrap();
    let col = ColumnPatch {
        column_id: detail.columns[0].column_id,
        is_list: Some(false),
        ..Default::default()
    };
    let err = svc
        .update_columns(table.table_id, Some(table.version), &[col])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn tree_table_renders_tree_artifacts() {
    let svc = common::service();
    let report = svc.import_tables(&["t_order".into()], None).await.unwrap();
    let id = report.imported[0].table_id;
    let patch = TablePatch {
        template_category: Some(TemplateCategory::TreeTable),
        options: Some(TableOptions {
            tree_code: Some("order_id".into()),
            tree_parent_code: Some("order_no".into()),
            tree_name: None,
        }),
        ..Default::default()
    };
    svc.update_table(id, &patch).await.unwrap();
    let files = svc.preview(id).await.unwrap();
    let artifacts: Vec<_> = files.iter().map(|f| f.artifact.as_str()).collect();
    assert_eq!(artifacts, vec!["entity", "contracts", "tree_service", "tree_route", "tree_node"]);
    let node = &files[4].content;
    assert!(node.contains("pub struct OrderNode {"));
    assert!(node.contains("row.order_no.as_ref().map(|v| v.to_string())"));
}

#[tokio::test]
async fn delete_removes_table_and_columns() {
    let svc = common::service();
    let report = svc
        .import_tables(&["t_order".into(), "t_customer".into()], None)
        .await
        .unwrap();
    let ids: Vec<i64> = report.imported.iter().map(|t| t.table_id).collect();
    svc.delete_table(ids[0]).await.unwrap();
    assert!(matches!(svc.preview(ids[0]).await, Err(AppError::NotFound(_))));
    assert_eq!(svc.batch_delete(&[ids[1], ids[1], 999]).await.unwrap(), 1);
    assert_eq!(svc.list_tables(&TableFilter::default()).await.unwrap().total, 0);
    // Deleted tables become importable again.
    let importable = svc.list_importable_tables(&TableFilter::default()).await.unwrap();
    assert_eq!(importable.total, 2);
}

#[tokio::test]
async fn batch_skips_tables_whose_paths_are_taken() {
    // sys_order and t_order both reduce to business name "order".
    let catalog = common::catalog().with_table(
        "sys_order",
        "Legacy orders",
        vec![
            StaticCatalog::serial_pk("order_id", "int"),
            StaticCatalog::column("legacy_ref", "varchar(20)"),
        ],
    );
    let svc = common::service_over(Arc::new(catalog), Arc::new(MemoryMetadataStore::new()));
    let report = svc
        .import_tables(&["t_order".into(), "sys_order".into()], None)
        .await
        .unwrap();
    let ids: Vec<i64> = report.imported.iter().map(|t| t.table_id).collect();

    let outcome = svc.generate_batch(&ids).await.unwrap();
    assert_eq!(outcome.succeeded, vec![ids[0]]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].table_id, ids[1]);
    assert!(outcome.failures[0].reason.contains("app/order/entity.rs"));

    let mut archive = ZipArchive::new(Cursor::new(outcome.archive.bytes)).unwrap();
    assert_eq!(archive.len(), 4);
    let mut entity = String::new();
    archive.by_name("app/order/entity.rs").unwrap().read_to_string(&mut entity).unwrap();
    assert!(entity.contains("`t_order`"));
    assert!(!entity.contains("legacy_ref"));

    // Renaming the second table clears the collision.
    let patch = TablePatch {
        business_name: Some("legacy_order".into()),
        ..Default::default()
    };
    svc.update_table(ids[1], &patch).await.unwrap();
    let outcome = svc.generate_batch(&ids).await.unwrap();
    assert_eq!(outcome.succeeded, ids);
    assert_eq!(ZipArchive::new(Cursor::new(outcome.archive.bytes)).unwrap().len(), 8);
}

#[tokio::test]
async fn unreachable_catalog_surfaces_unchanged() {
    let store = Arc::new(MemoryMetadataStore::new());
    let svc = common::service_over(Arc::new(common::DownCatalog), store);
    assert!(matches!(
        svc.import_tables(&["t_order".into()], None).await,
        Err(AppError::Connectivity(_))
    ));
    assert!(matches!(
        svc.list_importable_tables(&TableFilter::default()).await,
        Err(AppError::Connectivity(_))
    ));
    assert!(matches!(svc.describe_table("t_order").await, Err(AppError::Connectivity(_))));
    assert_eq!(svc.list_tables(&TableFilter::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn store_outage_aborts_the_batch() {
    let store = Arc::new(common::FlakyStore::default());
    let svc = common::service_over(Arc::new(common::catalog()), store.clone());
    let report = svc
        .import_tables(&["t_order".into(), "t_customer".into()], None)
        .await
        .unwrap();
    let ids: Vec<i64> = report.imported.iter().map(|t| t.table_id).collect();

    store.go_down();
    assert!(matches!(svc.generate_batch(&ids).await, Err(AppError::Connectivity(_))));
}
