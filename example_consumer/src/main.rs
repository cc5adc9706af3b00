//! Example consumer: imports the tables named on the command line and writes their generated archive.
//!
//! Run from repo root: `cargo run -p example-consumer -- t_order t_customer`
//! The archive lands in `CODEGEN_OUT_DIR` (default: current directory).

use architect_codegen::{
    ensure_database_exists, ensure_gen_tables, CodegenService, GenSettings, ImportPolicy, MetadataStore,
    PgCatalog, PgMetadataStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("architect_codegen=info")),
        )
        .init();

    let names: Vec<String> = std::env::args().skip(1).collect();
    if names.is_empty() {
        return Err("usage: example-consumer <table_name>...".into());
    }

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/architect".into());
    ensure_database_exists(&database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await?;

    let settings = GenSettings::from_env();
    ensure_gen_tables(&pool, &settings.store_schema).await?;
    let store = Arc::new(PgMetadataStore::new(pool.clone(), &settings.store_schema));
    let catalog = Arc::new(PgCatalog::new(pool.clone(), settings.catalog_schema.clone()));
    let service = CodegenService::new(catalog, store.clone(), settings);

    let report = service.import_tables(&names, Some(ImportPolicy::Skip)).await?;
    tracing::info!(imported = report.imported.len(), skipped = ?report.skipped, "import finished");

    let mut ids = Vec::with_capacity(names.len());
    for name in &names {
        if let Some(table) = store.find_by_name(name).await? {
            ids.push(table.table_id);
        }
    }
    let outcome = service.generate_batch(&ids).await?;
    for failure in &outcome.failures {
        tracing::warn!(table_id = failure.table_id, reason = %failure.reason, "table not generated");
    }

    let out_dir = PathBuf::from(std::env::var("CODEGEN_OUT_DIR").unwrap_or_else(|_| ".".into()));
    let path = out_dir.join(&outcome.archive.filename);
    tokio::fs::write(&path, &outcome.archive.bytes).await?;
    tracing::info!(path = %path.display(), tables = outcome.succeeded.len(), "archive written");
    Ok(())
}
