//! Example server: ensures the metadata schema exists, introspects the catalog schema, and serves the codegen API.

use architect_codegen::{
    app, ensure_database_exists, ensure_gen_tables, AppState, CodegenService, GenSettings, PgCatalog,
    PgMetadataStore,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("architect_codegen=info".parse()?))
        .init();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/architect".into());
    ensure_database_exists(&database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let settings = GenSettings::from_env();
    ensure_gen_tables(&pool, &settings.store_schema).await?;
    let catalog = PgCatalog::new(pool.clone(), settings.catalog_schema.clone());
    let store = PgMetadataStore::new(pool.clone(), &settings.store_schema);
    let state = AppState::new(CodegenService::new(Arc::new(catalog), Arc::new(store), settings));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
