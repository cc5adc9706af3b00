//! Architect codegen: import database tables, edit their generation metadata, and render
//! CRUD artifacts through a small template language.

pub mod catalog;
pub mod error;
pub mod handlers;
pub mod mapping;
pub mod model;
pub mod package;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;
pub mod store;
pub mod synth;
pub mod template;

pub use catalog::{CatalogReader, PgCatalog, StaticCatalog};
pub use error::{AppError, TemplateError};
pub use mapping::{map_db_type, to_identifier_case, IdentifierStyle};
pub use response::{success_many, success_one, success_one_ok, success_page};
pub use routes::{app, codegen_routes, probe_routes};
pub use service::{CodegenService, ImportReport};
pub use settings::{GenSettings, ImportPolicy};
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_gen_tables, MemoryMetadataStore, MetadataStore, PgMetadataStore};
pub use template::{expand, Scope, Value};
