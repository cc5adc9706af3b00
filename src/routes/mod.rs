//! Routers: probes plus the code generation API.

mod codegen;
mod common;

pub use codegen::codegen_routes;
pub use common::probe_routes;

use crate::state::AppState;
use axum::Router;

pub const API_PREFIX: &str = "/api/v1/codegen";

/// Full application router: probes at the root, code generation under [`API_PREFIX`].
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(probe_routes(state.clone()))
        .nest(API_PREFIX, codegen_routes(state))
}
