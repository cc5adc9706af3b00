//! Shared application state for all routes.

use crate::service::CodegenService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub codegen: Arc<CodegenService>,
}

impl AppState {
    pub fn new(codegen: CodegenService) -> Self {
        AppState {
            codegen: Arc::new(codegen),
        }
    }
}
