//! HTTP handlers for the code generation API.

pub mod codegen;
pub use codegen::*;
