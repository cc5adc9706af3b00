//! CodegenService: import, metadata edits and generation over a catalog and a metadata store.

mod codegen;
mod validation;
pub use codegen::{Archive, BatchFailure, BatchOutcome, CodegenService, ImportReport, TableDetail};
pub use validation::MetadataValidator;
