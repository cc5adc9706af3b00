//! Naming and type mapping: identifier casing, raw type classification, import-time column defaults.

pub mod case;
pub mod defaults;
pub mod types;

pub use case::{convert_case, strip_prefix, to_identifier_case, IdentifierStyle, Naming};
pub use defaults::{infer_column_defaults, seed_flags, ColumnDefaults, ColumnFlags};
pub use types::map_db_type;
