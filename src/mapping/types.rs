//! Raw column type -> target taxonomy. Substring match, case-insensitive, first rule wins.

use crate::model::MappedType;

/// Ordered rules. Order matters: "datetime"/"timestamp" before "date" and "time",
/// "tinyint(1)" before "int", "interval"/"point" before "int".
const RULES: &[(&[&str], MappedType)] = &[
    (&["json", "hstore"], MappedType::Structured),
    (&["bool", "tinyint(1)", "bit(1)"], MappedType::Boolean),
    (&["timestamp", "datetime"], MappedType::Datetime),
    (&["date"], MappedType::Date),
    (&["time"], MappedType::Time),
    (&["interval", "point", "inet"], MappedType::String),
    (&["int", "serial"], MappedType::Integer),
    (&["numeric", "decimal", "real", "double", "float", "money"], MappedType::Float),
];

/// Classify a raw catalog type ("character varying(30)", "int4", "timestamp without time zone").
/// Never fails; unmatched types are `string`.
pub fn map_db_type(raw: &str) -> MappedType {
    let lower = raw.trim().to_lowercase();
    for (needles, mapped) in RULES {
        if needles.iter().any(|n| lower.contains(n)) {
            return *mapped;
        }
    }
    MappedType::String
}

/// Large text types: not listed by default and edited with a textarea.
pub(crate) fn is_large_text(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    lower == "text" || lower.contains("longtext") || lower.contains("mediumtext") || lower.contains("clob")
}
