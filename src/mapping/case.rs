//! Identifier case conversion: table/column names (snake_case) to class and field identifiers.

use crate::error::AppError;
use std::str::FromStr;

/// Prefixes stripped by the free [`to_identifier_case`] when no [`Naming`] is configured.
pub const DEFAULT_TABLE_PREFIXES: &[&str] = &["sys_", "t_"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentifierStyle {
    /// `dict_type` -> `DictType`
    Pascal,
    /// `dict_type` -> `dictType`
    Camel,
    /// `DictType` -> `dict_type`
    Snake,
}

impl FromStr for IdentifierStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pascal" | "upper_camel" => Ok(IdentifierStyle::Pascal),
            "camel" | "lower_camel" => Ok(IdentifierStyle::Camel),
            "snake" => Ok(IdentifierStyle::Snake),
            _ => Err(AppError::BadRequest(format!(
                "invalid identifier style: {} (expected pascal, camel or snake)",
                s
            ))),
        }
    }
}

/// Convert a single identifier between cases without touching prefixes.
/// e.g. "order_id" -> "OrderId" (pascal), "orderId" (camel); "OrderId" -> "order_id" (snake)
pub fn convert_case(s: &str, style: IdentifierStyle) -> String {
    match style {
        IdentifierStyle::Pascal => join_segments(s, true),
        IdentifierStyle::Camel => join_segments(s, false),
        IdentifierStyle::Snake => to_snake_case(s),
    }
}

/// Split on '_' (empty segments dropped) and capitalize each segment; the first one only when `upper_first`.
fn join_segments(s: &str, upper_first: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, segment) in s.split('_').filter(|seg| !seg.is_empty()).enumerate() {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            if i == 0 && !upper_first {
                out.extend(first.to_lowercase());
            } else {
                out.extend(first.to_uppercase());
            }
            out.push_str(chars.as_str());
        }
    }
    out
}

/// camelCase/PascalCase -> snake_case. Already-snake input is only lowercased.
fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_underscore = true;
    for c in s.chars() {
        if c.is_uppercase() {
            if !prev_underscore {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_underscore = false;
        } else {
            out.push(c);
            prev_underscore = c == '_';
        }
    }
    out
}

/// Remove the longest matching prefix. A name equal to a prefix is left as is.
pub fn strip_prefix<'a, S: AsRef<str>>(name: &'a str, prefixes: &[S]) -> &'a str {
    let mut best: Option<&str> = None;
    for p in prefixes {
        let p = p.as_ref();
        if p.is_empty() || name.len() <= p.len() {
            continue;
        }
        if name.get(..p.len()).map(|head| head.eq_ignore_ascii_case(p)).unwrap_or(false)
            && best.map(|b| p.len() > b.len()).unwrap_or(true)
        {
            best = Some(p);
        }
    }
    match best {
        Some(p) => name.get(p.len()..).unwrap_or(name),
        None => name,
    }
}

/// Strip the default prefixes ("sys_", "t_") and convert.
/// e.g. "sys_dict_type" -> "DictType" (pascal)
pub fn to_identifier_case(name: &str, style: IdentifierStyle) -> String {
    convert_case(strip_prefix(name, DEFAULT_TABLE_PREFIXES), style)
}

/// Prefix-aware naming for imported tables.
#[derive(Clone, Debug)]
pub struct Naming {
    pub prefixes: Vec<String>,
    pub auto_remove_prefix: bool,
}

impl Default for Naming {
    fn default() -> Self {
        Naming {
            prefixes: DEFAULT_TABLE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            auto_remove_prefix: true,
        }
    }
}

impl Naming {
    pub fn new(prefixes: Vec<String>, auto_remove_prefix: bool) -> Self {
        Naming {
            prefixes,
            auto_remove_prefix,
        }
    }

    fn base<'a>(&self, table_name: &'a str) -> &'a str {
        if self.auto_remove_prefix {
            strip_prefix(table_name, &self.prefixes)
        } else {
            table_name
        }
    }

    pub fn to_identifier_case(&self, table_name: &str, style: IdentifierStyle) -> String {
        convert_case(self.base(table_name), style)
    }

    /// "t_order_item" -> "OrderItem"
    pub fn class_name(&self, table_name: &str) -> String {
        self.to_identifier_case(table_name, IdentifierStyle::Pascal)
    }

    /// "t_order_item" -> "order_item"; used for file names and route paths.
    pub fn business_name(&self, table_name: &str) -> String {
        self.base(table_name).to_lowercase()
    }

    /// Last dotted segment of the package: "com.acme.system" -> "system".
    pub fn module_name(package_name: &str) -> String {
        package_name
            .rsplit('.')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(package_name)
            .to_string()
    }

    /// Human label: the table comment, or the class name when there is none.
    pub fn function_name(table_comment: &str, class_name: &str) -> String {
        let trimmed = table_comment.trim();
        if trimmed.is_empty() {
            class_name.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Field identifier for a column. Columns never have table prefixes stripped.
    pub fn field_name(column_name: &str) -> String {
        convert_case(column_name, IdentifierStyle::Camel)
    }
}
