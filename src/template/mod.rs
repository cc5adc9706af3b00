//! Template expansion.
//!
//! A template is plain text with `${name}` placeholders and block directives:
//!
//! ```text
//! #foreach ($c in $columns)
//!     pub ${c.field_name}: ${c.rust_type},
//! #end
//! #if(${has_pk} == "true")...#else...#end
//! ```
//!
//! Unknown placeholders expand to the empty string. Structural problems (unclosed blocks, stray
//! `#else`/`#end`, nested `#foreach`) fail with [`TemplateError::Syntax`]. A condition that cannot
//! be evaluated drops its whole block and logs a warning.

mod condition;
mod parse;

use crate::error::TemplateError;
use parse::Node;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

pub use condition::ConditionError;
pub use parse::Pos;

/// Named list of fields every record of one kind carries.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl RecordSchema {
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        RecordSchema { name, fields }
    }

    /// Build a record; values are given in field order and must match the field count.
    pub fn record<I, S>(&'static self, values: I) -> Result<Record, TemplateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != self.fields.len() {
            return Err(TemplateError::RecordArity {
                record: self.name,
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        Ok(Record { schema: self, values })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    schema: &'static RecordSchema,
    values: Vec<String>,
}

impl Record {
    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        let idx = self.schema.fields.iter().position(|f| *f == field)?;
        self.values.get(idx).map(String::as_str)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Text(String),
    List(Vec<Record>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Text(b.to_string())
    }
}

impl From<Vec<Record>> for Value {
    fn from(records: Vec<Record>) -> Self {
        Value::List(records)
    }
}

pub type Scope = HashMap<String, Value>;

/// A parsed template, reusable across scopes.
#[derive(Clone, Debug)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn parse(src: &str) -> Result<Self, TemplateError> {
        Ok(Template {
            nodes: parse::parse(src)?,
        })
    }

    pub fn render(&self, scope: &Scope) -> String {
        let mut out = String::new();
        let env = Env { scope, item: None };
        render_nodes(&self.nodes, &env, &mut out);
        out
    }
}

/// Parse and render in one step.
pub fn expand(template: &str, scope: &Scope) -> Result<String, TemplateError> {
    Ok(Template::parse(template)?.render(scope))
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?:\.([A-Za-z_][A-Za-z0-9_]*))?\}").expect("static regex")
    })
}

struct Env<'a> {
    scope: &'a Scope,
    item: Option<(&'a str, &'a Record)>,
}

impl Env<'_> {
    fn resolve(&self, name: &str, field: Option<&str>) -> String {
        match field {
            None => match self.scope.get(name) {
                Some(Value::Text(s)) => s.clone(),
                Some(Value::List(_)) => {
                    tracing::debug!(name = %name, "list variable used as text");
                    String::new()
                }
                None => String::new(),
            },
            Some(field) => match self.item {
                Some((item, record)) if item == name => match record.get(field) {
                    Some(v) => v.to_string(),
                    None => {
                        tracing::debug!(record = %record.schema().name, field = %field, "unknown record field");
                        String::new()
                    }
                },
                _ => {
                    tracing::debug!(name = %name, field = %field, "unbound loop reference");
                    String::new()
                }
            },
        }
    }
}

fn render_nodes(nodes: &[Node], env: &Env<'_>, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => {
                let replaced = placeholder_re().replace_all(text, |caps: &Captures<'_>| {
                    let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                    env.resolve(name, caps.get(2).map(|m| m.as_str()))
                });
                out.push_str(&replaced);
            }
            Node::Foreach { item, list, body, at } => match env.scope.get(list) {
                Some(Value::List(records)) => {
                    for record in records {
                        let inner = Env {
                            scope: env.scope,
                            item: Some((item.as_str(), record)),
                        };
                        render_nodes(body, &inner, out);
                    }
                }
                Some(Value::Text(_)) => {
                    tracing::warn!(list = %list, line = at.line, "#foreach over a text variable; block skipped");
                }
                None => {
                    tracing::debug!(list = %list, line = at.line, "#foreach over an unknown list");
                }
            },
            Node::If {
                condition,
                then,
                otherwise,
                at,
            } => {
                let resolve = |name: &str, field: Option<&str>| env.resolve(name, field);
                match condition::evaluate(condition, &resolve) {
                    Ok(true) => render_nodes(then, env, out),
                    Ok(false) => render_nodes(otherwise, env, out),
                    Err(e) => {
                        tracing::warn!(
                            condition = %condition,
                            line = at.line,
                            column = at.column,
                            error = %e,
                            "unevaluable #if condition; block dropped"
                        );
                    }
                }
            }
        }
    }
}
