//! Directive scanner and block tree builder.
//!
//! Directives: `#foreach ($item in $list)`, `#if(condition)`, `#else`, `#end`.
//! Whitespace: after an opener or `#else`, spaces/tabs and one line break are consumed.
//! A directive alone on its line also loses its indentation and trailing line break.

use crate::error::TemplateError;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Text(String),
    Foreach {
        item: String,
        list: String,
        body: Vec<Node>,
        at: Pos,
    },
    If {
        condition: String,
        then: Vec<Node>,
        otherwise: Vec<Node>,
        at: Pos,
    },
}

#[derive(Debug)]
enum Kind {
    Foreach { item: String, list: String },
    If { condition: String },
    Else,
    End,
}

impl Kind {
    fn construct(&self) -> &'static str {
        match self {
            Kind::Foreach { .. } => "#foreach",
            Kind::If { .. } => "#if",
            Kind::Else => "#else",
            Kind::End => "#end",
        }
    }
}

#[derive(Debug)]
struct Directive {
    kind: Kind,
    /// Removed span, including trimmed whitespace.
    start: usize,
    end: usize,
    at: Pos,
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#(?:foreach|if|else|end)\b").expect("static regex"))
}

fn foreach_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#foreach\s*\(\s*\$([A-Za-z_][A-Za-z0-9_]*)\s+in\s+\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?\s*\)")
            .expect("static regex")
    })
}

pub(crate) fn position(src: &str, offset: usize) -> Pos {
    let before = src.get(..offset).unwrap_or(src);
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before.get(line_start..).map(|s| s.chars().count()).unwrap_or(0) + 1;
    Pos { line, column }
}

fn syntax(src: &str, offset: usize, construct: &'static str, message: impl Into<String>) -> TemplateError {
    let at = position(src, offset);
    TemplateError::Syntax {
        construct,
        line: at.line,
        column: at.column,
        message: message.into(),
    }
}

/// Byte index of the `)` closing the `(` at `open`. Quotes may contain parentheses.
fn matching_paren(src: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in src.get(open..)?.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn skip_horizontal(src: &str, mut i: usize) -> usize {
    let bytes = src.as_bytes();
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

/// Index just past a line break at `i`, if there is one.
fn skip_newline(src: &str, i: usize) -> Option<usize> {
    let rest = src.get(i..)?;
    if rest.starts_with("\r\n") {
        Some(i + 2)
    } else if rest.starts_with('\n') {
        Some(i + 1)
    } else {
        None
    }
}

fn trimmed_span(src: &str, hash: usize, head_end: usize, opener: bool) -> (usize, usize) {
    let line_start = src.get(..hash).and_then(|s| s.rfind('\n')).map(|i| i + 1).unwrap_or(0);
    let indented_alone = src
        .get(line_start..hash)
        .map(|s| s.chars().all(|c| c == ' ' || c == '\t'))
        .unwrap_or(false);
    let after_ws = skip_horizontal(src, head_end);
    let line_break = skip_newline(src, after_ws);
    let at_eof = after_ws >= src.len();
    let standalone = indented_alone && (line_break.is_some() || at_eof);

    let start = if standalone { line_start } else { hash };
    let end = match (opener, standalone) {
        (true, _) => line_break.unwrap_or(after_ws),
        (false, true) => line_break.unwrap_or(after_ws),
        (false, false) => head_end,
    };
    (start, end)
}

fn scan(src: &str) -> Result<Vec<Directive>, TemplateError> {
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(m) = directive_re().find_at(src, cursor) {
        let hash = m.start();
        let at = position(src, hash);
        let (kind, head_end) = match m.as_str() {
            "#foreach" => {
                let tail = src.get(hash..).unwrap_or("");
                let caps = foreach_header_re()
                    .captures(tail)
                    .ok_or_else(|| syntax(src, hash, "#foreach", "expected `#foreach ($item in $list)`"))?;
                let item = caps.get(1).map(|g| g.as_str().to_string()).unwrap_or_default();
                let list = caps.get(2).map(|g| g.as_str().to_string()).unwrap_or_default();
                let len = caps.get(0).map(|g| g.end()).unwrap_or(0);
                (Kind::Foreach { item, list }, hash + len)
            }
            "#if" => {
                let open = skip_horizontal(src, m.end());
                if src.as_bytes().get(open) != Some(&b'(') {
                    return Err(syntax(src, hash, "#if", "expected `(` after #if"));
                }
                let close = matching_paren(src, open)
                    .ok_or_else(|| syntax(src, hash, "#if", "unterminated condition"))?;
                let condition = src.get(open + 1..close).unwrap_or("").trim().to_string();
                (Kind::If { condition }, close + 1)
            }
            "#else" => (Kind::Else, m.end()),
            _ => (Kind::End, m.end()),
        };
        let opener = !matches!(kind, Kind::End);
        let (start, end) = trimmed_span(src, hash, head_end, opener);
        out.push(Directive { kind, start, end, at });
        cursor = end.max(head_end);
    }
    Ok(out)
}

enum Frame {
    Foreach {
        item: String,
        list: String,
        body: Vec<Node>,
        at: Pos,
    },
    If {
        condition: String,
        then: Vec<Node>,
        otherwise: Option<Vec<Node>>,
        at: Pos,
    },
}

impl Frame {
    fn active(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::Foreach { body, .. } => body,
            Frame::If { then, otherwise, .. } => match otherwise {
                Some(o) => o,
                None => then,
            },
        }
    }

    fn construct(&self) -> &'static str {
        match self {
            Frame::Foreach { .. } => "#foreach",
            Frame::If { .. } => "#if",
        }
    }

    fn at(&self) -> Pos {
        match self {
            Frame::Foreach { at, .. } | Frame::If { at, .. } => *at,
        }
    }

    fn into_node(self) -> Node {
        match self {
            Frame::Foreach { item, list, body, at } => Node::Foreach { item, list, body, at },
            Frame::If {
                condition,
                then,
                otherwise,
                at,
            } => Node::If {
                condition,
                then,
                otherwise: otherwise.unwrap_or_default(),
                at,
            },
        }
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if !text.is_empty() {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Parse a template into a block tree. Unbalanced blocks and nested `#foreach` are hard errors.
pub fn parse(src: &str) -> Result<Vec<Node>, TemplateError> {
    let directives = scan(src)?;
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut cursor = 0;

    for d in directives {
        let text = src.get(cursor..d.start).unwrap_or("");
        match stack.last_mut() {
            Some(frame) => push_text(frame.active(), text),
            None => push_text(&mut root, text),
        }
        cursor = d.end;

        match d.kind {
            Kind::Foreach { item, list } => {
                if let Some(outer) = stack.iter().find(|f| matches!(f, Frame::Foreach { .. })) {
                    let outer_at = outer.at();
                    return Err(TemplateError::Syntax {
                        construct: "#foreach",
                        line: d.at.line,
                        column: d.at.column,
                        message: format!(
                            "nested #foreach is not supported (outer loop opened at line {}, column {})",
                            outer_at.line, outer_at.column
                        ),
                    });
                }
                stack.push(Frame::Foreach {
                    item,
                    list,
                    body: Vec::new(),
                    at: d.at,
                });
            }
            Kind::If { condition } => stack.push(Frame::If {
                condition,
                then: Vec::new(),
                otherwise: None,
                at: d.at,
            }),
            Kind::Else => match stack.last_mut() {
                Some(Frame::If { otherwise, .. }) if otherwise.is_none() => *otherwise = Some(Vec::new()),
                Some(Frame::If { .. }) => {
                    return Err(TemplateError::Syntax {
                        construct: d.kind.construct(),
                        line: d.at.line,
                        column: d.at.column,
                        message: "duplicate #else in one #if block".into(),
                    })
                }
                _ => {
                    return Err(TemplateError::Syntax {
                        construct: d.kind.construct(),
                        line: d.at.line,
                        column: d.at.column,
                        message: "#else outside of an #if block".into(),
                    })
                }
            },
            Kind::End => {
                let frame = stack.pop().ok_or(TemplateError::Syntax {
                    construct: "#end",
                    line: d.at.line,
                    column: d.at.column,
                    message: "#end without an open block".into(),
                })?;
                let node = frame.into_node();
                match stack.last_mut() {
                    Some(parent) => parent.active().push(node),
                    None => root.push(node),
                }
            }
        }
    }

    if let Some(open) = stack.last() {
        let at = open.at();
        return Err(TemplateError::Syntax {
            construct: open.construct(),
            line: at.line,
            column: at.column,
            message: "block is missing its #end".into(),
        });
    }
    push_text(&mut root, src.get(cursor..).unwrap_or(""));
    Ok(root)
}
