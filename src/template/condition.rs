//! `#if` condition language.
//!
//! ```text
//! expr    := and ("||" and)*
//! and     := unary ("&&" unary)*
//! unary   := "!" unary | primary
//! primary := "(" expr ")" | operand (cmp operand)?
//! cmp     := "==" | "!=" | "<" | "<=" | ">" | ">="
//! operand := "..." | '...' | $name | $item.field | ${name} | ${item.field} | bare word
//! ```
//!
//! A lone operand is true unless it is empty, `false` or `0`. Ordering compares strings.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("{0}")]
pub struct ConditionError(pub String);

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Literal(String),
    Ref { name: String, field: Option<String> },
    Op(&'static str),
    Open,
    Close,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_bare(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '!' | '=' | '<' | '>' | '&' | '|' | '"' | '\'' | '$')
}

fn take_ident(chars: &[char], i: &mut usize) -> Option<String> {
    if *i < chars.len() && is_ident_start(chars[*i]) {
        let start = *i;
        while *i < chars.len() && is_ident(chars[*i]) {
            *i += 1;
        }
        Some(chars[start..*i].iter().collect())
    } else {
        None
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, ConditionError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            _ if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ConditionError("unterminated string literal".into())),
                        Some('\\') => {
                            if let Some(escaped) = chars.get(i + 1) {
                                value.push(*escaped);
                            }
                            i += 2;
                        }
                        Some(ch) if *ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            value.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Literal(value));
            }
            '$' => {
                i += 1;
                let braced = chars.get(i) == Some(&'{');
                if braced {
                    i += 1;
                }
                let name = take_ident(&chars, &mut i)
                    .ok_or_else(|| ConditionError("expected a name after `$`".into()))?;
                let mut field = None;
                if chars.get(i) == Some(&'.') {
                    i += 1;
                    field = Some(
                        take_ident(&chars, &mut i)
                            .ok_or_else(|| ConditionError(format!("expected a field name after `{}.`", name)))?,
                    );
                }
                if braced {
                    if chars.get(i) != Some(&'}') {
                        return Err(ConditionError("unclosed `${`".into()));
                    }
                    i += 1;
                }
                tokens.push(Token::Ref { name, field });
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Op("=="));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Op("!="));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Op("!"));
                i += 1;
            }
            '<' | '>' => {
                let op = match (c, next) {
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('<', _) => "<",
                    _ => ">",
                };
                i += op.len();
                tokens.push(Token::Op(op));
            }
            '&' if next == Some('&') => {
                tokens.push(Token::Op("&&"));
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Op("||"));
                i += 2;
            }
            _ if is_bare(c) => {
                let start = i;
                while i < chars.len() && is_bare(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Literal(chars[start..i].iter().collect()));
            }
            _ => return Err(ConditionError(format!("unexpected `{}`", c))),
        }
    }
    Ok(tokens)
}

fn truthy(value: &str) -> bool {
    !value.is_empty() && value != "false" && value != "0"
}

struct Parser<'a, R> {
    tokens: Vec<Token>,
    pos: usize,
    resolve: &'a R,
}

impl<R> Parser<'_, R>
where
    R: Fn(&str, Option<&str>) -> String,
{
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<bool, ConditionError> {
        let mut value = self.and()?;
        while self.eat_op("||") {
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, ConditionError> {
        let mut value = self.unary()?;
        while self.eat_op("&&") {
            let rhs = self.unary()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<bool, ConditionError> {
        if self.eat_op("!") {
            return Ok(!self.unary()?);
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<bool, ConditionError> {
        if matches!(self.peek(), Some(Token::Open)) {
            self.pos += 1;
            let value = self.or()?;
            if !matches!(self.peek(), Some(Token::Close)) {
                return Err(ConditionError("expected `)`".into()));
            }
            self.pos += 1;
            return Ok(value);
        }
        let lhs = self.operand()?;
        let op = match self.peek() {
            Some(Token::Op(op)) if matches!(*op, "==" | "!=" | "<" | "<=" | ">" | ">=") => *op,
            _ => return Ok(truthy(&lhs)),
        };
        self.pos += 1;
        let rhs = self.operand()?;
        Ok(match op {
            "==" => lhs == rhs,
            "!=" => lhs != rhs,
            "<" => lhs < rhs,
            "<=" => lhs <= rhs,
            ">" => lhs > rhs,
            _ => lhs >= rhs,
        })
    }

    fn operand(&mut self) -> Result<String, ConditionError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| ConditionError("unexpected end of condition".into()))?;
        self.pos += 1;
        match token {
            Token::Literal(value) => Ok(value),
            Token::Ref { name, field } => Ok((self.resolve)(&name, field.as_deref())),
            Token::Op(op) => Err(ConditionError(format!("expected a value, found `{}`", op))),
            Token::Open | Token::Close => Err(ConditionError("expected a value, found a parenthesis".into())),
        }
    }
}

/// Evaluate a condition. `resolve` maps `$name` / `$item.field` references to their text.
pub fn evaluate<R>(condition: &str, resolve: &R) -> Result<bool, ConditionError>
where
    R: Fn(&str, Option<&str>) -> String,
{
    let tokens = tokenize(condition)?;
    if tokens.is_empty() {
        return Err(ConditionError("empty condition".into()));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        resolve,
    };
    let value = parser.or()?;
    if parser.pos != parser.tokens.len() {
        return Err(ConditionError("trailing tokens after condition".into()));
    }
    Ok(value)
}
