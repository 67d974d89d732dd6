//! Expression grammar and evaluation for template tags.
//!
//! Expressions appear inside `{{ }}` output tags and `{% if %}` / `{% for %}`
//! block tags. The grammar, lowest precedence first:
//!
//! ```text
//! or          := and ( "or" and )*
//! and         := not ( "and" not )*
//! not         := "not" not | comparison
//! comparison  := postfix ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" | "in" | "not in" ) postfix )?
//! postfix     := primary ( "." ident | "[" or "]" | "|" ident ( "(" args ")" )? )*
//! primary     := literal | ident | "(" or ")"
//! ```
//!
//! Evaluation operates on [`serde_json::Value`] with Jinja truthiness:
//! `false`, `null`, `0`, `""`, `[]` and `{}` are falsy, everything else is
//! truthy. Undefined variables are resolved through the renderer's scope and
//! handled there according to the configured strictness; the one exception is
//! the `default(...)` filter, whose input may be undefined without raising.

use serde_json::Value;
use std::fmt;

use crate::core::{PlatekitError, Result};

/// Binary operators, in source syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `or`
    Or,
    /// `and`
    And,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `in`
    In,
    /// `not in`
    NotIn,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not in",
        };
        write!(f, "{s}")
    }
}

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal string, number, boolean, or null
    Literal(Value),
    /// A bare variable reference
    Ident(String),
    /// Dotted member access, `base.field`
    Member(Box<Expr>, String),
    /// Subscript access, `base[index]`
    Index(Box<Expr>, Box<Expr>),
    /// Boolean negation, `not expr`
    Not(Box<Expr>),
    /// Binary operation
    Binary {
        /// Operator
        op: BinOp,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Filter application, `input | name(args...)`
    Filter {
        /// Expression the filter applies to
        input: Box<Expr>,
        /// Filter name
        name: String,
        /// Filter arguments
        args: Vec<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Member(base, field) => write!(f, "{base}.{field}"),
            Self::Index(base, index) => write!(f, "{base}[{index}]"),
            Self::Not(inner) => write!(f, "not {inner}"),
            Self::Binary {
                op,
                left,
                right,
            } => write!(f, "{left} {op} {right}"),
            Self::Filter {
                input,
                name,
                ..
            } => write!(f, "{input} | {name}"),
        }
    }
}

/// The dotted display name of a variable reference, for error messages.
///
/// Returns `None` when the expression is not a plain variable/member path.
#[must_use]
pub fn reference_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(name) => Some(name.clone()),
        Expr::Member(base, field) => Some(format!("{}.{}", reference_name(base)?, field)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ExprToken {
    Ident(String),
    Str(String),
    Num(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    Pipe,
    Comma,
    Op(BinOp),
}

struct ExprLexer;

impl ExprLexer {
    fn tokenize(source: &str, line: usize, column: usize) -> Result<Vec<ExprToken>> {
        let syntax = |message: String| PlatekitError::Syntax {
            message,
            line,
            column,
        };
        let mut tokens = Vec::new();
        let chars: Vec<char> = source.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                ' ' | '\t' | '\n' | '\r' => i += 1,
                '(' => {
                    tokens.push(ExprToken::LParen);
                    i += 1;
                }
                ')' => {
                    tokens.push(ExprToken::RParen);
                    i += 1;
                }
                '[' => {
                    tokens.push(ExprToken::LBracket);
                    i += 1;
                }
                ']' => {
                    tokens.push(ExprToken::RBracket);
                    i += 1;
                }
                '.' => {
                    tokens.push(ExprToken::Dot);
                    i += 1;
                }
                '|' => {
                    tokens.push(ExprToken::Pipe);
                    i += 1;
                }
                ',' => {
                    tokens.push(ExprToken::Comma);
                    i += 1;
                }
                '\'' | '"' => {
                    let quote = c;
                    let start = i + 1;
                    let mut end = start;
                    while end < chars.len() && chars[end] != quote {
                        end += 1;
                    }
                    if end >= chars.len() {
                        return Err(syntax(format!("unterminated string literal in '{source}'")));
                    }
                    tokens.push(ExprToken::Str(chars[start..end].iter().collect()));
                    i = end + 1;
                }
                '=' if chars.get(i + 1) == Some(&'=') => {
                    tokens.push(ExprToken::Op(BinOp::Eq));
                    i += 2;
                }
                '!' if chars.get(i + 1) == Some(&'=') => {
                    tokens.push(ExprToken::Op(BinOp::Ne));
                    i += 2;
                }
                '<' => {
                    if chars.get(i + 1) == Some(&'=') {
                        tokens.push(ExprToken::Op(BinOp::Le));
                        i += 2;
                    } else {
                        tokens.push(ExprToken::Op(BinOp::Lt));
                        i += 1;
                    }
                }
                '>' => {
                    if chars.get(i + 1) == Some(&'=') {
                        tokens.push(ExprToken::Op(BinOp::Ge));
                        i += 2;
                    } else {
                        tokens.push(ExprToken::Op(BinOp::Gt));
                        i += 1;
                    }
                }
                '-' | '0'..='9' => {
                    let start = i;
                    i += 1;
                    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                        i += 1;
                    }
                    let text: String = chars[start..i].iter().collect();
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| syntax(format!("invalid number literal '{text}'")))?;
                    tokens.push(ExprToken::Num(value));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let start = i;
                    while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                        i += 1;
                    }
                    tokens.push(ExprToken::Ident(chars[start..i].iter().collect()));
                }
                other => {
                    return Err(syntax(format!("unexpected character '{other}' in expression")));
                }
            }
        }

        Ok(tokens)
    }
}

/// Recursive-descent expression parser.
pub struct ExprParser {
    tokens: Vec<ExprToken>,
    pos: usize,
    line: usize,
    column: usize,
}

impl ExprParser {
    /// Parse a complete expression from tag-inner source.
    ///
    /// `line` / `column` position the enclosing tag for error attribution.
    ///
    /// # Errors
    ///
    /// Returns [`PlatekitError::Syntax`] for malformed expressions.
    pub fn parse(source: &str, line: usize, column: usize) -> Result<Expr> {
        let tokens = ExprLexer::tokenize(source, line, column)?;
        let mut parser = Self {
            tokens,
            pos: 0,
            line,
            column,
        };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(parser.syntax(format!("trailing tokens after expression '{source}'")));
        }
        Ok(expr)
    }

    fn syntax(&self, message: String) -> PlatekitError {
        PlatekitError::Syntax {
            message,
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<&ExprToken> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<ExprToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if matches!(self.peek(), Some(ExprToken::Ident(k)) if k == keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &ExprToken, context: &str) -> Result<()> {
        match self.advance() {
            Some(token) if &token == expected => Ok(()),
            _ => Err(self.syntax(format!("expected {context}"))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat_keyword("and") {
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            Ok(Expr::Not(Box::new(self.parse_not()?)))
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_postfix()?;

        let op = match self.peek() {
            Some(ExprToken::Op(op)) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            Some(ExprToken::Ident(k)) if k == "in" => {
                self.pos += 1;
                Some(BinOp::In)
            }
            Some(ExprToken::Ident(k)) if k == "not" => {
                // "x not in xs"
                if matches!(self.tokens.get(self.pos + 1), Some(ExprToken::Ident(k2)) if k2 == "in")
                {
                    self.pos += 2;
                    Some(BinOp::NotIn)
                } else {
                    None
                }
            }
            _ => None,
        };

        match op {
            Some(op) => {
                let right = self.parse_postfix()?;
                Ok(Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            None => Ok(left),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(ExprToken::Dot) => {
                    self.pos += 1;
                    match self.advance() {
                        Some(ExprToken::Ident(field)) => {
                            expr = Expr::Member(Box::new(expr), field);
                        }
                        _ => return Err(self.syntax("expected field name after '.'".to_string())),
                    }
                }
                Some(ExprToken::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_or()?;
                    self.expect(&ExprToken::RBracket, "']' after index")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Some(ExprToken::Pipe) => {
                    self.pos += 1;
                    let name = match self.advance() {
                        Some(ExprToken::Ident(name)) => name,
                        _ => return Err(self.syntax("expected filter name after '|'".to_string())),
                    };
                    let mut args = Vec::new();
                    if matches!(self.peek(), Some(ExprToken::LParen)) {
                        self.pos += 1;
                        if !matches!(self.peek(), Some(ExprToken::RParen)) {
                            loop {
                                args.push(self.parse_or()?);
                                if matches!(self.peek(), Some(ExprToken::Comma)) {
                                    self.pos += 1;
                                } else {
                                    break;
                                }
                            }
                        }
                        self.expect(&ExprToken::RParen, "')' after filter arguments")?;
                    }
                    expr = Expr::Filter {
                        input: Box::new(expr),
                        name,
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(ExprToken::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(ExprToken::Num(n)) => {
                let value = if n.fract() == 0.0 && n.abs() < 9e15 {
                    Value::from(n as i64)
                } else {
                    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
                };
                Ok(Expr::Literal(value))
            }
            Some(ExprToken::Ident(word)) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "none" | "null" => Ok(Expr::Literal(Value::Null)),
                _ => Ok(Expr::Ident(word)),
            },
            Some(ExprToken::LParen) => {
                let expr = self.parse_or()?;
                self.expect(&ExprToken::RParen, "closing ')'")?;
                Ok(expr)
            }
            Some(other) => Err(self.syntax(format!("unexpected token {other:?} in expression"))),
            None => Err(self.syntax("expected an expression".to_string())),
        }
    }
}

/// Jinja truthiness over JSON values.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluate a comparison between two values.
pub fn compare(op: BinOp, left: &Value, right: &Value, line: usize, column: usize) -> Result<bool> {
    match op {
        BinOp::Eq => Ok(left == right),
        BinOp::Ne => Ok(left != right),
        BinOp::In => contains(right, left, line, column),
        BinOp::NotIn => contains(right, left, line, column).map(|found| !found),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ordering = match (left, right) {
                (Value::Number(a), Value::Number(b)) => a
                    .as_f64()
                    .zip(b.as_f64())
                    .and_then(|(a, b)| a.partial_cmp(&b)),
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return Err(PlatekitError::Syntax {
                    message: format!(
                        "cannot order {} and {} with '{op}'",
                        crate::definition::value_type_name(left),
                        crate::definition::value_type_name(right)
                    ),
                    line,
                    column,
                });
            };
            Ok(match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                BinOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            })
        }
        BinOp::And | BinOp::Or => unreachable!("logical operators are short-circuited by eval"),
    }
}

/// Membership test: arrays by element, strings by substring, objects by key.
fn contains(haystack: &Value, needle: &Value, line: usize, column: usize) -> Result<bool> {
    match haystack {
        Value::Array(items) => Ok(items.contains(needle)),
        Value::String(s) => match needle {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            _ => Ok(false),
        },
        Value::Object(map) => match needle {
            Value::String(key) => Ok(map.contains_key(key)),
            _ => Ok(false),
        },
        other => Err(PlatekitError::Syntax {
            message: format!(
                "'in' needs an array, string, or object on the right, got {}",
                crate::definition::value_type_name(other)
            ),
            line,
            column,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(source: &str) -> Expr {
        ExprParser::parse(source, 1, 1).unwrap()
    }

    #[test]
    fn test_parse_ident() {
        assert_eq!(parse("node_version"), Expr::Ident("node_version".to_string()));
    }

    #[test]
    fn test_parse_member_chain() {
        assert_eq!(
            parse("option.field"),
            Expr::Member(Box::new(Expr::Ident("option".to_string())), "field".to_string())
        );
    }

    #[test]
    fn test_parse_filter_with_args() {
        let expr = parse("name | default('18')");
        match expr {
            Expr::Filter {
                name,
                args,
                ..
            } => {
                assert_eq!(name, "default");
                assert_eq!(args, vec![Expr::Literal(json!("18"))]);
            }
            other => panic!("expected filter, got {other:?}"),
        }
    }

    #[test]
    fn test_filter_binds_tighter_than_comparison() {
        let expr = parse("a == b | lower");
        match expr {
            Expr::Binary {
                op: BinOp::Eq,
                right,
                ..
            } => {
                assert!(matches!(*right, Expr::Filter { .. }));
            }
            other => panic!("expected comparison, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_not_in() {
        let expr = parse("'gzip' not in encodings");
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinOp::NotIn,
                ..
            }
        ));
    }

    #[test]
    fn test_precedence_or_over_and() {
        // a or b and c parses as a or (b and c)
        let expr = parse("a or b and c");
        match expr {
            Expr::Binary {
                op: BinOp::Or,
                right,
                ..
            } => {
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected or at top, got {other:?}"),
        }
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(ExprParser::parse("a b", 1, 1).is_err());
    }

    #[test]
    fn test_unterminated_string_rejected() {
        assert!(ExprParser::parse("'open", 1, 1).is_err());
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!([0])));
    }

    #[test]
    fn test_compare_membership() {
        assert!(compare(BinOp::In, &json!("a"), &json!(["a", "b"]), 1, 1).unwrap());
        assert!(compare(BinOp::In, &json!("el"), &json!("hello"), 1, 1).unwrap());
        assert!(!compare(BinOp::In, &json!("z"), &json!({"a": 1}), 1, 1).unwrap());
        assert!(compare(BinOp::NotIn, &json!("z"), &json!(["a"]), 1, 1).unwrap());
    }

    #[test]
    fn test_compare_ordering() {
        assert!(compare(BinOp::Lt, &json!(1), &json!(2), 1, 1).unwrap());
        assert!(compare(BinOp::Ge, &json!("b"), &json!("a"), 1, 1).unwrap());
        assert!(compare(BinOp::Lt, &json!(1), &json!("a"), 1, 1).is_err());
    }
}
