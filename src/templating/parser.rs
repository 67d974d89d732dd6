//! Recursive-descent parser for template bodies.
//!
//! Consumes the token stream from [`super::lexer`] and produces an AST of
//! text, output expressions, conditionals, and loops. Block structure is
//! enforced here: every `{% if %}` needs its `{% endif %}`, every `{% for %}`
//! its `{% endfor %}`, and `{% elif %}` / `{% else %}` are only valid inside
//! an `if`. Nesting composes arbitrarily.

use crate::core::{PlatekitError, Result};

use super::expr::{Expr, ExprParser};
use super::lexer::{Token, tokenize};

/// One node of a parsed template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text
    Text(String),
    /// `{{ expr }}`
    Output {
        /// The expression to evaluate and substitute
        expr: Expr,
        /// 1-based line of the tag
        line: usize,
        /// 1-based column of the tag
        column: usize,
    },
    /// `{% if %} ... {% elif %} ... {% else %} ... {% endif %}`
    If {
        /// `(condition, body)` for the `if` and each `elif`, in order
        branches: Vec<(Expr, Vec<Node>)>,
        /// Body of the `else` branch, empty when absent
        else_body: Vec<Node>,
        /// 1-based line of the opening `if` tag
        line: usize,
        /// 1-based column of the opening `if` tag
        column: usize,
    },
    /// `{% for item in collection %} ... {% endfor %}`
    For {
        /// Loop variable name
        var: String,
        /// Expression producing the collection
        iterable: Expr,
        /// Loop body
        body: Vec<Node>,
        /// 1-based line of the `for` tag
        line: usize,
        /// 1-based column of the `for` tag
        column: usize,
    },
}

/// Parse a template body into an AST.
///
/// # Errors
///
/// Returns [`PlatekitError::Syntax`] for unterminated tags, unbalanced
/// blocks, unknown block keywords, and malformed expressions.
pub fn parse(body: &str) -> Result<Vec<Node>> {
    let tokens = tokenize(body)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
    };
    let nodes = parser.parse_nodes(&[], 1, 1)?;
    debug_assert!(parser.pos == parser.tokens.len());
    Ok(nodes)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// A `{% %}` tag split into its keyword and remainder.
struct BlockTag {
    keyword: String,
    rest: String,
    line: usize,
    column: usize,
}

impl Parser {
    /// Parse nodes until one of `stop` keywords appears at this nesting level.
    ///
    /// Returns with the cursor on the stopping block tag; the caller consumes
    /// it. With an empty `stop` list, parses to the end of input.
    /// `open_line` / `open_column` position the enclosing block for the
    /// unbalanced-block error.
    fn parse_nodes(&mut self, stop: &[&str], open_line: usize, open_column: usize) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();

        while let Some(token) = self.tokens.get(self.pos) {
            match token {
                Token::Text(text) => {
                    nodes.push(Node::Text(text.clone()));
                    self.pos += 1;
                }
                Token::Output {
                    expr,
                    line,
                    column,
                } => {
                    let parsed = ExprParser::parse(expr, *line, *column)?;
                    nodes.push(Node::Output {
                        expr: parsed,
                        line: *line,
                        column: *column,
                    });
                    self.pos += 1;
                }
                Token::Block {
                    ..
                } => {
                    let tag = self.peek_block_tag()?;
                    if stop.contains(&tag.keyword.as_str()) {
                        return Ok(nodes);
                    }
                    match tag.keyword.as_str() {
                        "if" => nodes.push(self.parse_if()?),
                        "for" => nodes.push(self.parse_for()?),
                        "elif" | "else" | "endif" | "endfor" => {
                            return Err(PlatekitError::Syntax {
                                message: format!(
                                    "'{}' without a matching opening block",
                                    tag.keyword
                                ),
                                line: tag.line,
                                column: tag.column,
                            });
                        }
                        unknown => {
                            return Err(PlatekitError::Syntax {
                                message: format!("unknown block tag '{unknown}'"),
                                line: tag.line,
                                column: tag.column,
                            });
                        }
                    }
                }
            }
        }

        if stop.is_empty() {
            Ok(nodes)
        } else {
            Err(PlatekitError::Syntax {
                message: format!(
                    "block opened here is missing {}",
                    join_keywords(stop)
                ),
                line: open_line,
                column: open_column,
            })
        }
    }

    /// Split the current block token without consuming it.
    fn peek_block_tag(&self) -> Result<BlockTag> {
        match &self.tokens[self.pos] {
            Token::Block {
                content,
                line,
                column,
            } => {
                let mut parts = content.splitn(2, char::is_whitespace);
                let keyword = parts.next().unwrap_or_default().to_string();
                let rest = parts.next().unwrap_or_default().trim().to_string();
                Ok(BlockTag {
                    keyword,
                    rest,
                    line: *line,
                    column: *column,
                })
            }
            _ => unreachable!("peek_block_tag called on a non-block token"),
        }
    }

    /// Consume the current block tag, which the caller already inspected.
    fn take_block_tag(&mut self) -> Result<BlockTag> {
        let tag = self.peek_block_tag()?;
        self.pos += 1;
        Ok(tag)
    }

    fn parse_if(&mut self) -> Result<Node> {
        let opening = self.take_block_tag()?;
        let (line, column) = (opening.line, opening.column);
        if opening.rest.is_empty() {
            return Err(PlatekitError::Syntax {
                message: "'if' tag needs a condition".to_string(),
                line,
                column,
            });
        }

        let mut branches = Vec::new();
        let mut else_body = Vec::new();
        let mut condition = ExprParser::parse(&opening.rest, line, column)?;

        loop {
            let body = self.parse_nodes(&["elif", "else", "endif"], line, column)?;
            let terminator = self.take_block_tag()?;
            match terminator.keyword.as_str() {
                "elif" => {
                    branches.push((condition, body));
                    if terminator.rest.is_empty() {
                        return Err(PlatekitError::Syntax {
                            message: "'elif' tag needs a condition".to_string(),
                            line: terminator.line,
                            column: terminator.column,
                        });
                    }
                    condition =
                        ExprParser::parse(&terminator.rest, terminator.line, terminator.column)?;
                }
                "else" => {
                    branches.push((condition, body));
                    else_body = self.parse_nodes(&["endif"], line, column)?;
                    self.take_block_tag()?;
                    break;
                }
                "endif" => {
                    branches.push((condition, body));
                    break;
                }
                _ => unreachable!("parse_nodes stops only on requested keywords"),
            }
        }

        Ok(Node::If {
            branches,
            else_body,
            line,
            column,
        })
    }

    fn parse_for(&mut self) -> Result<Node> {
        let opening = self.take_block_tag()?;
        let (line, column) = (opening.line, opening.column);

        // "item in collection"
        let mut parts = opening.rest.splitn(2, " in ");
        let var = parts.next().unwrap_or_default().trim().to_string();
        let iterable_source = parts.next().unwrap_or_default().trim().to_string();
        if var.is_empty()
            || iterable_source.is_empty()
            || !var.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(PlatekitError::Syntax {
                message: "'for' tag must have the form 'for <name> in <expr>'".to_string(),
                line,
                column,
            });
        }

        let iterable = ExprParser::parse(&iterable_source, line, column)?;
        let body = self.parse_nodes(&["endfor"], line, column)?;
        self.take_block_tag()?;

        Ok(Node::For {
            var,
            iterable,
            body,
            line,
            column,
        })
    }
}

fn join_keywords(keywords: &[&str]) -> String {
    keywords.iter().map(|k| format!("'{{% {k} %}}'")).collect::<Vec<_>>().join(" or ")
}
