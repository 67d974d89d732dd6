//! Tokenizer for template bodies.
//!
//! Splits a body into raw text, `{{ expr }}` output tags, and `{% tag %}`
//! block tags. Every tag records the 1-based line and column of its opening
//! delimiter so later stages can attribute errors to a position in the body.
//!
//! Whitespace control follows the usual convention: `{{-` / `{%-` trim the
//! whitespace immediately before the tag, `-}}` / `-%}` trim the whitespace
//! immediately after it.

use crate::core::{PlatekitError, Result};

/// One lexed unit of a template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text copied through to the output
    Text(String),
    /// A `{{ expr }}` output tag; `expr` is the untrimmed inner source
    Output {
        /// Inner expression source
        expr: String,
        /// 1-based line of the opening `{{`
        line: usize,
        /// 1-based column of the opening `{{`
        column: usize,
    },
    /// A `{% ... %}` block tag; `content` is the untrimmed inner source
    Block {
        /// Inner tag source, e.g. `if spa_routing` or `endfor`
        content: String,
        /// 1-based line of the opening `{%`
        line: usize,
        /// 1-based column of the opening `{%`
        column: usize,
    },
}

/// Tokenize a template body.
///
/// # Errors
///
/// Returns [`PlatekitError::Syntax`] for an unterminated `{{` or `{%` tag,
/// positioned at the opening delimiter.
pub fn tokenize(body: &str) -> Result<Vec<Token>> {
    let bytes = body.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;
    let mut line = 1;
    let mut column = 1;
    // Set when a closing -}} / -%} asked to trim the start of the next text.
    let mut trim_next_text = false;

    while pos < bytes.len() {
        if bytes[pos] == b'{' && pos + 1 < bytes.len() && matches!(bytes[pos + 1], b'{' | b'%') {
            let is_output = bytes[pos + 1] == b'{';
            let tag_line = line;
            let tag_column = column;

            // Flush accumulated text, honoring whitespace-control flags on
            // both sides of the tag.
            let mut text = body[text_start..pos].to_string();
            if trim_next_text {
                text = text.trim_start().to_string();
            }
            let mut inner_start = pos + 2;
            let trim_before = inner_start < bytes.len() && bytes[inner_start] == b'-';
            if trim_before {
                inner_start += 1;
                text = text.trim_end().to_string();
            }
            if !text.is_empty() {
                tokens.push(Token::Text(text));
            }

            let close = if is_output { "}}" } else { "%}" };
            let (inner_end, close_end, trim_after) =
                find_close(body, inner_start, close).ok_or_else(|| PlatekitError::Syntax {
                    message: format!(
                        "unterminated {} tag",
                        if is_output { "'{{'" } else { "'{%'" }
                    ),
                    line: tag_line,
                    column: tag_column,
                })?;

            let inner = body[inner_start..inner_end].trim().to_string();
            if is_output {
                tokens.push(Token::Output {
                    expr: inner,
                    line: tag_line,
                    column: tag_column,
                });
            } else {
                tokens.push(Token::Block {
                    content: inner,
                    line: tag_line,
                    column: tag_column,
                });
            }

            advance_position(&body[pos..close_end], &mut line, &mut column);
            pos = close_end;
            text_start = pos;
            trim_next_text = trim_after;
        } else {
            if bytes[pos] == b'\n' {
                line += 1;
                column = 1;
            } else if bytes[pos] & 0b1100_0000 != 0b1000_0000 {
                // UTF-8 continuation bytes do not advance the column.
                column += 1;
            }
            pos += 1;
        }
    }

    let mut tail = body[text_start..].to_string();
    if trim_next_text {
        tail = tail.trim_start().to_string();
    }
    if !tail.is_empty() {
        tokens.push(Token::Text(tail));
    }

    Ok(tokens)
}

/// Find the closing delimiter starting at `from`, skipping quoted strings.
///
/// Returns `(inner_end, position_after_close, trim_after)`.
fn find_close(body: &str, from: usize, close: &str) -> Option<(usize, usize, bool)> {
    let bytes = body.as_bytes();
    let close_bytes = close.as_bytes();
    let mut pos = from;
    let mut quote: Option<u8> = None;

    while pos < bytes.len() {
        let b = bytes[pos];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
                pos += 1;
            }
            None => {
                if b == b'\'' || b == b'"' {
                    quote = Some(b);
                    pos += 1;
                } else if bytes[pos..].starts_with(close_bytes) {
                    // A '-' immediately before the close is the trim flag.
                    let trim_after = pos > from && bytes[pos - 1] == b'-';
                    let inner_end = if trim_after { pos - 1 } else { pos };
                    return Some((inner_end, pos + close_bytes.len(), trim_after));
                } else {
                    pos += 1;
                }
            }
        }
    }
    None
}

fn advance_position(consumed: &str, line: &mut usize, column: &mut usize) {
    for c in consumed.chars() {
        if c == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }
}
