//! AST evaluation against a resolved variable map.
//!
//! Rendering is a pure function of `(body, variables, options)`: no clock, no
//! environment, no global state. Undefined references are governed by
//! [`UndefinedBehavior`](super::UndefinedBehavior): strict mode raises
//! [`PlatekitError::UndefinedVariable`], permissive mode substitutes an empty
//! string and records a warning. The `default(...)` filter tolerates an
//! undefined input in both modes.
//!
//! `{% for %}` bodies see a `loop` object with `index` (1-based), `index0`,
//! `first`, `last`, and `length`; nested loops shadow it and the outer value
//! is restored on exit.

use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::trace;

use crate::core::{PlatekitError, Result, similar_names};
use crate::definition::value_type_name;

use super::expr::{BinOp, Expr, compare, is_truthy, reference_name};
use super::parser::Node;
use super::{RenderOptions, Rendered, UndefinedBehavior};

/// Render parsed nodes against a variable map.
pub fn render_nodes(
    nodes: &[Node],
    variables: &BTreeMap<String, Value>,
    options: &RenderOptions,
) -> Result<Rendered> {
    let mut context = RenderContext {
        variables,
        scopes: Vec::new(),
        options,
        warnings: Vec::new(),
    };
    let mut output = String::new();
    context.render(nodes, &mut output)?;
    trace!(bytes = output.len(), warnings = context.warnings.len(), "render complete");
    Ok(Rendered {
        output,
        warnings: context.warnings,
    })
}

struct RenderContext<'a> {
    variables: &'a BTreeMap<String, Value>,
    /// Innermost scope last; loop frames carry the item variable and `loop`.
    scopes: Vec<Map<String, Value>>,
    options: &'a RenderOptions,
    warnings: Vec<String>,
}

impl RenderContext<'_> {
    fn render(&mut self, nodes: &[Node], output: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => {
                    output.push_str(text);
                    self.check_output_limit(output)?;
                }
                Node::Output {
                    expr,
                    line,
                    column,
                } => {
                    let value = self.eval(expr, *line, *column, false)?;
                    output.push_str(&stringify(&value));
                    self.check_output_limit(output)?;
                }
                Node::If {
                    branches,
                    else_body,
                    line,
                    column,
                } => {
                    let mut taken = false;
                    for (condition, body) in branches {
                        let value = self.eval(condition, *line, *column, false)?;
                        if is_truthy(&value) {
                            self.render(body, output)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        self.render(else_body, output)?;
                    }
                }
                Node::For {
                    var,
                    iterable,
                    body,
                    line,
                    column,
                } => {
                    self.render_for(var, iterable, body, *line, *column, output)?;
                }
            }
        }
        Ok(())
    }

    fn render_for(
        &mut self,
        var: &str,
        iterable: &Expr,
        body: &[Node],
        line: usize,
        column: usize,
        output: &mut String,
    ) -> Result<()> {
        let collection = self.eval(iterable, line, column, false)?;
        let items = match collection {
            Value::Array(items) => items,
            // A permissive-mode undefined collection iterates zero times.
            Value::Null => Vec::new(),
            other => {
                return Err(PlatekitError::TypeMismatch {
                    variable: reference_name(iterable).unwrap_or_else(|| iterable.to_string()),
                    expected: "array".to_string(),
                    actual: value_type_name(&other).to_string(),
                });
            }
        };

        if items.len() > self.options.max_loop_iterations {
            return Err(PlatekitError::LoopLimitExceeded {
                limit: self.options.max_loop_iterations,
                line,
            });
        }

        let length = items.len();
        for (index, item) in items.into_iter().enumerate() {
            let mut frame = Map::new();
            frame.insert(var.to_string(), item);
            frame.insert(
                "loop".to_string(),
                json!({
                    "index": index + 1,
                    "index0": index,
                    "first": index == 0,
                    "last": index + 1 == length,
                    "length": length,
                }),
            );
            self.scopes.push(frame);
            let result = self.render(body, output);
            self.scopes.pop();
            result?;
        }
        Ok(())
    }

    fn check_output_limit(&self, output: &str) -> Result<()> {
        if output.len() > self.options.max_output_bytes {
            Err(PlatekitError::OutputLimitExceeded {
                limit: self.options.max_output_bytes,
            })
        } else {
            Ok(())
        }
    }

    /// Evaluate an expression. `tolerant` suppresses undefined-variable
    /// handling entirely (used for the input of the `default` filter).
    fn eval(&mut self, expr: &Expr, line: usize, column: usize, tolerant: bool) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Ident(name) => match self.lookup(name) {
                Some(value) => Ok(value),
                None => self.undefined(name, line, column, tolerant),
            },
            Expr::Member(base, field) => {
                let base_value = self.eval(base, line, column, tolerant)?;
                match &base_value {
                    Value::Object(map) => match map.get(field) {
                        Some(value) => Ok(value.clone()),
                        None => {
                            let name = reference_name(expr)
                                .unwrap_or_else(|| format!("{base}.{field}"));
                            self.undefined(&name, line, column, tolerant)
                        }
                    },
                    // Undefined base already resolved to null; stay null.
                    Value::Null => Ok(Value::Null),
                    other => Err(PlatekitError::Syntax {
                        message: format!(
                            "cannot access field '{field}' on {}",
                            value_type_name(other)
                        ),
                        line,
                        column,
                    }),
                }
            }
            Expr::Index(base, index) => {
                let base_value = self.eval(base, line, column, tolerant)?;
                let index_value = self.eval(index, line, column, false)?;
                match (&base_value, &index_value) {
                    (Value::Array(items), Value::Number(n)) => {
                        let position = n.as_u64().and_then(|i| items.get(i as usize));
                        match position {
                            Some(value) => Ok(value.clone()),
                            None => self.undefined(
                                &format!("{base}[{index_value}]"),
                                line,
                                column,
                                tolerant,
                            ),
                        }
                    }
                    (Value::Object(map), Value::String(key)) => match map.get(key) {
                        Some(value) => Ok(value.clone()),
                        None => self.undefined(&format!("{base}['{key}']"), line, column, tolerant),
                    },
                    (Value::Null, _) => Ok(Value::Null),
                    (other, _) => Err(PlatekitError::Syntax {
                        message: format!("cannot index into {}", value_type_name(other)),
                        line,
                        column,
                    }),
                }
            }
            Expr::Not(inner) => {
                let value = self.eval(inner, line, column, tolerant)?;
                Ok(Value::Bool(!is_truthy(&value)))
            }
            Expr::Binary {
                op,
                left,
                right,
            } => match op {
                BinOp::And => {
                    let left_value = self.eval(left, line, column, tolerant)?;
                    if is_truthy(&left_value) {
                        self.eval(right, line, column, tolerant)
                    } else {
                        Ok(left_value)
                    }
                }
                BinOp::Or => {
                    let left_value = self.eval(left, line, column, tolerant)?;
                    if is_truthy(&left_value) {
                        Ok(left_value)
                    } else {
                        self.eval(right, line, column, tolerant)
                    }
                }
                _ => {
                    let left_value = self.eval(left, line, column, tolerant)?;
                    let right_value = self.eval(right, line, column, tolerant)?;
                    compare(*op, &left_value, &right_value, line, column).map(Value::Bool)
                }
            },
            Expr::Filter {
                input,
                name,
                args,
            } => {
                // `default` is the one filter whose input may be undefined.
                let input_value = self.eval(input, line, column, tolerant || name == "default")?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in args {
                    arg_values.push(self.eval(arg, line, column, false)?);
                }
                super::filters::apply(name, input_value, &arg_values, line, column)
            }
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        for frame in self.scopes.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        self.variables.get(name).cloned()
    }

    fn undefined(
        &mut self,
        name: &str,
        line: usize,
        column: usize,
        tolerant: bool,
    ) -> Result<Value> {
        if tolerant {
            return Ok(Value::Null);
        }
        match self.options.undefined {
            UndefinedBehavior::Strict => {
                let mut available: Vec<&str> =
                    self.variables.keys().map(String::as_str).collect();
                for frame in &self.scopes {
                    available.extend(frame.keys().map(String::as_str));
                }
                Err(PlatekitError::UndefinedVariable {
                    variable: name.to_string(),
                    line,
                    column,
                    suggestions: similar_names(name, available),
                })
            }
            UndefinedBehavior::Permissive => {
                self.warnings.push(format!("{name} not defined"));
                Ok(Value::Null)
            }
        }
    }
}

/// Convert an evaluated value to output text.
///
/// Strings are emitted raw, null as the empty string, and compound values as
/// compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        compound => compound.to_string(),
    }
}
