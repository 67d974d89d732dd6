//! Built-in filters for `{{ value | filter }}` expressions.
//!
//! The filter set is deliberately small and side-effect free: string case
//! helpers, JSON encoding, defaults, and collection helpers. Filters never
//! touch the filesystem, network, or clock, keeping rendering a pure function
//! of its inputs.
//!
//! | Filter            | Effect                                              |
//! |-------------------|-----------------------------------------------------|
//! | `lower`           | lowercase a string                                  |
//! | `upper`           | uppercase a string                                  |
//! | `title`           | capitalize each word                                |
//! | `trim`            | strip surrounding whitespace                        |
//! | `tojson`          | compact JSON encoding of any value                  |
//! | `default(x)`      | `x` when the input is undefined or null             |
//! | `join(sep)`       | join array elements with a separator                |
//! | `replace(a, b)`   | replace occurrences of `a` with `b`                 |
//! | `length`          | element count of an array/object, chars of a string |
//!
//! An unknown filter name is a syntax error naming the filter.

use serde_json::Value;

use crate::core::{PlatekitError, Result};
use crate::definition::value_type_name;

/// Apply a named filter to `input`.
///
/// `default` is handled here only for null inputs; the undefined case is
/// intercepted during expression evaluation, before the filter is reached.
///
/// # Errors
///
/// Returns [`PlatekitError::Syntax`] for unknown filters, wrong argument
/// counts, or inputs of an unsupported type.
pub fn apply(
    name: &str,
    input: Value,
    args: &[Value],
    line: usize,
    column: usize,
) -> Result<Value> {
    let syntax = |message: String| PlatekitError::Syntax {
        message,
        line,
        column,
    };
    let arity = |expected: usize| -> Result<()> {
        if args.len() == expected {
            Ok(())
        } else {
            Err(syntax(format!(
                "filter '{name}' takes {expected} argument(s), got {}",
                args.len()
            )))
        }
    };
    let string_input = |input: &Value| -> Result<String> {
        match input {
            Value::String(s) => Ok(s.clone()),
            other => Err(syntax(format!(
                "filter '{name}' expects a string input, got {}",
                value_type_name(other)
            ))),
        }
    };

    match name {
        "lower" => {
            arity(0)?;
            Ok(Value::String(string_input(&input)?.to_lowercase()))
        }
        "upper" => {
            arity(0)?;
            Ok(Value::String(string_input(&input)?.to_uppercase()))
        }
        "title" => {
            arity(0)?;
            let titled = string_input(&input)?
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + chars.as_str()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            Ok(Value::String(titled))
        }
        "trim" => {
            arity(0)?;
            Ok(Value::String(string_input(&input)?.trim().to_string()))
        }
        "tojson" => {
            arity(0)?;
            let encoded = serde_json::to_string(&input)
                .map_err(|e| syntax(format!("tojson failed: {e}")))?;
            Ok(Value::String(encoded))
        }
        "default" => {
            arity(1)?;
            if input.is_null() {
                Ok(args[0].clone())
            } else {
                Ok(input)
            }
        }
        "join" => {
            arity(1)?;
            let separator = match &args[0] {
                Value::String(s) => s.clone(),
                other => {
                    return Err(syntax(format!(
                        "join separator must be a string, got {}",
                        value_type_name(other)
                    )));
                }
            };
            match input {
                Value::Array(items) => {
                    let parts: Vec<String> = items.iter().map(scalar_to_string).collect();
                    Ok(Value::String(parts.join(&separator)))
                }
                other => Err(syntax(format!(
                    "filter 'join' expects an array input, got {}",
                    value_type_name(&other)
                ))),
            }
        }
        "replace" => {
            arity(2)?;
            let (from, to) = match (&args[0], &args[1]) {
                (Value::String(from), Value::String(to)) => (from.clone(), to.clone()),
                _ => return Err(syntax("replace arguments must be strings".to_string())),
            };
            Ok(Value::String(string_input(&input)?.replace(&from, &to)))
        }
        "length" => {
            arity(0)?;
            let length = match &input {
                Value::Array(items) => items.len(),
                Value::Object(map) => map.len(),
                Value::String(s) => s.chars().count(),
                other => {
                    return Err(syntax(format!(
                        "filter 'length' expects an array, object, or string, got {}",
                        value_type_name(other)
                    )));
                }
            };
            Ok(Value::from(length))
        }
        unknown => Err(syntax(format!("unknown filter '{unknown}'"))),
    }
}

/// Render a scalar for joining; compound values fall back to compact JSON.
fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
