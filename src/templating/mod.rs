//! Template body rendering engine.
//!
//! This module implements the constrained mini-language used in template
//! bodies: variable interpolation, conditionals, and loops. It is a dedicated
//! tokenizer plus recursive-descent interpreter rather than a general
//! templating library, so template content contributed by third parties can
//! never reach the filesystem, the network, or arbitrary code.
//!
//! # Supported Syntax
//!
//! - Interpolation: `{{ variable }}`, `{{ option.field }}`, filters via
//!   `{{ value | lower }}`, `{{ value | default("x") }}`, `{{ value | tojson }}`
//! - Conditionals: `{% if expr %} ... {% elif expr %} ... {% else %} ... {% endif %}`
//!   with `and` / `or` / `not`, equality, ordering, and membership (`in`)
//! - Loops: `{% for item in collection %} ... {% endfor %}` with `loop.index`,
//!   `loop.index0`, `loop.first`, `loop.last`, `loop.length`
//! - Whitespace control: `{{-`, `-}}`, `{%-`, `-%}`
//!
//! Nested blocks compose arbitrarily; several deployment templates rely on
//! `{% if %}` inside `{% for %}`.
//!
//! # Strictness
//!
//! By default an undefined variable reference is a hard
//! [`UndefinedVariableError`](crate::core::PlatekitError::UndefinedVariable)
//! naming the variable and its position. Callers must opt into permissive
//! mode explicitly, in which the reference renders as an empty string and a
//! warning is recorded.
//!
//! # Resource Bounds
//!
//! Rendering imposes defensive upper bounds on output size and loop
//! iteration count so a pathological template definition cannot run
//! unbounded. Both limits are configurable through [`RenderOptions`].
//!
//! # Examples
//!
//! ```rust
//! use platekit::templating::{RenderOptions, render_str};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//!
//! # fn main() -> platekit::core::Result<()> {
//! let mut variables = BTreeMap::new();
//! variables.insert("node_version".to_string(), json!("18"));
//!
//! let rendered = render_str(
//!     "NODE_VERSION = \"{{ node_version }}\"",
//!     &variables,
//!     &RenderOptions::default(),
//! )?;
//! assert_eq!(rendered.output, "NODE_VERSION = \"18\"");
//! # Ok(())
//! # }
//! ```

pub mod expr;
pub mod filters;
pub mod lexer;
pub mod parser;
pub mod renderer;


use serde_json::Value;
use std::collections::BTreeMap;

use crate::core::Result;

/// How the renderer treats a variable reference with no resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UndefinedBehavior {
    /// Fail with an `UndefinedVariableError` naming the variable and position
    #[default]
    Strict,
    /// Substitute the empty string and record a warning
    Permissive,
}

/// Configuration for one render operation.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Undefined-variable handling; strict unless the caller opts out
    pub undefined: UndefinedBehavior,
    /// Upper bound on rendered output size
    pub max_output_bytes: usize,
    /// Upper bound on iterations of a single `{% for %}` loop
    pub max_loop_iterations: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            undefined: UndefinedBehavior::Strict,
            max_output_bytes: 1024 * 1024,
            max_loop_iterations: 10_000,
        }
    }
}

impl RenderOptions {
    /// Options with permissive undefined-variable handling.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            undefined: UndefinedBehavior::Permissive,
            ..Self::default()
        }
    }
}

/// Output of a body render: the substituted text plus non-fatal warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The fully substituted text
    pub output: String,
    /// Non-fatal issues, e.g. permissive-mode undefined references
    pub warnings: Vec<String>,
}

/// Parse and render a body against an already-resolved variable map.
///
/// Rendering is deterministic: identical `(body, variables, options)` always
/// produce identical output.
///
/// # Errors
///
/// Returns [`PlatekitError::Syntax`](crate::core::PlatekitError::Syntax) for
/// malformed constructs,
/// [`PlatekitError::UndefinedVariable`](crate::core::PlatekitError::UndefinedVariable)
/// in strict mode, and the limit errors for bound violations.
pub fn render_str(
    body: &str,
    variables: &BTreeMap<String, Value>,
    options: &RenderOptions,
) -> Result<Rendered> {
    let nodes = parser::parse(body)?;
    renderer::render_nodes(&nodes, variables, options)
}
