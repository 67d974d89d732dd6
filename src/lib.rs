//! # platekit
//!
//! A template definition and rendering engine for no-code platform
//! configurations (deployment manifests, Docker setups, auth and payment
//! integration files, and the like).
//!
//! Template definitions are declarative YAML files bundling metadata, a typed
//! variable schema, named variants, and a body written in a constrained
//! `{{ }}` / `{% %}` mini-language. Rendering a template means:
//!
//! 1. **Resolve**: merge variable defaults, the selected variants' overrides
//!    (in order), and caller-supplied values (highest precedence), then
//!    validate every resolved value against its declared type.
//! 2. **Render**: substitute variables, evaluate conditionals, and expand
//!    loops in the body.
//!
//! # Architecture
//!
//! - [`definition`]: parsing and validation of template definition files
//! - [`registry`]: directory scanning and lookup by id, category, or tag
//! - [`resolver`]: deterministic variable precedence and type checking
//! - [`templating`]: the body mini-interpreter (lexer, parser, evaluator)
//! - [`render`]: request-level orchestration over a shared registry
//! - [`core`]: error taxonomy and user-facing error context
//!
//! The body interpreter is deliberately a dedicated tokenizer and
//! recursive-descent parser rather than a general templating library:
//! template content can originate from community sources, and the constrained
//! surface keeps rendering auditable with no path to file, network, or code
//! execution.
//!
//! # Concurrency
//!
//! A loaded [`registry::TemplateRegistry`] is immutable; share it as an
//! `Arc` and render concurrently without locking. Hot reload is an atomic
//! swap of the whole snapshot, never in-place mutation. Rendering itself is a
//! pure function of its inputs, so identical requests always produce
//! byte-identical output.
//!
//! # Example
//!
//! ```rust
//! use platekit::definition::TemplateDefinition;
//! use platekit::registry::TemplateRegistry;
//! use platekit::render::{RenderRequest, Renderer};
//! use platekit::templating::RenderOptions;
//! use std::path::Path;
//!
//! # fn main() -> platekit::core::Result<()> {
//! let yaml = r#"
//! name: hello
//! variables:
//!   who:
//!     type: string
//!     default: world
//! template: "hello {{ who }}"
//! "#;
//! let (definition, _warnings) = TemplateDefinition::from_yaml(yaml, Path::new("hello.yaml"))?;
//! let registry = TemplateRegistry::with_templates([definition]).into_shared();
//! let renderer = Renderer::new(registry, RenderOptions::default());
//!
//! let result = renderer.render(&RenderRequest {
//!     template_id: "hello".to_string(),
//!     ..RenderRequest::default()
//! })?;
//! assert_eq!(result.output, "hello world");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod definition;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod templating;

pub use crate::core::{ErrorContext, PlatekitError, Result};
pub use crate::definition::{TemplateDefinition, VariableSpec, VariableType, VariantSpec};
pub use crate::registry::{LoadReport, SharedRegistry, TemplateRegistry};
pub use crate::render::{RenderRequest, RenderResult, Renderer};
pub use crate::resolver::{ResolvedVariables, resolve};
pub use crate::templating::{RenderOptions, Rendered, UndefinedBehavior, render_str};

/// Crate version, from the package manifest.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
