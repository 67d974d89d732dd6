//! High-level render orchestration.
//!
//! Ties the registry, resolver, and body renderer together: a
//! [`RenderRequest`] names a template, an ordered list of variants, and the
//! caller's values; the [`Renderer`] looks the template up, resolves the
//! variable map, and renders the body, merging resolver and renderer warnings
//! into the final [`RenderResult`].
//!
//! A `Renderer` holds a [`SharedRegistry`] snapshot, so concurrent renders
//! against the same registry need no locking, and a hot-reloaded registry is
//! picked up by constructing a new `Renderer` around the new `Arc`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use platekit::registry::TemplateRegistry;
//! use platekit::render::{RenderRequest, Renderer};
//! use platekit::templating::RenderOptions;
//! use serde_json::json;
//! use std::path::Path;
//!
//! # fn main() -> platekit::core::Result<()> {
//! let report = TemplateRegistry::load(Path::new("templates/"))?;
//! let renderer = Renderer::new(report.registry.into_shared(), RenderOptions::default());
//!
//! let result = renderer.render(&RenderRequest {
//!     template_id: "netlify-deploy".to_string(),
//!     variants: vec!["production".to_string()],
//!     values: [("node_version".to_string(), json!("20"))].into(),
//! })?;
//! println!("{}", result.output);
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::Result;
use crate::registry::SharedRegistry;
use crate::resolver::resolve;
use crate::templating::{RenderOptions, render_str};

/// One render invocation: which template, which variants, which values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderRequest {
    /// Template to render, by registry id
    pub template_id: String,
    /// Variants to apply, in order; later variants win on conflicting keys
    pub variants: Vec<String>,
    /// Caller-supplied values; highest precedence
    pub values: BTreeMap<String, Value>,
}

/// The outcome of a successful render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderResult {
    /// The fully substituted text
    pub output: String,
    /// Non-fatal issues from resolution and rendering, in that order
    pub warnings: Vec<String>,
}

/// Renders requests against an immutable registry snapshot.
#[derive(Debug, Clone)]
pub struct Renderer {
    registry: SharedRegistry,
    options: RenderOptions,
}

impl Renderer {
    /// Create a renderer over a registry snapshot with the given options.
    #[must_use]
    pub fn new(registry: SharedRegistry, options: RenderOptions) -> Self {
        Self {
            registry,
            options,
        }
    }

    /// Render one request.
    ///
    /// Fails with the typed errors of
    /// [`PlatekitError`](crate::core::PlatekitError); every failure names the
    /// template id, variable, or construct it concerns, and none of them
    /// aborts the process.
    pub fn render(&self, request: &RenderRequest) -> Result<RenderResult> {
        debug!(template = %request.template_id, variants = ?request.variants, "render requested");

        let definition = self.registry.get(&request.template_id)?;
        let resolved = resolve(definition, &request.variants, &request.values)?;
        let rendered = render_str(&resolved.body, &resolved.values, &self.options)?;

        let mut warnings = resolved.warnings;
        warnings.extend(rendered.warnings);
        Ok(RenderResult {
            output: rendered.output,
            warnings,
        })
    }

    /// The registry snapshot this renderer reads from.
    #[must_use]
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlatekitError;
    use crate::definition::TemplateDefinition;
    use crate::registry::TemplateRegistry;
    use serde_json::json;
    use std::path::PathBuf;

    fn renderer_with(source: &str, options: RenderOptions) -> Renderer {
        let definition =
            TemplateDefinition::from_yaml(source, &PathBuf::from("inline.yaml")).unwrap().0;
        Renderer::new(TemplateRegistry::with_templates([definition]).into_shared(), options)
    }

    const NETLIFY: &str = r#"
name: netlify-deploy
variables:
  node_version:
    type: string
    default: "18"
    example: "20"
  environment:
    type: string
    default: development
    example: production
variants:
  production:
    variables:
      environment: production
template: "{{ environment }}: NODE_VERSION = \"{{ node_version }}\""
"#;

    #[test]
    fn test_render_with_defaults() {
        let renderer = renderer_with(NETLIFY, RenderOptions::default());
        let result = renderer.render(&RenderRequest {
            template_id: "netlify-deploy".to_string(),
            ..RenderRequest::default()
        });
        assert_eq!(result.unwrap().output, "development: NODE_VERSION = \"18\"");
    }

    #[test]
    fn test_supplied_value_wins_over_variant() {
        let renderer = renderer_with(NETLIFY, RenderOptions::default());
        let result = renderer
            .render(&RenderRequest {
                template_id: "netlify-deploy".to_string(),
                variants: vec!["production".to_string()],
                values: [("environment".to_string(), json!("staging"))].into(),
            })
            .unwrap();
        assert_eq!(result.output, "staging: NODE_VERSION = \"18\"");
    }

    #[test]
    fn test_unknown_template_id() {
        let renderer = renderer_with(NETLIFY, RenderOptions::default());
        let err = renderer
            .render(&RenderRequest {
                template_id: "no-such-template".to_string(),
                ..RenderRequest::default()
            })
            .unwrap_err();
        assert!(matches!(err, PlatekitError::TemplateNotFound { .. }));
    }

    #[test]
    fn test_warnings_are_merged() {
        let renderer = renderer_with(NETLIFY, RenderOptions::permissive());
        let result = renderer
            .render(&RenderRequest {
                template_id: "netlify-deploy".to_string(),
                values: [("unused".to_string(), json!(true))].into(),
                ..RenderRequest::default()
            })
            .unwrap();
        assert!(result.warnings.iter().any(|w| w.contains("unused")));
    }
}
