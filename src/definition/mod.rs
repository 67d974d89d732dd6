//! Template definition parsing and validation.
//!
//! This module handles the declarative YAML template files that drive the
//! engine. A definition bundles descriptive metadata, a typed variable schema,
//! named variants, and a body written in `{{ }}` / `{% %}` syntax.
//!
//! # Basic Structure
//!
//! ```yaml
//! name: netlify-deploy
//! description: Netlify deployment configuration
//! version: 1.2.0
//! category: deployment
//! tags: [netlify, spa]
//! variables:
//!   node_version:
//!     type: string
//!     default: "18"
//!   spa_routing:
//!     type: boolean
//!     default: true
//! variants:
//!   production:
//!     description: Production hardening
//!     variables:
//!       environment: production
//! template: |
//!   NODE_VERSION = "{{ node_version }}"
//!   {% if spa_routing %}REDIRECT{% endif %}
//! ```
//!
//! # Variable Types
//!
//! Six types are supported: `string`, `number`, `boolean`, `array`, `object`
//! and `select`. A `select` variable must declare an `options` list and any
//! resolved value must be a member of it.
//!
//! # Legacy Variant Patches
//!
//! Older template files express variants as positional body patches
//! (`line: N, action: add_after`). That format is fragile, so it is
//! normalized at parse time: the patches are applied to the base body once,
//! producing a per-variant body override, and play no further role during
//! rendering.
//!
//! # Invariants
//!
//! - `name` is non-empty after parse.
//! - A declared `default` conforms to the declared `type`; a `select` default
//!   is a member of `options`.
//! - Parsing is idempotent: the same file parses to `PartialEq`-equal
//!   definitions every time.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::core::{PlatekitError, Result};

/// The declared type of a template variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// JSON string
    String,
    /// JSON number (integer or float)
    Number,
    /// JSON boolean
    Boolean,
    /// JSON array
    Array,
    /// JSON object
    Object,
    /// One of a declared `options` list
    Select,
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Select => "select",
        };
        write!(f, "{name}")
    }
}

impl VariableType {
    /// Whether `value` conforms to this declared type.
    ///
    /// `select` values are shape-unconstrained here; membership in `options`
    /// is enforced by the resolver.
    #[must_use]
    pub fn conforms(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Select => true,
        }
    }
}

/// The runtime type name of a JSON value, for error messages.
#[must_use]
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema entry for one template variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Declared type of the variable
    #[serde(rename = "type")]
    pub var_type: VariableType,
    /// Human description of what the variable controls
    #[serde(default)]
    pub description: String,
    /// Whether rendering fails when no value is resolved
    #[serde(default)]
    pub required: bool,
    /// Value used when neither a variant nor the caller supplies one
    #[serde(default)]
    pub default: Option<Value>,
    /// Example value, surfaced in listings and documentation
    #[serde(default)]
    pub example: Option<Value>,
    /// Allowed values; present only when `type` is `select`
    #[serde(default)]
    pub options: Option<Vec<Value>>,
}

/// Action of a legacy positional variant patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchAction {
    /// Insert `content` after the referenced line
    AddAfter,
    /// Insert `content` before the referenced line
    AddBefore,
    /// Replace the referenced line with `content`
    Replace,
}

/// A legacy positional patch against the base body.
///
/// Normalized away at parse time; never consulted during rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantPatch {
    /// 1-based line number in the base body
    pub line: usize,
    /// How `content` is applied at that line
    pub action: PatchAction,
    /// Text to insert or substitute
    pub content: String,
}

/// A named bundle of variable overrides layered onto a template's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSpec {
    /// Human description of what the variant changes
    #[serde(default)]
    pub description: String,
    /// Variable overrides applied when the variant is selected
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
    /// Legacy positional patches, normalized into `body_override` at parse time
    #[serde(default)]
    pub patches: Vec<VariantPatch>,
    /// Body precomputed from `patches`; `None` for override-only variants
    #[serde(skip)]
    pub body_override: Option<String>,
}

/// A parsed, immutable template definition.
///
/// Created by [`TemplateDefinition::from_yaml`]; never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    /// Unique template identifier; non-empty
    pub name: String,
    /// Human description of the template
    #[serde(default)]
    pub description: String,
    /// Optional semver-like version string
    #[serde(default)]
    pub version: Option<String>,
    /// Category used for registry listings
    #[serde(default)]
    pub category: String,
    /// Free-form tags used for registry listings
    #[serde(default)]
    pub tags: Vec<String>,
    /// Platforms the template targets
    #[serde(default)]
    pub platforms: Vec<String>,
    /// Typed variable schema, keyed by variable name
    #[serde(default)]
    pub variables: BTreeMap<String, VariableSpec>,
    /// Named variants, keyed by variant name
    #[serde(default)]
    pub variants: BTreeMap<String, VariantSpec>,
    /// Template source with `{{ }}` and `{% %}` constructs
    #[serde(rename = "template", default)]
    pub body: String,
}

impl TemplateDefinition {
    /// Parse a template definition from YAML source.
    ///
    /// `path` is only used to attribute errors. Returns the definition plus
    /// any non-fatal load warnings (non-semver version, overrides of
    /// undeclared variables, variables missing an example).
    ///
    /// # Errors
    ///
    /// Returns [`PlatekitError::Parse`] when the YAML is malformed or a
    /// schema invariant is violated (empty name, mistyped default, `options`
    /// on a non-select variable, out-of-range patch line).
    pub fn from_yaml(source: &str, path: &Path) -> Result<(Self, Vec<String>)> {
        let mut definition: Self = serde_yaml::from_str(source).map_err(|e| {
            let location = e.location();
            PlatekitError::Parse {
                path: path.to_path_buf(),
                line: location.as_ref().map(serde_yaml::Location::line),
                column: location.as_ref().map(serde_yaml::Location::column),
                message: e.to_string(),
            }
        })?;

        let mut warnings = Vec::new();
        definition.validate(path, &mut warnings)?;
        definition.normalize_patches(path)?;
        Ok((definition, warnings))
    }

    /// Read and parse a template definition file.
    pub fn from_file(path: &Path) -> Result<(Self, Vec<String>)> {
        let source = std::fs::read_to_string(path)?;
        Self::from_yaml(&source, path)
    }

    fn validate(&self, path: &Path, warnings: &mut Vec<String>) -> Result<()> {
        let parse_error = |message: String| PlatekitError::Parse {
            path: path.to_path_buf(),
            line: None,
            column: None,
            message,
        };

        if self.name.trim().is_empty() {
            return Err(parse_error("template 'name' must be non-empty".to_string()));
        }

        if let Some(version) = &self.version {
            if semver::Version::parse(version).is_err() {
                warnings.push(format!(
                    "template '{}': version '{}' is not valid semver",
                    self.name, version
                ));
            }
        }

        for (var_name, spec) in &self.variables {
            match (&spec.options, spec.var_type) {
                (None, VariableType::Select) => {
                    return Err(parse_error(format!(
                        "variable '{var_name}' has type 'select' but no 'options' list"
                    )));
                }
                (Some(_), t) if t != VariableType::Select => {
                    return Err(parse_error(format!(
                        "variable '{var_name}' declares 'options' but has type '{t}', not 'select'"
                    )));
                }
                (Some(options), VariableType::Select) if options.is_empty() => {
                    warnings.push(format!(
                        "template '{}': select variable '{var_name}' has an empty options list",
                        self.name
                    ));
                }
                _ => {}
            }

            if let Some(default) = &spec.default {
                if !spec.var_type.conforms(default) {
                    return Err(parse_error(format!(
                        "variable '{var_name}' default is {}, expected {}",
                        value_type_name(default),
                        spec.var_type
                    )));
                }
                if spec.var_type == VariableType::Select {
                    let options = spec.options.as_deref().unwrap_or(&[]);
                    if !options.contains(default) {
                        return Err(parse_error(format!(
                            "variable '{var_name}' default {default} is not one of its options"
                        )));
                    }
                }
            }

            if spec.example.is_none() {
                warnings.push(format!(
                    "template '{}': variable '{var_name}' has no example value",
                    self.name
                ));
            }
        }

        for (variant_name, variant) in &self.variants {
            for overridden in variant.variables.keys() {
                if !self.variables.contains_key(overridden) {
                    warnings.push(format!(
                        "template '{}': variant '{variant_name}' overrides undeclared variable '{overridden}'",
                        self.name
                    ));
                }
            }
        }

        Ok(())
    }

    /// Apply legacy positional patches to produce per-variant body overrides.
    fn normalize_patches(&mut self, path: &Path) -> Result<()> {
        let base_body = self.body.clone();
        for (variant_name, variant) in &mut self.variants {
            if variant.patches.is_empty() {
                continue;
            }
            let patched = apply_patches(&base_body, &variant.patches).map_err(|message| {
                PlatekitError::Parse {
                    path: path.to_path_buf(),
                    line: None,
                    column: None,
                    message: format!("variant '{variant_name}': {message}"),
                }
            })?;
            variant.body_override = Some(patched);
        }
        Ok(())
    }

    /// Names of all variables marked `required: true`.
    #[must_use]
    pub fn required_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Apply legacy patches to a body, line by line.
fn apply_patches(body: &str, patches: &[VariantPatch]) -> std::result::Result<String, String> {
    let mut lines: Vec<String> = body.lines().map(str::to_string).collect();
    for patch in patches {
        if patch.line == 0 || patch.line > lines.len() {
            return Err(format!(
                "patch targets line {} but the body has {} lines",
                patch.line,
                lines.len()
            ));
        }
        let index = patch.line - 1;
        match patch.action {
            PatchAction::AddAfter => lines.insert(index + 1, patch.content.clone()),
            PatchAction::AddBefore => lines.insert(index, patch.content.clone()),
            PatchAction::Replace => lines[index] = patch.content.clone(),
        }
    }
    let mut patched = lines.join("\n");
    if body.ends_with('\n') {
        patched.push('\n');
    }
    Ok(patched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn parse(source: &str) -> Result<(TemplateDefinition, Vec<String>)> {
        TemplateDefinition::from_yaml(source, &PathBuf::from("test.yaml"))
    }

    const MINIMAL: &str = r#"
name: netlify-deploy
category: deployment
variables:
  node_version:
    type: string
    default: "18"
    example: "20"
template: |
  NODE_VERSION = "{{ node_version }}"
"#;

    #[test]
    fn test_parse_minimal_definition() {
        let (definition, warnings) = parse(MINIMAL).unwrap();
        assert_eq!(definition.name, "netlify-deploy");
        assert_eq!(definition.category, "deployment");
        let spec = &definition.variables["node_version"];
        assert_eq!(spec.var_type, VariableType::String);
        assert_eq!(spec.default, Some(json!("18")));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let (first, _) = parse(MINIMAL).unwrap();
        let (second, _) = parse(MINIMAL).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_name_is_a_parse_error() {
        let result = parse("name: \"\"\ntemplate: body");
        assert!(matches!(result, Err(PlatekitError::Parse { .. })));
    }

    #[test]
    fn test_malformed_yaml_reports_path() {
        let result = parse("name: [unclosed");
        match result {
            Err(PlatekitError::Parse { path, .. }) => {
                assert_eq!(path, PathBuf::from("test.yaml"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_select_requires_options() {
        let source = r#"
name: t
variables:
  region:
    type: select
template: x
"#;
        let result = parse(source);
        match result {
            Err(PlatekitError::Parse { message, .. }) => {
                assert!(message.contains("region"));
                assert!(message.contains("options"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_options_on_non_select_rejected() {
        let source = r#"
name: t
variables:
  region:
    type: string
    options: [a, b]
template: x
"#;
        assert!(matches!(parse(source), Err(PlatekitError::Parse { .. })));
    }

    #[test]
    fn test_default_must_match_declared_type() {
        let source = r#"
name: t
variables:
  spa_routing:
    type: boolean
    default: "yes"
template: x
"#;
        match parse(source) {
            Err(PlatekitError::Parse { message, .. }) => {
                assert!(message.contains("spa_routing"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_select_default_must_be_an_option() {
        let source = r#"
name: t
variables:
  region:
    type: select
    options: [us-east, eu-west]
    default: ap-south
template: x
"#;
        assert!(matches!(parse(source), Err(PlatekitError::Parse { .. })));
    }

    #[test]
    fn test_nonsemver_version_warns() {
        let source = r#"
name: t
version: v1-beta
template: x
"#;
        let (_, warnings) = parse(source).unwrap();
        assert!(warnings.iter().any(|w| w.contains("not valid semver")));
    }

    #[test]
    fn test_variant_override_of_undeclared_variable_warns() {
        let source = r#"
name: t
variables:
  environment:
    type: string
    example: dev
variants:
  production:
    variables:
      environment: production
      replica_count: 3
template: x
"#;
        let (_, warnings) = parse(source).unwrap();
        assert!(warnings.iter().any(|w| w.contains("replica_count")));
    }

    #[test]
    fn test_legacy_patches_are_normalized_into_body_override() {
        let source = r#"
name: t
variants:
  hardened:
    patches:
      - line: 1
        action: add_after
        content: "STRICT = true"
      - line: 1
        action: replace
        content: "MODE = hardened"
template: |
  MODE = default
  PORT = 8080
"#;
        let (definition, _) = parse(source).unwrap();
        let variant = &definition.variants["hardened"];
        let body = variant.body_override.as_deref().unwrap();
        assert_eq!(body, "MODE = hardened\nSTRICT = true\nPORT = 8080\n");
    }

    #[test]
    fn test_patch_past_end_of_body_is_a_parse_error() {
        let source = r#"
name: t
variants:
  broken:
    patches:
      - line: 99
        action: replace
        content: nope
template: |
  only line
"#;
        match parse(source) {
            Err(PlatekitError::Parse { message, .. }) => {
                assert!(message.contains("broken"));
                assert!(message.contains("99"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_required_variables_listing() {
        let source = r#"
name: t
variables:
  app_name:
    type: string
    required: true
    example: demo
  port:
    type: number
    default: 8080
    example: 3000
template: x
"#;
        let (definition, _) = parse(source).unwrap();
        assert_eq!(definition.required_variables(), vec!["app_name"]);
    }
}
