//! Variable resolution for render requests.
//!
//! Produces the single, fully-resolved variable map used to render one
//! request. Precedence is explicit and deterministic, lowest first:
//!
//! 1. `VariableSpec.default` values
//! 2. Selected variants' overrides, in selection order (later variants win
//!    on conflicting keys)
//! 3. Caller-supplied values, which always win
//!
//! After merging, every `required` variable must have a value, and every
//! resolved value must conform to its declared type (`select` values must be
//! members of their `options` list). An explicit value supplied by the caller
//! beats a selected variant on the same key, matching the principle of least
//! surprise for someone operating the tool by hand.
//!
//! # Warnings
//!
//! Supplied keys that match no declared variable are dropped with a warning,
//! keeping the rendered body's variable universe equal to the declared
//! schema. Variant overrides of undeclared variables are likewise dropped
//! with a warning.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::core::{PlatekitError, Result};
use crate::definition::{TemplateDefinition, VariableType, value_type_name};

/// The fully-resolved input to one body render.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVariables {
    /// Final variable map, after defaults, variants, and supplied values
    pub values: BTreeMap<String, Value>,
    /// Non-fatal issues found while merging
    pub warnings: Vec<String>,
    /// Body to render: the last selected variant's patched body, when any
    /// selected variant carries one, else the template's base body
    pub body: String,
}

/// Resolve the variable map for one render request.
///
/// # Errors
///
/// - [`PlatekitError::UnknownVariant`] for a variant name the template does
///   not declare
/// - [`PlatekitError::MissingRequiredVariable`] when a `required` variable
///   has no value after all three precedence layers
/// - [`PlatekitError::TypeMismatch`] / [`PlatekitError::InvalidOption`] when
///   a resolved value violates its spec
pub fn resolve(
    definition: &TemplateDefinition,
    selected_variants: &[String],
    supplied: &BTreeMap<String, Value>,
) -> Result<ResolvedVariables> {
    let mut values = BTreeMap::new();
    let mut warnings = Vec::new();

    // Layer 1: defaults.
    for (name, spec) in &definition.variables {
        if let Some(default) = &spec.default {
            values.insert(name.clone(), default.clone());
        }
    }

    // Layer 2: variant overrides, in selection order.
    let mut body = definition.body.clone();
    for variant_name in selected_variants {
        let variant = definition.variants.get(variant_name).ok_or_else(|| {
            PlatekitError::UnknownVariant {
                template_id: definition.name.clone(),
                variant: variant_name.clone(),
                available: definition.variants.keys().cloned().collect(),
            }
        })?;
        for (name, value) in &variant.variables {
            if definition.variables.contains_key(name) {
                values.insert(name.clone(), value.clone());
            } else {
                warnings.push(format!(
                    "variant '{variant_name}' overrides undeclared variable '{name}'; ignored"
                ));
            }
        }
        if let Some(patched) = &variant.body_override {
            body = patched.clone();
        }
    }

    // Layer 3: supplied values always win.
    for (name, value) in supplied {
        if definition.variables.contains_key(name) {
            values.insert(name.clone(), value.clone());
        } else {
            warnings.push(format!("supplied value '{name}' matches no declared variable; ignored"));
        }
    }

    // Required check runs after all three layers so any layer can satisfy it.
    for name in definition.required_variables() {
        if !values.contains_key(name) {
            return Err(PlatekitError::MissingRequiredVariable {
                variable: name.to_string(),
            });
        }
    }

    // Type and option conformance of every resolved value.
    for (name, value) in &values {
        let spec = &definition.variables[name];
        if spec.var_type == VariableType::Select {
            let options = spec.options.as_deref().unwrap_or(&[]);
            if !options.contains(value) {
                return Err(PlatekitError::InvalidOption {
                    variable: name.clone(),
                    value: value.to_string(),
                    options: Value::Array(options.to_vec()).to_string(),
                });
            }
        } else if !spec.var_type.conforms(value) {
            return Err(PlatekitError::TypeMismatch {
                variable: name.clone(),
                expected: spec.var_type.to_string(),
                actual: value_type_name(value).to_string(),
            });
        }
    }

    debug!(
        template = %definition.name,
        variables = values.len(),
        variants = selected_variants.len(),
        "variables resolved"
    );
    Ok(ResolvedVariables {
        values,
        warnings,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn definition(source: &str) -> TemplateDefinition {
        TemplateDefinition::from_yaml(source, &PathBuf::from("inline.yaml")).unwrap().0
    }

    fn supplied(entries: &[(&str, Value)]) -> BTreeMap<String, Value> {
        entries.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    const DEPLOY: &str = r#"
name: deploy
variables:
  environment:
    type: string
    default: development
    example: production
  replicas:
    type: number
    default: 1
    example: 3
variants:
  production:
    variables:
      environment: production
      replicas: 3
  high-availability:
    variables:
      replicas: 5
template: "{{ environment }}:{{ replicas }}"
"#;

    #[test]
    fn test_defaults_apply_without_variants_or_values() {
        let resolved = resolve(&definition(DEPLOY), &[], &BTreeMap::new()).unwrap();
        assert_eq!(resolved.values["environment"], json!("development"));
        assert_eq!(resolved.values["replicas"], json!(1));
    }

    #[test]
    fn test_variant_overrides_defaults() {
        let resolved =
            resolve(&definition(DEPLOY), &["production".to_string()], &BTreeMap::new()).unwrap();
        assert_eq!(resolved.values["environment"], json!("production"));
        assert_eq!(resolved.values["replicas"], json!(3));
    }

    #[test]
    fn test_later_variant_wins_on_conflict() {
        let resolved = resolve(
            &definition(DEPLOY),
            &["production".to_string(), "high-availability".to_string()],
            &BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(resolved.values["replicas"], json!(5));
        assert_eq!(resolved.values["environment"], json!("production"));
    }

    #[test]
    fn test_supplied_value_beats_selected_variant() {
        let resolved = resolve(
            &definition(DEPLOY),
            &["production".to_string()],
            &supplied(&[("environment", json!("staging"))]),
        )
        .unwrap();
        assert_eq!(resolved.values["environment"], json!("staging"));
    }

    #[test]
    fn test_unknown_variant_is_an_error() {
        let err =
            resolve(&definition(DEPLOY), &["canary".to_string()], &BTreeMap::new()).unwrap_err();
        match err {
            PlatekitError::UnknownVariant {
                variant,
                available,
                ..
            } => {
                assert_eq!(variant, "canary");
                assert_eq!(available, vec!["high-availability", "production"]);
            }
            other => panic!("expected UnknownVariant, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_variable_is_an_error() {
        let source = r#"
name: t
variables:
  app_name:
    type: string
    required: true
    example: demo
template: "{{ app_name }}"
"#;
        let err = resolve(&definition(source), &[], &BTreeMap::new()).unwrap_err();
        match err {
            PlatekitError::MissingRequiredVariable {
                variable,
            } => assert_eq!(variable, "app_name"),
            other => panic!("expected MissingRequiredVariable, got {other:?}"),
        }
    }

    #[test]
    fn test_required_satisfied_by_variant() {
        let source = r#"
name: t
variables:
  app_name:
    type: string
    required: true
    example: demo
variants:
  named:
    variables:
      app_name: demo
template: "{{ app_name }}"
"#;
        let resolved =
            resolve(&definition(source), &["named".to_string()], &BTreeMap::new()).unwrap();
        assert_eq!(resolved.values["app_name"], json!("demo"));
    }

    #[test]
    fn test_type_mismatch_on_supplied_value() {
        let source = r#"
name: t
variables:
  spa_routing:
    type: boolean
    default: true
    example: false
template: x
"#;
        let err = resolve(
            &definition(source),
            &[],
            &supplied(&[("spa_routing", json!("yes"))]),
        )
        .unwrap_err();
        match err {
            PlatekitError::TypeMismatch {
                variable,
                expected,
                actual,
            } => {
                assert_eq!(variable, "spa_routing");
                assert_eq!(expected, "boolean");
                assert_eq!(actual, "string");
            }
            other => panic!("expected TypeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_select_membership_enforced() {
        let source = r#"
name: t
variables:
  region:
    type: select
    options: [us-east, eu-west]
    default: us-east
    example: eu-west
template: x
"#;
        let err = resolve(
            &definition(source),
            &[],
            &supplied(&[("region", json!("ap-south"))]),
        )
        .unwrap_err();
        match err {
            PlatekitError::InvalidOption {
                variable,
                value,
                options,
            } => {
                assert_eq!(variable, "region");
                assert!(value.contains("ap-south"));
                assert!(options.contains("us-east"));
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn test_undeclared_supplied_key_is_dropped_with_warning() {
        let resolved = resolve(
            &definition(DEPLOY),
            &[],
            &supplied(&[("typo_key", json!(1))]),
        )
        .unwrap();
        assert!(!resolved.values.contains_key("typo_key"));
        assert!(resolved.warnings.iter().any(|w| w.contains("typo_key")));
    }

    #[test]
    fn test_variant_body_override_selects_patched_body() {
        let source = r#"
name: t
variants:
  hardened:
    patches:
      - line: 1
        action: replace
        content: "MODE = hardened"
template: |
  MODE = default
"#;
        let base = resolve(&definition(source), &[], &BTreeMap::new()).unwrap();
        assert_eq!(base.body, "MODE = default\n");
        let patched =
            resolve(&definition(source), &["hardened".to_string()], &BTreeMap::new()).unwrap();
        assert_eq!(patched.body, "MODE = hardened\n");
    }
}
