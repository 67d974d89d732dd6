//! Integration tests for registry loading from a directory tree.

use anyhow::Result;
use platekit::core::PlatekitError;
use platekit::registry::TemplateRegistry;
use std::fs;
use tempfile::TempDir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_template(dir: &TempDir, relative: &str, content: &str) -> Result<()> {
    init_tracing();
    let path = dir.path().join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

const NETLIFY: &str = r#"
name: netlify-deploy
category: deployment
tags: [netlify, spa]
variables:
  node_version:
    type: string
    default: "18"
    example: "20"
template: |
  NODE_VERSION = "{{ node_version }}"
"#;

const DOCKER: &str = r#"
name: docker-compose
category: docker
tags: [docker]
template: |
  version: "3.9"
"#;

#[test]
fn test_load_scans_nested_directories() -> Result<()> {
    let dir = TempDir::new()?;
    write_template(&dir, "deployment/netlify.yaml", NETLIFY)?;
    write_template(&dir, "docker/compose.yml", DOCKER)?;
    write_template(&dir, "notes/README.md", "not a template")?;

    let report = TemplateRegistry::load(dir.path())?;
    assert!(report.errors.is_empty(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.registry.len(), 2);
    assert!(report.registry.get("netlify-deploy").is_ok());
    assert!(report.registry.get("docker-compose").is_ok());
    Ok(())
}

#[test]
fn test_malformed_file_is_reported_not_fatal() -> Result<()> {
    let dir = TempDir::new()?;
    write_template(&dir, "good.yaml", NETLIFY)?;
    write_template(&dir, "bad.yaml", "name: [unclosed\n  broken")?;

    let report = TemplateRegistry::load(dir.path())?;
    assert_eq!(report.registry.len(), 1);
    assert_eq!(report.errors.len(), 1);
    match &report.errors[0] {
        PlatekitError::Parse {
            path,
            ..
        } => {
            assert!(path.ends_with("bad.yaml"));
        }
        other => panic!("expected Parse error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_duplicate_template_names_keep_first_and_report() -> Result<()> {
    let dir = TempDir::new()?;
    write_template(&dir, "a.yaml", NETLIFY)?;
    write_template(&dir, "b.yaml", NETLIFY)?;

    let report = TemplateRegistry::load(dir.path())?;
    assert_eq!(report.registry.len(), 1);
    assert!(report.errors.iter().any(|e| {
        matches!(e, PlatekitError::Parse { message, .. } if message.contains("duplicate"))
    }));
    Ok(())
}

#[test]
fn test_load_is_deterministic_across_runs() -> Result<()> {
    let dir = TempDir::new()?;
    write_template(&dir, "one.yaml", NETLIFY)?;
    write_template(&dir, "two.yaml", DOCKER)?;

    let first = TemplateRegistry::load(dir.path())?;
    let second = TemplateRegistry::load(dir.path())?;
    let names = |registry: &TemplateRegistry| {
        registry.list_all().iter().map(|t| t.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&first.registry), names(&second.registry));
    assert_eq!(
        first.registry.get("netlify-deploy").unwrap(),
        second.registry.get("netlify-deploy").unwrap()
    );
    Ok(())
}

#[test]
fn test_listings_are_name_ordered() -> Result<()> {
    let dir = TempDir::new()?;
    write_template(&dir, "z.yaml", "name: zeta\ncategory: deployment\ntemplate: z\n")?;
    write_template(&dir, "a.yaml", "name: alpha\ncategory: deployment\ntemplate: a\n")?;
    write_template(&dir, "m.yaml", "name: mid\ncategory: other\ntemplate: m\n")?;

    let report = TemplateRegistry::load(dir.path())?;
    let names: Vec<_> = report
        .registry
        .list_by_category("deployment")
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    Ok(())
}

#[test]
fn test_missing_root_is_an_error() {
    let result = TemplateRegistry::load(std::path::Path::new("/nonexistent/templates"));
    assert!(matches!(result, Err(PlatekitError::Io(_))));
}

#[test]
fn test_load_warnings_surface_schema_smells() -> Result<()> {
    let dir = TempDir::new()?;
    write_template(
        &dir,
        "smelly.yaml",
        r#"
name: smelly
version: not-semver
variables:
  port:
    type: number
    default: 8080
template: "{{ port }}"
"#,
    )?;

    let report = TemplateRegistry::load(dir.path())?;
    assert!(report.errors.is_empty());
    assert!(report.warnings.iter().any(|w| w.contains("not valid semver")));
    assert!(report.warnings.iter().any(|w| w.contains("no example")));
    Ok(())
}
