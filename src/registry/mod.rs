//! Template registry: discovery, loading, and lookup.
//!
//! The registry scans a source directory tree for `*.yaml` / `*.yml` template
//! definition files, parses each one independently, and exposes lookup by
//! identifier, category, and tag.
//!
//! # Load Semantics
//!
//! Template files are independent units, so a malformed file is skipped and
//! reported rather than aborting the whole load. [`TemplateRegistry::load`]
//! returns a [`LoadReport`] carrying the populated registry alongside the
//! per-file parse errors and any non-fatal warnings. Only an unreadable root
//! directory fails the load outright.
//!
//! # Sharing and Hot Reload
//!
//! A registry is immutable once built. Share it across concurrent renderers as
//! a [`SharedRegistry`] (`Arc<TemplateRegistry>`); hot reloading means building
//! a fresh registry and swapping the whole `Arc`, never mutating in place, so
//! readers never observe a partially updated template set.
//!
//! # Examples
//!
//! ```rust,no_run
//! use platekit::registry::TemplateRegistry;
//! use std::path::Path;
//!
//! # fn main() -> platekit::core::Result<()> {
//! let report = TemplateRegistry::load(Path::new("templates/"))?;
//! for error in &report.errors {
//!     eprintln!("skipped: {error}");
//! }
//! let template = report.registry.get("netlify-deploy")?;
//! println!("{}", template.description);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::core::{PlatekitError, Result, similar_names};
use crate::definition::TemplateDefinition;

/// A registry shared across concurrent renderers.
///
/// Hot reload is an atomic swap of the whole `Arc`, not in-place mutation.
pub type SharedRegistry = Arc<TemplateRegistry>;

/// Outcome of a registry load: the populated registry plus per-file issues.
#[derive(Debug)]
pub struct LoadReport {
    /// The registry built from every file that parsed cleanly
    pub registry: TemplateRegistry,
    /// One entry per file that failed to parse; loading continued past each
    pub errors: Vec<PlatekitError>,
    /// Non-fatal issues found in files that did load
    pub warnings: Vec<String>,
}

/// Read-only, in-memory collection of loaded template definitions.
#[derive(Debug, Default, Clone)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, TemplateDefinition>,
}

impl TemplateRegistry {
    /// Scan `source_root` recursively and parse every `*.yaml` / `*.yml` file.
    ///
    /// Files are parsed independently; a malformed file contributes a
    /// [`PlatekitError::Parse`] entry to the report and is skipped. When two
    /// files declare the same template name, the first (in walk order) wins
    /// and the duplicate is reported as an error.
    ///
    /// # Errors
    ///
    /// Returns an error only when `source_root` itself cannot be read.
    pub fn load(source_root: &Path) -> Result<LoadReport> {
        if !source_root.is_dir() {
            return Err(PlatekitError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("template source root {} is not a directory", source_root.display()),
            )));
        }

        let mut templates = BTreeMap::new();
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for entry in WalkDir::new(source_root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {e}", source_root.display());
                    errors.push(PlatekitError::Io(std::io::Error::other(e)));
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_template_file(entry.path()) {
                continue;
            }

            debug!(path = %entry.path().display(), "parsing template file");
            match TemplateDefinition::from_file(entry.path()) {
                Ok((definition, file_warnings)) => {
                    warnings.extend(file_warnings);
                    if templates.contains_key(&definition.name) {
                        errors.push(PlatekitError::Parse {
                            path: entry.path().to_path_buf(),
                            line: None,
                            column: None,
                            message: format!(
                                "duplicate template name '{}' (an earlier file already defines it)",
                                definition.name
                            ),
                        });
                    } else {
                        templates.insert(definition.name.clone(), definition);
                    }
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), "failed to parse template file: {e}");
                    errors.push(e);
                }
            }
        }

        debug!(
            loaded = templates.len(),
            failed = errors.len(),
            "registry load complete"
        );
        Ok(LoadReport {
            registry: Self {
                templates,
            },
            errors,
            warnings,
        })
    }

    /// Build a registry directly from definitions, bypassing the filesystem.
    ///
    /// Intended for tests and embedders that assemble definitions themselves.
    pub fn with_templates<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = TemplateDefinition>,
    {
        let templates =
            definitions.into_iter().map(|d| (d.name.clone(), d)).collect::<BTreeMap<_, _>>();
        Self {
            templates,
        }
    }

    /// Look up a template by id.
    ///
    /// # Errors
    ///
    /// Returns [`PlatekitError::TemplateNotFound`] with nearest-name
    /// suggestions when the id is absent.
    pub fn get(&self, template_id: &str) -> Result<&TemplateDefinition> {
        self.templates.get(template_id).ok_or_else(|| PlatekitError::TemplateNotFound {
            template_id: template_id.to_string(),
            suggestions: similar_names(template_id, self.templates.keys().map(String::as_str)),
        })
    }

    /// All templates in a category, sorted by name ascending.
    #[must_use]
    pub fn list_by_category(&self, category: &str) -> Vec<&TemplateDefinition> {
        // BTreeMap iteration is already name-ordered.
        self.templates.values().filter(|t| t.category == category).collect()
    }

    /// All templates carrying a tag, sorted by name ascending.
    #[must_use]
    pub fn list_by_tag(&self, tag: &str) -> Vec<&TemplateDefinition> {
        self.templates.values().filter(|t| t.tags.iter().any(|candidate| candidate == tag)).collect()
    }

    /// Every loaded template, sorted by name ascending.
    #[must_use]
    pub fn list_all(&self) -> Vec<&TemplateDefinition> {
        self.templates.values().collect()
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the registry holds no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Wrap the registry for sharing across renderers.
    #[must_use]
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(self)
    }
}

fn is_template_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TemplateDefinition;
    use std::path::PathBuf;

    fn definition(name: &str, category: &str, tags: &[&str]) -> TemplateDefinition {
        let source = format!(
            "name: {name}\ncategory: {category}\ntags: [{}]\ntemplate: body\n",
            tags.join(", ")
        );
        TemplateDefinition::from_yaml(&source, &PathBuf::from("inline.yaml")).unwrap().0
    }

    #[test]
    fn test_get_unknown_template_suggests_neighbors() {
        let registry = TemplateRegistry::with_templates([
            definition("docker-compose", "docker", &[]),
            definition("vercel-deploy", "deployment", &[]),
        ]);
        match registry.get("docker-compse") {
            Err(PlatekitError::TemplateNotFound {
                template_id,
                suggestions,
            }) => {
                assert_eq!(template_id, "docker-compse");
                assert_eq!(suggestions, vec!["docker-compose".to_string()]);
            }
            other => panic!("expected TemplateNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_list_by_category_is_name_ordered() {
        let registry = TemplateRegistry::with_templates([
            definition("zeta", "deployment", &[]),
            definition("alpha", "deployment", &[]),
            definition("other", "auth", &[]),
        ]);
        let names: Vec<_> =
            registry.list_by_category("deployment").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_list_by_tag() {
        let registry = TemplateRegistry::with_templates([
            definition("netlify", "deployment", &["spa", "cdn"]),
            definition("postgres", "database", &["sql"]),
        ]);
        let names: Vec<_> = registry.list_by_tag("spa").iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["netlify"]);
        assert!(registry.list_by_tag("nosuch").is_empty());
    }
}
