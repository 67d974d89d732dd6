//! Core types and functionality for platekit
//!
//! This module forms the foundation of the crate's type system, providing the
//! error taxonomy and the suggestion helpers used throughout the codebase.
//!
//! # Modules
//!
//! ## `error` - Comprehensive Error Handling
//!
//! The error module provides:
//! - [`PlatekitError`] - Enumerated error types covering all failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! # Design Principles
//!
//! ## Error First Design
//! Every operation that can fail returns a [`Result`] with meaningful error
//! information. Errors name the offending identifier (template id, variable
//! name, or file path) so they can be corrected without inspecting source.
//!
//! ## Recoverability
//! Nothing in this crate aborts the process: parse errors during registry load
//! are collected and reported as a batch, and render failures return typed
//! errors the caller can retry from.

pub mod error;

pub use error::{ErrorContext, PlatekitError, Result, user_friendly_error};

use strsim::levenshtein;

/// Maximum allowed Levenshtein distance as a percentage of target length for
/// suggestions. This represents a 50% similarity threshold for name suggestions.
const SIMILARITY_THRESHOLD_PERCENT: usize = 50;

/// Find names similar to `wanted` among `candidates`, for "did you mean" hints.
///
/// Candidates within half of the wanted name's length in edit distance are
/// returned, closest first, capped at three. Used by the registry for unknown
/// template ids and by the renderer for undefined variables.
#[must_use]
pub fn similar_names<'a, I>(wanted: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let threshold = (wanted.len() * SIMILARITY_THRESHOLD_PERCENT).div_ceil(100).max(1);
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let distance = levenshtein(wanted, candidate);
            (distance <= threshold).then_some((distance, candidate))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(3).map(|(_, name)| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similar_names_finds_close_match() {
        let names = ["docker-compose", "vercel-deploy", "netlify-deploy"];
        let found = similar_names("docker-compse", names.iter().copied());
        assert_eq!(found, vec!["docker-compose".to_string()]);
    }

    #[test]
    fn test_similar_names_ignores_distant_candidates() {
        let names = ["docker-compose"];
        let found = similar_names("auth", names.iter().copied());
        assert!(found.is_empty());
    }

    #[test]
    fn test_similar_names_orders_by_distance() {
        let names = ["node_env", "node_envs", "node"];
        let found = similar_names("node_env", names.iter().copied());
        assert_eq!(found[0], "node_env");
    }
}
