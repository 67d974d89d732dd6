//! Error handling for platekit
//!
//! This module provides the error types and user-friendly error reporting for the
//! template engine. The error system is designed around two core principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** that name the offending identifier and are
//!    sufficient to correct the input without inspecting source
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`PlatekitError`] - Enumerated error types for all failure cases
//! - [`ErrorContext`] - Wrapper that adds user-friendly suggestions and details
//!
//! # Error Categories
//!
//! Errors are organized into several categories:
//! - **Loading**: [`PlatekitError::Parse`], [`PlatekitError::Io`]
//! - **Lookup**: [`PlatekitError::TemplateNotFound`], [`PlatekitError::UnknownVariant`]
//! - **Resolution**: [`PlatekitError::MissingRequiredVariable`],
//!   [`PlatekitError::TypeMismatch`], [`PlatekitError::InvalidOption`]
//! - **Rendering**: [`PlatekitError::UndefinedVariable`], [`PlatekitError::Syntax`],
//!   [`PlatekitError::OutputLimitExceeded`], [`PlatekitError::LoopLimitExceeded`]
//!
//! All errors are recoverable at the call site: a failed render never aborts the
//! process, the caller receives a typed failure and may retry with corrected
//! input.
//!
//! # Examples
//!
//! ## Pattern Matching on Errors
//!
//! ```rust,no_run
//! use platekit::core::PlatekitError;
//!
//! fn handle_error(error: PlatekitError) {
//!     match error {
//!         PlatekitError::TemplateNotFound { template_id, .. } => {
//!             eprintln!("no template named '{template_id}'");
//!         }
//!         PlatekitError::MissingRequiredVariable { variable } => {
//!             eprintln!("supply a value for '{variable}' and retry");
//!         }
//!         other => eprintln!("render failed: {other}"),
//!     }
//! }
//! ```

use colored::Colorize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for platekit operations
///
/// Each variant carries the identifier it concerns (template id, variable name,
/// or file path) so that error messages can be acted on without reading the
/// template source.
#[derive(Error, Debug)]
pub enum PlatekitError {
    /// A template definition file could not be parsed.
    ///
    /// Reported per-file during registry load; one malformed file never aborts
    /// loading of the others.
    #[error("failed to parse template file {}{}: {message}", path.display(), format_position(*line, *column))]
    Parse {
        /// Path of the offending definition file
        path: PathBuf,
        /// 1-based line of the parse failure, when the parser reports one
        line: Option<usize>,
        /// 1-based column of the parse failure, when the parser reports one
        column: Option<usize>,
        /// Parser message describing what was malformed
        message: String,
    },

    /// The requested template id does not exist in the registry.
    #[error("template not found: '{template_id}'{}", format_suggestions(suggestions))]
    TemplateNotFound {
        /// The id that was requested
        template_id: String,
        /// Closest known template names, if any are similar enough
        suggestions: Vec<String>,
    },

    /// A selected variant name is not declared by the template.
    #[error("template '{template_id}' has no variant '{variant}'{}", format_available(available))]
    UnknownVariant {
        /// Template whose variants were searched
        template_id: String,
        /// The variant that was requested
        variant: String,
        /// Variants the template does declare
        available: Vec<String>,
    },

    /// A `required: true` variable has no value after defaults, variants, and
    /// supplied values were merged.
    #[error("missing required variable: '{variable}'")]
    MissingRequiredVariable {
        /// Name of the variable with no resolved value
        variable: String,
    },

    /// A resolved value does not conform to the declared variable type.
    #[error("type mismatch for variable '{variable}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the offending variable
        variable: String,
        /// The declared type, e.g. `boolean`
        expected: String,
        /// The runtime type of the resolved value, e.g. `string`
        actual: String,
    },

    /// A `select` variable resolved to a value outside its option set.
    #[error("invalid option for variable '{variable}': {value} is not one of {options}")]
    InvalidOption {
        /// Name of the offending variable
        variable: String,
        /// The rejected value, JSON-encoded
        value: String,
        /// The allowed options, JSON-encoded
        options: String,
    },

    /// The template body references a variable absent from the resolved map
    /// (strict mode only; permissive mode substitutes empty and warns).
    #[error("undefined variable '{variable}' at line {line}, column {column}{}", format_suggestions(suggestions))]
    UndefinedVariable {
        /// Name referenced by the body
        variable: String,
        /// 1-based line of the reference in the body
        line: usize,
        /// 1-based column of the reference in the body
        column: usize,
        /// Closest resolved variable names, if any are similar enough
        suggestions: Vec<String>,
    },

    /// The body contains a malformed `{{ }}` or `{% %}` construct.
    #[error("template syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// What was malformed (unbalanced block, unknown filter, ...)
        message: String,
        /// 1-based line of the construct
        line: usize,
        /// 1-based column of the construct
        column: usize,
    },

    /// Rendered output exceeded the configured size bound.
    #[error("rendered output exceeded the configured limit of {limit} bytes")]
    OutputLimitExceeded {
        /// The configured byte limit
        limit: usize,
    },

    /// A `{% for %}` loop exceeded the configured iteration bound.
    #[error("loop at line {line} exceeded the configured limit of {limit} iterations")]
    LoopLimitExceeded {
        /// The configured iteration limit
        limit: usize,
        /// 1-based line of the loop tag
        line: usize,
    },

    /// I/O failure while scanning or reading template files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_position(line: Option<usize>, column: Option<usize>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!(" (line {l}, column {c})"),
        (Some(l), None) => format!(" (line {l})"),
        _ => String::new(),
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean {}?)", quote_list(suggestions))
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        " (the template declares no variants)".to_string()
    } else {
        format!(" (available: {})", quote_list(available))
    }
}

fn quote_list(names: &[String]) -> String {
    names.iter().map(|n| format!("'{n}'")).collect::<Vec<_>>().join(", ")
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PlatekitError>;

/// User-friendly error wrapper with suggestions and details
///
/// Wraps a [`PlatekitError`] with optional actionable guidance. Suggestions
/// are concrete steps the caller can take; details explain why the error
/// occurred.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: PlatekitError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a [`PlatekitError`]
    #[must_use]
    pub const fn new(error: PlatekitError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    ///
    /// Suggestions should be actionable steps. They are displayed in green in
    /// the terminal to draw attention.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    ///
    /// Color coding:
    /// - Error message: red and bold
    /// - Details: yellow
    /// - Suggestion: green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert an error into a user-friendly [`ErrorContext`] with a suggestion
/// tailored to the failure class.
#[must_use]
pub fn user_friendly_error(error: PlatekitError) -> ErrorContext {
    let suggestion = match &error {
        PlatekitError::Parse { path, .. } => Some(format!(
            "Check the YAML structure of {} against the template file format",
            path.display()
        )),
        PlatekitError::TemplateNotFound { .. } => {
            Some("Run the registry load again or list available templates".to_string())
        }
        PlatekitError::MissingRequiredVariable { variable } => {
            Some(format!("Supply a value for '{variable}' or select a variant that sets it"))
        }
        PlatekitError::UndefinedVariable { variable, .. } => Some(format!(
            "Declare '{variable}' in the template's variables block, or render in permissive mode"
        )),
        _ => None,
    };

    let mut context = ErrorContext::new(error);
    if let Some(s) = suggestion {
        context = context.with_suggestion(s);
    }
    context
}
