//! # Error Types
//!
//! Defines `PseudoGenError`, the unified error enum for every failure mode in
//! pseudogen. Parse failures carry every offending section and line at once,
//! so a hand-edited `rules.ini` can be fixed in a single pass.

use std::fmt;

use thiserror::Error;

/// One problem found while parsing a `rules.ini` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIssue {
    /// Section the problem belongs to (e.g. `c3`), if any.
    pub section: Option<String>,
    /// 1-based line number in the source text, if known.
    pub line: Option<usize>,
    pub message: String,
}

impl ParseIssue {
    pub fn new(section: Option<&str>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            section: section.map(str::to_string),
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.section, self.line) {
            (Some(section), Some(line)) => write!(f, "[{}] line {}: {}", section, line, self.message),
            (Some(section), None) => write!(f, "[{}]: {}", section, self.message),
            (None, Some(line)) => write!(f, "line {}: {}", line, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

fn format_issues(issues: &[ParseIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

/// All errors that can occur in pseudogen operations.
#[derive(Error, Debug)]
pub enum PseudoGenError {
    #[error("Failed to parse rules file ({} problem(s)):\n{}", .issues.len(), format_issues(.issues))]
    Parse { issues: Vec<ParseIssue> },

    #[error("'{path}' is not a .ini file. Please select a rules file ending in .ini")]
    InvalidFileExtension { path: String },

    #[error("Request to {endpoint} failed: {message}")]
    Http { endpoint: String, message: String },

    #[error("Generator service returned {status} for {endpoint}: {detail}")]
    Service {
        endpoint: String,
        status: u16,
        detail: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Sample generation failed: {message}")]
    Generation { message: String },

    #[error("{0}")]
    Other(String),
}

impl PseudoGenError {
    /// Build an aggregate parse error from a single issue.
    pub fn parse(section: Option<&str>, line: Option<usize>, message: impl Into<String>) -> Self {
        PseudoGenError::Parse {
            issues: vec![ParseIssue::new(section, line, message)],
        }
    }
}

pub type Result<T> = std::result::Result<T, PseudoGenError>;
