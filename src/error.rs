//! Error types for the graph engine.
//!
//! Every fallible engine operation returns [`GraphError`]. Recoverable
//! failures on attached assets are additionally converted to
//! [`GraphEvent`](crate::core::GraphEvent)s and delivered on the owning
//! graph's event channel instead of being returned.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::AssetId;

/// Result alias used throughout the crate.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

/// A structured-form parse failure with optional source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub message: String,
    /// Url of the asset being parsed, absent for inline assets.
    pub url: Option<String>,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            url: None,
            line: None,
            column: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_url(mut self, url: Option<&str>) -> Self {
        self.url = url.map(str::to_owned);
        self
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parse error in {}: {}",
            self.url.as_deref().unwrap_or("(inline)"),
            self.message
        )?;
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, " (line {line}, column {column})"),
            (Some(line), None) => write!(f, " (line {line})"),
            _ => Ok(()),
        }
    }
}

/// Errors produced by the graph engine.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("{0}")]
    Parse(ParseFailure),

    #[error("attach: {0}")]
    Attach(String),

    #[error("detach: {0}")]
    Detach(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("asset {0} already belongs to a graph")]
    AlreadyAttached(AssetId),

    #[error("failed to load {url}: {reason}")]
    Load { url: String, reason: String },

    #[error("encoding: {0}")]
    Encoding(String),

    #[error("{asset_type} assets do not support {operation}")]
    Unsupported {
        asset_type: &'static str,
        operation: &'static str,
    },

    #[error("asset not loaded: {0}")]
    NotLoaded(String),

    #[error("I/O error on `{0}`")]
    Io(PathBuf, #[source] io::Error),

    #[error("invalid pattern: {0}")]
    Pattern(String),

    #[error("background task failed: {0}")]
    Task(String),
}

impl GraphError {
    /// Structural errors are never funnelled to the event channel.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::Attach(_) | Self::Detach(_) | Self::AlreadyAttached(_) | Self::NotFound(_)
        )
    }

    /// Url the error refers to, when known.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Parse(failure) => failure.url.as_deref(),
            Self::Load { url, .. } => Some(url),
            _ => None,
        }
    }
}

impl From<ParseFailure> for GraphError {
    fn from(failure: ParseFailure) -> Self {
        Self::Parse(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_failure_display() {
        let failure = ParseFailure::new("unexpected end")
            .at(3, 7)
            .with_url(Some("file:///a.css"));
        assert_eq!(
            failure.to_string(),
            "parse error in file:///a.css: unexpected end (line 3, column 7)"
        );

        let inline = ParseFailure::new("bad");
        assert_eq!(inline.to_string(), "parse error in (inline): bad");
    }

    #[test]
    fn test_structural_errors() {
        assert!(GraphError::Attach("x".into()).is_structural());
        assert!(GraphError::Detach("x".into()).is_structural());
        assert!(
            !GraphError::Load {
                url: "file:///x".into(),
                reason: "missing".into()
            }
            .is_structural()
        );
    }

    #[test]
    fn test_error_url() {
        let err = GraphError::Load {
            url: "file:///missing.json".into(),
            reason: "not found".into(),
        };
        assert_eq!(err.url(), Some("file:///missing.json"));
        assert_eq!(
            err.to_string(),
            "failed to load file:///missing.json: not found"
        );
    }
}
