//! Error types for narou-txt operations.
//!
//! This module defines the main error type [`NarouError`], covering transport,
//! extraction, persistence and run-level failures. The conversion engine has no
//! error outcomes of its own; only its configuration can be rejected.
//!
//! # Example
//!
//! ```rust
//! use narou_txt_core::{NarouError, Result};
//!
//! fn first_chapter(urls: &[String]) -> Result<&str> {
//!     urls.first().map(String::as_str).ok_or(NarouError::NoChapters)
//! }
//! # assert!(first_chapter(&[]).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for discovery, fetching, extraction and persistence.
///
/// Variants are grouped by how the download pipeline treats them: transport
/// and extraction failures are retried, persistence failures are retried by a
/// separate policy, and [`NarouError::NoChapters`] / [`NarouError::TooManyFailures`]
/// stop the whole run.
#[derive(Error, Debug)]
pub enum NarouError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps connection failures, DNS errors and non-success transport outcomes.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, including invalid CSS selectors.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The chapter body contained no non-empty text sections.
    #[error("No content could be extracted from the page")]
    NoContent,

    /// An element the page layout requires was not found.
    #[error("Required element not found: {0}")]
    MissingElement(String),

    /// The page is neither a serial index nor a standalone story.
    #[error("Unknown page type (no episode list and no story body)")]
    UnknownPageType,

    /// The table of contents was walked completely but held no chapters.
    #[error("No chapters were found in the table of contents")]
    NoChapters,

    /// Fetching a follow-up table of contents page failed.
    #[error("Failed to fetch index page {url}: {source}")]
    IndexPage {
        url: String,
        #[source]
        source: Box<NarouError>,
    },

    /// File not found.
    ///
    /// Returned when attempting to read a file that doesn't exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File write errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),

    /// Every attempt allowed by a retry policy failed.
    ///
    /// `source` is the error seen on the final attempt.
    #[error("{target} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        target: String,
        #[source]
        source: Box<NarouError>,
    },

    /// Consecutive chapter failures reached the abort threshold.
    #[error("Download aborted after {failures} consecutive chapter failures: {source}")]
    TooManyFailures {
        failures: u32,
        #[source]
        source: Box<NarouError>,
    },

    /// JSON serialization errors.
    #[error("Failed to serialize JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration values.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl NarouError {
    /// Returns true for errors that end the whole download run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NarouError::NoChapters | NarouError::TooManyFailures { .. })
    }
}

/// Result type alias for NarouError.
pub type Result<T> = std::result::Result<T, NarouError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NarouError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_too_many_failures_mentions_count() {
        let err = NarouError::TooManyFailures { failures: 3, source: Box::new(NarouError::NoContent) };
        let message = err.to_string();
        assert!(message.contains('3'));
        assert!(message.contains("No content"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_retries_exhausted_keeps_last_cause() {
        let err = NarouError::RetriesExhausted {
            attempts: 3,
            target: "chapter https://ncode.syosetu.com/n1234ab/2/".to_string(),
            source: Box::new(NarouError::Timeout { timeout: 10 }),
        };
        assert!(err.to_string().contains("after 3 attempts"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_no_chapters_is_distinct_from_transport() {
        let walk = NarouError::NoChapters;
        let fetch = NarouError::IndexPage {
            url: "https://ncode.syosetu.com/n1234ab/?p=2".to_string(),
            source: Box::new(NarouError::Timeout { timeout: 10 }),
        };
        assert!(walk.is_fatal());
        assert!(!fetch.is_fatal());
        assert_ne!(walk.to_string(), fetch.to_string());
    }
}
