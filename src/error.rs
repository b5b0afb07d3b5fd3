//! Error taxonomy for the growth-news pipeline.
//!
//! Every fatal failure for a single company maps onto one [`NewsError`]
//! variant. The social-feed scraper never surfaces these to its caller; it
//! logs them and returns `None` instead.

use std::path::PathBuf;

/// Errors produced by the resolver, enricher, extractor and their plumbing.
#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    /// A required setting is missing or blank.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The search backend returned no usable URL for the company.
    #[error("could not resolve a URL for {company}: {message}")]
    Resolution { company: String, message: String },

    /// The company-data API failed after the localised retry, or returned a
    /// record with no industries.
    #[error("enrichment failed for {url}: {message}")]
    Enrichment { url: String, message: String },

    /// The generation backend answered with JSON that does not match the
    /// article schema.
    #[error("response did not match the article schema: {0}")]
    SchemaValidation(String),

    /// An upstream answered with a non-success status.
    #[error("request failed (status {status}): {message}")]
    Request { status: u16, message: String },

    /// Connection, timeout or body-read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Company list could not be read or written.
    #[error("csv error: {0}")]
    Csv(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NewsError>;

impl NewsError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn enrichment(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Enrichment {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Rate limiting, server-side failures and transport errors are
    /// transient; everything else is a property of the request itself.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Request { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for NewsError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => NewsError::Request {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => NewsError::Transport(err.to_string()),
        }
    }
}

impl From<csv::Error> for NewsError {
    fn from(err: csv::Error) -> Self {
        NewsError::Csv(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = NewsError::configuration("PERPLEXITY_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "configuration error: PERPLEXITY_API_KEY is not set"
        );

        let err = NewsError::enrichment("https://acme.com", "status 404");
        assert!(err.to_string().contains("https://acme.com"));
    }

    #[test]
    fn transient_classification() {
        let rate_limited = NewsError::Request {
            status: 429,
            message: String::new(),
        };
        let not_found = NewsError::Request {
            status: 404,
            message: String::new(),
        };
        assert!(rate_limited.is_transient());
        assert!(NewsError::Transport("reset".into()).is_transient());
        assert!(!not_found.is_transient());
        assert!(!NewsError::SchemaValidation("missing field".into()).is_transient());
    }
}
