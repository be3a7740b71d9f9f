//! Error types, one enum per failure domain.
//!
//! Scraping, spreadsheet, mail and configuration failures each get their own
//! type so the collector can report which stage of a run broke and, for the
//! spreadsheet, how far it got before breaking.

use crate::utils::truncate_for_log;
use thiserror::Error;

/// Longest provider response body kept in an `Api` error, in characters.
pub const API_BODY_MAX_CHARS: usize = 300;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl ScrapeError {
    /// Non-success provider response; the body is cut to [`API_BODY_MAX_CHARS`].
    pub fn api(status: u16, body: &str) -> Self {
        ScrapeError::Api {
            status,
            message: truncate_for_log(body, API_BODY_MAX_CHARS),
        }
    }
}

impl From<reqwest::Error> for ScrapeError {
    fn from(err: reqwest::Error) -> Self {
        ScrapeError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ScrapeError {
    fn from(err: serde_json::Error) -> Self {
        ScrapeError::Parse(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Credentials error: {0}")]
    Credentials(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet not found: {0}")]
    NotFound(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SheetError {
    pub fn api(status: u16, body: &str) -> Self {
        SheetError::Api {
            status,
            message: truncate_for_log(body, API_BODY_MAX_CHARS),
        }
    }
}

impl From<reqwest::Error> for SheetError {
    fn from(err: reqwest::Error) -> Self {
        SheetError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(err: serde_json::Error) -> Self {
        SheetError::Parse(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for SheetError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        SheetError::Credentials(err.to_string())
    }
}

/// A spreadsheet append that stopped partway through a batch.
///
/// Rows before the failing one are already persisted; there is no rollback.
#[derive(Debug, Error)]
#[error("appended {appended} of {total} rows before failing: {source}")]
pub struct AppendFailure {
    pub appended: usize,
    pub total: usize,
    pub source: SheetError,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Invalid trend profile: {0}")]
    Invalid(String),
}

/// Failure of one collection run, tagged with the pipeline stage.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("fetch failed for keyword {keyword:?}: {source}")]
    Fetch {
        keyword: String,
        source: ScrapeError,
    },

    #[error("sheet append failed: {0}")]
    Sheet(#[source] AppendFailure),

    #[error("notification failed: {0}")]
    Notify(#[from] MailError),

    #[error("sheet append failed ({sheet}); notification also failed ({notify})")]
    Sinks {
        sheet: AppendFailure,
        notify: MailError,
    },
}
