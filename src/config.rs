//! Trend profile: which keywords to search and how a run behaves.
//!
//! Secrets and endpoints come from the command line / environment (see
//! [`crate::cli`]). The profile holds the non-secret knobs and can be
//! supplied as a YAML file; every field is optional and falls back to the
//! built-in defaults.
//!
//! ```yaml
//! keywords:
//!   - deep sea creature
//!   - rare jellyfish
//! per_keyword_limit: 2
//! language: en
//! on_fetch_error: skip
//! sink_policy: coupled
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "deep sea creature",
    "rare jellyfish",
    "심해생물",
    "해양생물",
    "정체불명 해파리",
];

pub const DEFAULT_PER_KEYWORD_LIMIT: usize = 2;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_SUBJECT: &str = "🌊 Deep-Sea Trend Digest";

/// What a run does when one keyword's search fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchPolicy {
    /// Abandon the run; records from earlier keywords are discarded.
    #[default]
    Abort,
    /// Log the failure and continue with the remaining keywords.
    Skip,
}

/// How the spreadsheet and email outputs relate when one of them fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkPolicy {
    /// Always attempt the email, even after a failed append.
    #[default]
    Independent,
    /// A failed append ends the run before the email is sent.
    Coupled,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrendProfile {
    pub keywords: Vec<String>,
    pub per_keyword_limit: usize,
    /// Language filter passed to the search provider; `None` searches all.
    pub language: Option<String>,
    pub subject: String,
    pub on_fetch_error: FetchPolicy,
    pub sink_policy: SinkPolicy,
}

impl Default for TrendProfile {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            per_keyword_limit: DEFAULT_PER_KEYWORD_LIMIT,
            language: Some(DEFAULT_LANGUAGE.to_string()),
            subject: DEFAULT_SUBJECT.to_string(),
            on_fetch_error: FetchPolicy::default(),
            sink_policy: SinkPolicy::default(),
        }
    }
}

impl TrendProfile {
    pub fn from_yaml(yaml: &str, path: &str) -> Result<Self, ConfigError> {
        let profile: TrendProfile = serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
            path: path.to_string(),
            source,
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keywords.is_empty() {
            return Err(ConfigError::Invalid("keywords must not be empty".into()));
        }
        if self.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::Invalid("keywords must not be blank".into()));
        }
        if self.per_keyword_limit == 0 {
            return Err(ConfigError::Invalid(
                "per_keyword_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load the trend profile from `path`, or the defaults when no path is given.
#[instrument(level = "info")]
pub async fn load_profile(path: Option<&str>) -> Result<TrendProfile, ConfigError> {
    let Some(path) = path else {
        info!("No trend profile given; using built-in defaults");
        return Ok(TrendProfile::default());
    };

    let yaml = fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
    let profile = TrendProfile::from_yaml(&yaml, path)?;
    info!(
        keywords = profile.keywords.len(),
        per_keyword_limit = profile.per_keyword_limit,
        language = ?profile.language,
        on_fetch_error = ?profile.on_fetch_error,
        sink_policy = ?profile.sink_policy,
        "Loaded trend profile"
    );
    Ok(profile)
}
