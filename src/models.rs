//! Data models shared by the scrapers, the collector and the outputs.
//!
//! There is a single entity, [`TrendRecord`]: one social-media post that
//! matched one keyword, flattened into plain strings so the spreadsheet and
//! the email digest can consume it without knowing which platform it came
//! from.

use chrono::{DateTime, Utc};

/// `strftime` pattern used for [`TrendRecord::timestamp`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// A normalized post produced by one keyword search.
///
/// Records carry no identity and are never deduplicated; the same post may
/// be emitted by every run that finds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendRecord {
    /// Human label of the source platform, e.g. `"Twitter"`.
    pub platform: String,
    /// The keyword query that surfaced this post.
    pub keyword: String,
    /// Creation time of the post, formatted as `YYYY-MM-DD HH:MM` (UTC).
    pub timestamp: String,
    /// Full body text of the post.
    pub content: String,
    /// Permalink to the post.
    pub url: String,
}

impl TrendRecord {
    pub fn new(
        platform: impl Into<String>,
        keyword: impl Into<String>,
        created_at: DateTime<Utc>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            keyword: keyword.into(),
            timestamp: created_at.format(TIMESTAMP_FORMAT).to_string(),
            content: content.into(),
            url: url.into(),
        }
    }

    /// Spreadsheet row in the fixed column order
    /// `[timestamp, platform, keyword, content, url]`.
    pub fn sheet_row(&self) -> [String; 5] {
        [
            self.timestamp.clone(),
            self.platform.clone(),
            self.keyword.clone(),
            self.content.clone(),
            self.url.clone(),
        ]
    }
}
