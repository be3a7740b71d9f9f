//! X / Twitter recent-search scraper.
//!
//! Uses the v2 `tweets/search/recent` endpoint with an app-only bearer
//! token. The API only accepts page sizes between 10 and 100, so small
//! limits still request a full minimum page and cut the result locally;
//! larger limits follow `next_token` until enough tweets have been seen.

use crate::error::ScrapeError;
use crate::models::TrendRecord;
use crate::scrapers::TrendScraper;
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";
const PLATFORM: &str = "Twitter";
const MIN_PAGE_SIZE: usize = 10;
const MAX_PAGE_SIZE: usize = 100;

/// A tweet as returned in the `data` array. Every field is optional so one
/// malformed entry does not sink the whole page.
#[derive(Debug, Clone, Deserialize)]
pub struct Tweet {
    pub id: Option<String>,
    pub text: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub note_tweet: Option<NoteTweet>,
}

/// Long-form body attached to tweets over the classic length limit.
#[derive(Debug, Clone, Deserialize)]
pub struct NoteTweet {
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<SearchMeta>,
}

#[derive(Debug, Deserialize)]
struct SearchMeta {
    next_token: Option<String>,
}

impl Tweet {
    /// Normalize into a [`TrendRecord`]. Returns `None` when the id, the
    /// creation time or the body is missing.
    pub fn into_record(self, keyword: &str) -> Option<TrendRecord> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let created_at = self.created_at?;
        let content = self.note_tweet.map(|n| n.text).or(self.text)?;
        Some(TrendRecord::new(
            PLATFORM,
            keyword,
            created_at,
            content,
            format!("https://twitter.com/user/status/{id}"),
        ))
    }
}

pub struct TwitterScraper {
    client: reqwest::Client,
    bearer_token: String,
    search_url: String,
}

impl TwitterScraper {
    pub fn new(bearer_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            bearer_token,
            search_url: SEARCH_URL.to_string(),
        }
    }

    /// Send searches to `url` instead of the public recent-search endpoint.
    pub fn with_search_url(self, url: impl Into<String>) -> Self {
        Self {
            search_url: url.into(),
            ..self
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(
        &self,
        query: &str,
        page_size: usize,
        next_token: Option<&str>,
    ) -> Result<SearchResponse, ScrapeError> {
        let mut params = vec![
            ("query", query.to_string()),
            ("max_results", page_size.to_string()),
            ("tweet.fields", "created_at,note_tweet".to_string()),
        ];
        if let Some(token) = next_token {
            params.push(("next_token", token.to_string()));
        }
        let url = Url::parse_with_params(&self.search_url, &params)
            .map_err(|e| ScrapeError::Parse(e.to_string()))?;

        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %truncate_for_log(&body, 300), "Twitter search returned non-success");
            return Err(ScrapeError::api(status.as_u16(), &body));
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TrendScraper for TwitterScraper {
    fn platform(&self) -> &str {
        PLATFORM
    }

    #[instrument(level = "info", skip(self))]
    async fn search(
        &self,
        keyword: &str,
        limit: usize,
        language: Option<&str>,
    ) -> Result<Vec<TrendRecord>, ScrapeError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query = build_query(keyword, language);
        let mut records = Vec::with_capacity(limit);
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .fetch_page(&query, page_size(limit - records.len()), next_token.as_deref())
                .await?;
            let returned = page.data.len();

            records.extend(
                page.data
                    .into_iter()
                    .filter_map(|tweet| tweet.into_record(keyword))
                    .take(limit - records.len()),
            );
            debug!(returned, kept = records.len(), "Fetched Twitter search page");

            next_token = page.meta.and_then(|m| m.next_token);
            if records.len() >= limit || next_token.is_none() {
                break;
            }
        }

        info!(count = records.len(), "Collected tweets");
        Ok(records)
    }
}

/// Search query for `keyword`, restricted to `language` when given.
fn build_query(keyword: &str, language: Option<&str>) -> String {
    match language {
        Some(lang) if !lang.is_empty() => format!("{keyword} lang:{lang}"),
        _ => keyword.to_string(),
    }
}

fn page_size(remaining: usize) -> usize {
    remaining.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}
