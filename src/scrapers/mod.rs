//! Keyword search sources.
//!
//! A source takes one keyword and returns up to `limit` normalized
//! [`TrendRecord`]s in the provider's order. The collector only talks to
//! the [`TrendScraper`] trait, so a source can be swapped or replaced with
//! an in-memory double without touching the rest of the run.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | X / Twitter | [`twitter`] | v2 recent search API | Bearer token; optional `lang:` filter |

use crate::error::ScrapeError;
use crate::models::TrendRecord;
use async_trait::async_trait;

pub mod twitter;

#[async_trait]
pub trait TrendScraper: Send + Sync {
    /// Platform label written into every record this source produces.
    fn platform(&self) -> &str;

    /// Search recent posts matching `keyword`.
    ///
    /// Returns at most `limit` records, preserving provider order. Items the
    /// provider returns incomplete are skipped rather than failing the call.
    async fn search(
        &self,
        keyword: &str,
        limit: usize,
        language: Option<&str>,
    ) -> Result<Vec<TrendRecord>, ScrapeError>;
}
