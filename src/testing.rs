//! In-memory doubles for the scraper, spreadsheet and mailer seams, plus a
//! loopback HTTP server for exercising the real provider clients.

use crate::error::{MailError, ScrapeError, SheetError};
use crate::models::TrendRecord;
use crate::outputs::email::Mailer;
use crate::outputs::sheet::SheetStore;
use crate::scrapers::TrendScraper;
use async_trait::async_trait;
use axum::Router;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serve `app` on an ephemeral loopback port and return its base URL.
pub async fn serve_stub(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn record(keyword: &str, n: u32) -> TrendRecord {
    TrendRecord::new(
        "Twitter",
        keyword,
        Utc.with_ymd_and_hms(2025, 5, 6, 12, n % 60, 0).unwrap(),
        format!("post {n} about {keyword}"),
        format!("https://twitter.com/user/status/{n}"),
    )
}

pub fn record_with_content(keyword: &str, content: &str) -> TrendRecord {
    TrendRecord {
        content: content.to_string(),
        ..record(keyword, 1)
    }
}

/// Scraper returning canned results per keyword. Unknown keywords yield an
/// empty result; keywords registered with [`MockScraper::failing`] error.
#[derive(Default)]
pub struct MockScraper {
    results: HashMap<String, Vec<TrendRecord>>,
    failures: Vec<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<(String, usize, Option<String>)>>,
}

impl MockScraper {
    pub fn with(mut self, keyword: &str, records: Vec<TrendRecord>) -> Self {
        self.results.insert(keyword.to_string(), records);
        self
    }

    pub fn failing(mut self, keyword: &str) -> Self {
        self.failures.push(keyword.to_string());
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, usize, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn searched_keywords(&self) -> Vec<String> {
        self.calls().into_iter().map(|(k, _, _)| k).collect()
    }
}

#[async_trait]
impl TrendScraper for MockScraper {
    fn platform(&self) -> &str {
        "Twitter"
    }

    async fn search(
        &self,
        keyword: &str,
        limit: usize,
        language: Option<&str>,
    ) -> Result<Vec<TrendRecord>, ScrapeError> {
        self.calls.lock().unwrap().push((
            keyword.to_string(),
            limit,
            language.map(str::to_string),
        ));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failures.iter().any(|k| k == keyword) {
            return Err(ScrapeError::api(401, "Unauthorized"));
        }
        Ok(self
            .results
            .get(keyword)
            .map(|r| r.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Spreadsheet that keeps rows in memory and can fail on the n-th append
/// attempt (1-based).
#[derive(Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Vec<String>>>,
    attempts: Mutex<usize>,
    fail_on: Option<usize>,
}

impl MemorySheet {
    pub fn failing_on(attempt: usize) -> Self {
        Self {
            fail_on: Some(attempt),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl SheetStore for MemorySheet {
    async fn append_row(&self, row: &[String]) -> Result<(), SheetError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            *attempts += 1;
            *attempts
        };
        if self.fail_on == Some(attempt) {
            return Err(SheetError::api(429, "Quota exceeded"));
        }
        self.rows.lock().unwrap().push(row.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Transport("535 authentication failed".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}
