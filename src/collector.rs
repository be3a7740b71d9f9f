//! The trend collection run: fetch, append, notify.
//!
//! A run walks the profile's keywords in order, asks the scraper for up to
//! `per_keyword_limit` posts each, and concatenates everything into one
//! batch. An empty batch ends the run with no side effects. Otherwise the
//! batch goes to the spreadsheet and then to the email digest.
//!
//! Each stage has its own result type so the policies in
//! [`TrendProfile`](crate::config::TrendProfile) decide what a failure
//! means:
//!
//! | Stage | Success | Failure |
//! |-------|---------|---------|
//! | fetch | [`Collection`] | [`CollectError::Fetch`] (abort) or a skipped keyword (skip) |
//! | sheet | rows appended | [`AppendFailure`] with the partial count |
//! | email | `()` | [`MailError`] |
//!
//! Only one run executes at a time; a trigger that arrives mid-run gets
//! [`RunOutcome::Busy`] instead of starting a second, interleaved run.

use crate::config::{FetchPolicy, SinkPolicy, TrendProfile};
use crate::error::{AppendFailure, CollectError, MailError};
use crate::models::TrendRecord;
use crate::outputs::email::NotificationSink;
use crate::outputs::sheet::SheetSink;
use crate::scrapers::TrendScraper;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// What started a run; carried into the run's log span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
    Once,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
            Trigger::Once => "once",
        })
    }
}

/// Output of the fetch stage.
#[derive(Debug, Default)]
pub struct Collection {
    pub records: Vec<TrendRecord>,
    /// Keywords whose search failed under [`FetchPolicy::Skip`].
    pub skipped_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub collected: usize,
    pub rows_appended: usize,
    pub notified: bool,
    pub skipped_keywords: Vec<String>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// Another run held the guard; nothing was done.
    Busy,
}

pub struct Collector {
    scraper: Arc<dyn TrendScraper>,
    sheet: SheetSink,
    notifier: NotificationSink,
    profile: TrendProfile,
    running: Mutex<()>,
}

impl Collector {
    pub fn new(
        scraper: Arc<dyn TrendScraper>,
        sheet: SheetSink,
        notifier: NotificationSink,
        profile: TrendProfile,
    ) -> Self {
        Self {
            scraper,
            sheet,
            notifier,
            profile,
            running: Mutex::new(()),
        }
    }

    /// Run once unless a run is already in progress.
    pub async fn try_run(&self, trigger: Trigger) -> Result<RunOutcome, CollectError> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!(%trigger, "Trend collection already running; skipping trigger");
            return Ok(RunOutcome::Busy);
        };
        self.run(trigger).await.map(RunOutcome::Completed)
    }

    #[instrument(level = "info", skip_all, fields(%trigger, platform = self.scraper.platform()))]
    async fn run(&self, trigger: Trigger) -> Result<RunReport, CollectError> {
        let t0 = Instant::now();
        info!(keywords = self.profile.keywords.len(), "Running trend collection");

        let Collection {
            records,
            skipped_keywords,
        } = self.fetch_all().await?;

        if records.is_empty() {
            info!(elapsed_ms = t0.elapsed().as_millis() as u64, "No new trends collected");
            return Ok(RunReport {
                collected: 0,
                rows_appended: 0,
                notified: false,
                skipped_keywords,
            });
        }

        let rows_appended = self.deliver(&records).await?;
        info!(
            collected = records.len(),
            rows_appended,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Saved trends and sent digest"
        );

        Ok(RunReport {
            collected: records.len(),
            rows_appended,
            notified: true,
            skipped_keywords,
        })
    }

    /// Fetch stage: search every keyword in order and concatenate results.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_all(&self) -> Result<Collection, CollectError> {
        let limit = self.profile.per_keyword_limit;
        let language = self.profile.language.as_deref();
        let mut collection = Collection::default();

        for keyword in &self.profile.keywords {
            match self.scraper.search(keyword, limit, language).await {
                Ok(mut found) => {
                    found.truncate(limit);
                    info!(%keyword, count = found.len(), "Fetched keyword");
                    collection.records.append(&mut found);
                }
                Err(source) => match self.profile.on_fetch_error {
                    FetchPolicy::Abort => {
                        error!(%keyword, error = %source, "Keyword fetch failed; aborting run");
                        return Err(CollectError::Fetch {
                            keyword: keyword.clone(),
                            source,
                        });
                    }
                    FetchPolicy::Skip => {
                        warn!(%keyword, error = %source, "Keyword fetch failed; skipping");
                        collection.skipped_keywords.push(keyword.clone());
                    }
                },
            }
        }

        Ok(collection)
    }

    /// Sheet and email stages, combined according to the sink policy.
    async fn deliver(&self, batch: &[TrendRecord]) -> Result<usize, CollectError> {
        match self.profile.sink_policy {
            SinkPolicy::Coupled => {
                let rows = self.sheet.append(batch).await.map_err(CollectError::Sheet)?;
                self.notifier.notify(batch).await?;
                Ok(rows)
            }
            SinkPolicy::Independent => {
                let sheet = self.sheet.append(batch).await;
                let notify = self.notifier.notify(batch).await;
                combine(sheet, notify)
            }
        }
    }
}

fn combine(
    sheet: Result<usize, AppendFailure>,
    notify: Result<(), MailError>,
) -> Result<usize, CollectError> {
    match (sheet, notify) {
        (Ok(rows), Ok(())) => Ok(rows),
        (Err(sheet), Ok(())) => Err(CollectError::Sheet(sheet)),
        (Ok(_), Err(notify)) => Err(CollectError::Notify(notify)),
        (Err(sheet), Err(notify)) => Err(CollectError::Sinks { sheet, notify }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, MemorySheet, MockScraper, RecordingMailer};
    use std::time::Duration;

    struct Harness {
        scraper: Arc<MockScraper>,
        sheet: Arc<MemorySheet>,
        mailer: Arc<RecordingMailer>,
        collector: Arc<Collector>,
    }

    fn harness(
        scraper: MockScraper,
        sheet: MemorySheet,
        mailer: RecordingMailer,
        profile: TrendProfile,
    ) -> Harness {
        let scraper = Arc::new(scraper);
        let sheet = Arc::new(sheet);
        let mailer = Arc::new(mailer);
        let collector = Arc::new(Collector::new(
            scraper.clone(),
            SheetSink::new(sheet.clone()),
            NotificationSink::new(mailer.clone(), profile.subject.clone()),
            profile,
        ));
        Harness {
            scraper,
            sheet,
            mailer,
            collector,
        }
    }

    fn profile(keywords: &[&str]) -> TrendProfile {
        TrendProfile {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..TrendProfile::default()
        }
    }

    fn completed(outcome: RunOutcome) -> RunReport {
        match outcome {
            RunOutcome::Completed(report) => report,
            RunOutcome::Busy => panic!("expected a completed run"),
        }
    }

    #[tokio::test]
    async fn test_batch_is_keyword_order_concatenation() {
        let h = harness(
            MockScraper::default()
                .with("a", vec![record("a", 1), record("a", 2)])
                .with("b", vec![record("b", 3)])
                .with("c", vec![record("c", 4), record("c", 5)]),
            MemorySheet::default(),
            RecordingMailer::default(),
            profile(&["c", "a", "b"]),
        );

        let collection = h.collector.fetch_all().await.unwrap();
        let urls: Vec<&str> = collection.records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://twitter.com/user/status/4",
                "https://twitter.com/user/status/5",
                "https://twitter.com/user/status/1",
                "https://twitter.com/user/status/2",
                "https://twitter.com/user/status/3",
            ]
        );
    }

    #[tokio::test]
    async fn test_passes_limit_and_language_to_scraper() {
        let h = harness(
            MockScraper::default(),
            MemorySheet::default(),
            RecordingMailer::default(),
            profile(&["deep sea creature"]),
        );
        h.collector.fetch_all().await.unwrap();
        assert_eq!(
            h.scraper.calls(),
            vec![("deep sea creature".to_string(), 2, Some("en".to_string()))]
        );
    }

    #[tokio::test]
    async fn test_two_keywords_one_empty() {
        let h = harness(
            MockScraper::default().with("a", vec![record("a", 1), record("a", 2)]),
            MemorySheet::default(),
            RecordingMailer::default(),
            profile(&["a", "b"]),
        );

        let report = completed(h.collector.try_run(Trigger::Manual).await.unwrap());

        assert_eq!(report.collected, 2);
        assert_eq!(report.rows_appended, 2);
        assert!(report.notified);
        assert_eq!(h.sheet.rows().len(), 2);
        assert!(h.sheet.rows().iter().all(|row| row[2] == "a"));
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.matches("🔹 ").count(), 2);
    }

    #[tokio::test]
    async fn test_empty_collection_has_no_side_effects() {
        let h = harness(
            MockScraper::default(),
            MemorySheet::default(),
            RecordingMailer::default(),
            profile(&["a"]),
        );

        let report = completed(h.collector.try_run(Trigger::Scheduled).await.unwrap());

        assert_eq!(report.collected, 0);
        assert!(!report.notified);
        assert_eq!(h.sheet.attempts(), 0);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_before_later_keywords() {
        let h = harness(
            MockScraper::default()
                .with("a", vec![record("a", 1)])
                .failing("b")
                .with("c", vec![record("c", 2)]),
            MemorySheet::default(),
            RecordingMailer::default(),
            profile(&["a", "b", "c"]),
        );

        let err = h.collector.try_run(Trigger::Manual).await.unwrap_err();

        assert!(matches!(err, CollectError::Fetch { ref keyword, .. } if keyword == "b"));
        assert_eq!(h.scraper.searched_keywords(), vec!["a", "b"]);
        assert_eq!(h.sheet.attempts(), 0);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_skip_policy_continues_past_failed_keyword() {
        let h = harness(
            MockScraper::default()
                .with("a", vec![record("a", 1)])
                .failing("b")
                .with("c", vec![record("c", 2)]),
            MemorySheet::default(),
            RecordingMailer::default(),
            TrendProfile {
                on_fetch_error: FetchPolicy::Skip,
                ..profile(&["a", "b", "c"])
            },
        );

        let report = completed(h.collector.try_run(Trigger::Manual).await.unwrap());

        assert_eq!(report.collected, 2);
        assert_eq!(report.skipped_keywords, vec!["b".to_string()]);
        assert_eq!(h.sheet.rows().len(), 2);
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_coupled_sheet_failure_suppresses_email() {
        let h = harness(
            MockScraper::default().with("a", vec![record("a", 1), record("a", 2), record("a", 3)]),
            MemorySheet::failing_on(2),
            RecordingMailer::default(),
            TrendProfile {
                sink_policy: SinkPolicy::Coupled,
                per_keyword_limit: 3,
                ..profile(&["a"])
            },
        );

        let err = h.collector.try_run(Trigger::Manual).await.unwrap_err();

        match err {
            CollectError::Sheet(failure) => assert_eq!(failure.appended, 1),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(h.sheet.rows().len(), 1);
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_independent_sheet_failure_still_emails() {
        let h = harness(
            MockScraper::default().with("a", vec![record("a", 1), record("a", 2), record("a", 3)]),
            MemorySheet::failing_on(2),
            RecordingMailer::default(),
            TrendProfile {
                per_keyword_limit: 3,
                ..profile(&["a"])
            },
        );

        let err = h.collector.try_run(Trigger::Manual).await.unwrap_err();

        assert!(matches!(err, CollectError::Sheet(_)));
        assert_eq!(h.sheet.rows().len(), 1);
        assert_eq!(h.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_independent_both_sinks_fail() {
        let h = harness(
            MockScraper::default().with("a", vec![record("a", 1)]),
            MemorySheet::failing_on(1),
            RecordingMailer::failing(),
            profile(&["a"]),
        );

        let err = h.collector.try_run(Trigger::Manual).await.unwrap_err();
        assert!(matches!(err, CollectError::Sinks { .. }));
    }

    #[tokio::test]
    async fn test_email_failure_keeps_sheet_rows() {
        let h = harness(
            MockScraper::default().with("a", vec![record("a", 1), record("a", 2)]),
            MemorySheet::default(),
            RecordingMailer::failing(),
            TrendProfile {
                sink_policy: SinkPolicy::Coupled,
                ..profile(&["a"])
            },
        );

        let err = h.collector.try_run(Trigger::Manual).await.unwrap_err();
        assert!(matches!(err, CollectError::Notify(_)));
        assert_eq!(h.sheet.rows().len(), 2);
    }

    #[tokio::test]
    async fn test_results_capped_at_limit() {
        // A source that ignores the limit still cannot overfill the batch.
        struct Greedy;

        #[async_trait::async_trait]
        impl TrendScraper for Greedy {
            fn platform(&self) -> &str {
                "Twitter"
            }

            async fn search(
                &self,
                keyword: &str,
                _limit: usize,
                _language: Option<&str>,
            ) -> Result<Vec<TrendRecord>, crate::error::ScrapeError> {
                Ok((0..5).map(|n| record(keyword, n)).collect())
            }
        }

        let sheet = Arc::new(MemorySheet::default());
        let collector = Collector::new(
            Arc::new(Greedy),
            SheetSink::new(sheet.clone()),
            NotificationSink::new(Arc::new(RecordingMailer::default()), "s".into()),
            profile(&["a", "b"]),
        );

        let collection = collector.fetch_all().await.unwrap();
        assert_eq!(collection.records.len(), 4);
    }

    #[tokio::test]
    async fn test_concurrent_trigger_is_rejected_while_running() {
        let h = harness(
            MockScraper::default()
                .with("a", vec![record("a", 1), record("a", 2)])
                .delayed(Duration::from_millis(200)),
            MemorySheet::default(),
            RecordingMailer::default(),
            profile(&["a"]),
        );

        let first = {
            let collector = h.collector.clone();
            tokio::spawn(async move { collector.try_run(Trigger::Scheduled).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = h.collector.try_run(Trigger::Manual).await.unwrap();
        assert!(matches!(second, RunOutcome::Busy));

        let report = completed(first.await.unwrap().unwrap());
        assert_eq!(report.collected, 2);
        assert_eq!(h.scraper.calls().len(), 1);
        let rows = h.sheet.rows();
        assert_eq!(rows[0][4], "https://twitter.com/user/status/1");
        assert_eq!(rows[1][4], "https://twitter.com/user/status/2");
    }

    #[test]
    fn test_trigger_display() {
        assert_eq!(Trigger::Scheduled.to_string(), "scheduled");
        assert_eq!(Trigger::Manual.to_string(), "manual");
    }
}
