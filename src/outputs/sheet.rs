//! Spreadsheet sink: one appended row per record.

use crate::error::{AppendFailure, SheetError};
use crate::models::TrendRecord;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// A remote table that accepts whole rows, one call per row.
#[async_trait]
pub trait SheetStore: Send + Sync {
    async fn append_row(&self, row: &[String]) -> Result<(), SheetError>;
}

pub struct SheetSink {
    store: Arc<dyn SheetStore>,
}

impl SheetSink {
    pub fn new(store: Arc<dyn SheetStore>) -> Self {
        Self { store }
    }

    /// Append every record in order, columns `[timestamp, platform, keyword,
    /// content, url]`. Stops at the first failing row; earlier rows stay.
    #[instrument(level = "info", skip_all, fields(rows = batch.len()))]
    pub async fn append(&self, batch: &[TrendRecord]) -> Result<usize, AppendFailure> {
        for (appended, record) in batch.iter().enumerate() {
            if let Err(source) = self.store.append_row(&record.sheet_row()).await {
                error!(appended, total = batch.len(), error = %source, "Sheet append failed");
                return Err(AppendFailure {
                    appended,
                    total: batch.len(),
                    source,
                });
            }
        }
        info!(appended = batch.len(), "Appended rows to sheet");
        Ok(batch.len())
    }
}
