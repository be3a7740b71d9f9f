//! Destinations for a collected batch.
//!
//! # Submodules
//!
//! - [`sheet`]: Appends one spreadsheet row per record ([`sheet::SheetSink`])
//! - [`google_sheets`]: Google Sheets client behind the [`sheet::SheetStore`] trait
//! - [`email`]: Renders the plaintext digest and mails it ([`email::NotificationSink`])
//!
//! Both sinks receive the same ordered batch. Neither keeps state between
//! runs; the spreadsheet is append-only from this service's point of view.

pub mod email;
pub mod google_sheets;
pub mod sheet;
