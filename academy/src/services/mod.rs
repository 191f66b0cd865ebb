//! Module for core business logic services.
//!
//! This module encapsulates services that perform specific business operations
//! and orchestrate interactions between different parts of the application,
//! such as resolving profiles, reading import spreadsheets and submitting
//! account batches.

pub mod bulk_import;
pub mod profile_fetcher;
pub mod progress;
pub mod spreadsheet;

pub use bulk_import::{ImportError, ImportFailure, ImportPipeline, ImportResult, ImportState};
pub use profile_fetcher::ProfileFetcher;
pub use spreadsheet::ImportRecord;
