//! Result emission: per-dataset reports and the end-of-run summary.

pub mod csv_writer;

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::catalog::{display_name, file_stem};
use crate::fleet::RunSummary;
use crate::inspect::{DatasetOutcome, NullTally};

pub use csv_writer::CsvReportWriter;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("report io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("report csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("report lock poisoned")]
    Poisoned,
}

/// Flat view of one outcome, as handed to report sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetReport {
    pub dataset_name: String,
    pub outcome_kind: &'static str,
    pub total_records: usize,
    pub field_count: Option<usize>,
    pub null_tally: Option<NullTally>,
    pub null_total: u64,
    pub percent_null: f64,
    pub elapsed_seconds: f64,
    pub provider: String,
    pub problem_message: Option<String>,
    pub problem_resource: Option<String>,
    /// Stem of the per-field detail file, set only when the dataset has nulls.
    pub detail_file_stem: Option<String>,
}

/// `{name}_{api_id}`: the name alone is not unique once punctuation is stripped.
pub fn detail_file_stem(dataset_name: &str, api_identifier: &str) -> String {
    let api_identifier: String = api_identifier
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    format!("{}_{api_identifier}", file_stem(dataset_name))
}

impl From<&DatasetOutcome> for DatasetReport {
    fn from(outcome: &DatasetOutcome) -> Self {
        let problem = outcome.problem();
        Self {
            dataset_name: display_name(&outcome.entry.name),
            outcome_kind: outcome.kind.label(),
            total_records: outcome.total_records,
            field_count: outcome.field_count,
            null_tally: outcome.null_tally.clone(),
            null_total: outcome.null_total(),
            percent_null: outcome.percent_null(),
            elapsed_seconds: outcome.elapsed.as_secs_f64(),
            provider: display_name(&outcome.entry.provider),
            problem_message: problem.map(|p| p.message.clone()),
            problem_resource: problem.and_then(|p| p.resource.clone()),
            detail_file_stem: (outcome.null_total() > 0)
                .then(|| detail_file_stem(&outcome.entry.name, &outcome.entry.api_identifier)),
        }
    }
}

/// Destination for inspection results. Called from dataset workers concurrently.
pub trait ReportSink: Send + Sync {
    fn dataset_finished(&self, report: &DatasetReport) -> Result<(), ReportError>;
    fn run_finished(&self, summary: &RunSummary) -> Result<(), ReportError>;
}

/// Keeps everything in memory; used for single-dataset runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<DatasetReport>>,
    summary: Mutex<Option<RunSummary>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<DatasetReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn summary(&self) -> Option<RunSummary> {
        self.summary
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReportSink for MemorySink {
    fn dataset_finished(&self, report: &DatasetReport) -> Result<(), ReportError> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn run_finished(&self, summary: &RunSummary) -> Result<(), ReportError> {
        *self.summary.lock().unwrap_or_else(PoisonError::into_inner) = Some(summary.clone());
        Ok(())
    }
}
