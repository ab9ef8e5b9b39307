//! Runs the inspector over a whole catalog, isolating per-dataset failures.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::CatalogEntry;
use crate::config::AuditConfig;
use crate::inspect::{DatasetInspector, DatasetOutcome, FallbackSchemas, OutcomeKind, Problem};
use crate::parallel::WorkerPool;
use crate::report::{DatasetReport, ReportSink};
use crate::source::PortalClient;

pub const UNEXPECTED_FAILURE_MESSAGE: &str = "unexpected failure while processing dataset";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub datasets_listed: usize,
    pub datasets_processed: usize,
    pub datasets_skipped: usize,
    pub clean_count: usize,
    pub has_nulls_count: usize,
    pub problematic_count: usize,
    #[serde(serialize_with = "serialize_seconds")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record(&mut self, kind: &OutcomeKind) {
        self.datasets_processed += 1;
        match kind {
            OutcomeKind::Clean => self.clean_count += 1,
            OutcomeKind::HasNulls => self.has_nulls_count += 1,
            OutcomeKind::Problematic(_) => self.problematic_count += 1,
        }
    }
}

fn serialize_seconds<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

pub struct FleetRunner<'a> {
    config: &'a AuditConfig,
    inspector: DatasetInspector<'a>,
}

impl<'a> FleetRunner<'a> {
    pub fn new(
        client: &'a dyn PortalClient,
        config: &'a AuditConfig,
        fallbacks: &'a FallbackSchemas,
    ) -> Self {
        Self {
            config,
            inspector: DatasetInspector::new(client, config, fallbacks),
        }
    }

    /// Inspect every entry, emitting each outcome as it completes, then the summary.
    pub fn run(&self, entries: &[CatalogEntry], sink: &dyn ReportSink) -> RunSummary {
        let started = Instant::now();
        let pool = WorkerPool::with_workers(self.config.workers);

        let outcomes: Vec<Option<OutcomeKind>> = pool.install(|| {
            if self.config.parallel_datasets {
                entries
                    .par_iter()
                    .map(|entry| self.process(entry, sink))
                    .collect()
            } else {
                entries.iter().map(|entry| self.process(entry, sink)).collect()
            }
        });

        let mut summary = RunSummary {
            datasets_listed: entries.len(),
            ..RunSummary::default()
        };
        for outcome in &outcomes {
            match outcome {
                Some(kind) => summary.record(kind),
                None => summary.datasets_skipped += 1,
            }
        }
        summary.elapsed = started.elapsed();

        tracing::info!(
            listed = summary.datasets_listed,
            processed = summary.datasets_processed,
            skipped = summary.datasets_skipped,
            clean = summary.clean_count,
            has_nulls = summary.has_nulls_count,
            problematic = summary.problematic_count,
            minutes = summary.elapsed.as_secs_f64() / 60.0,
            "run finished"
        );
        if let Err(err) = sink.run_finished(&summary) {
            tracing::error!(error = %err, "failed to write run summary");
        }
        summary
    }

    /// `None` when the dataset is on the intentional skip list.
    fn process(&self, entry: &CatalogEntry, sink: &dyn ReportSink) -> Option<OutcomeKind> {
        if self.config.is_skipped(&entry.api_identifier) {
            tracing::info!(dataset = %entry.name, api_id = %entry.api_identifier, "dataset skipped intentionally");
            return None;
        }

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.inspector.inspect(entry)))
            .unwrap_or_else(|_| {
                tracing::error!(dataset = %entry.name, api_id = %entry.api_identifier, "inspection panicked");
                DatasetOutcome::problematic(
                    entry,
                    Problem::new(UNEXPECTED_FAILURE_MESSAGE, None),
                    started.elapsed(),
                )
            });

        if let Err(err) = sink.dataset_finished(&DatasetReport::from(&outcome)) {
            tracing::error!(dataset = %entry.name, error = %err, "failed to write dataset report");
        }
        Some(outcome.kind)
    }
}
