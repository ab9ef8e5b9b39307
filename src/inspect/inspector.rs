//! Inspection of a single dataset, driven as an explicit state machine:
//! `Start -> ResolvingSchema -> Paging* -> Problematic | Completed`.

use std::time::{Duration, Instant};

use crate::catalog::CatalogEntry;
use crate::config::AuditConfig;
use crate::inspect::pager::{PageCursor, PageResult, PageStep, Pager};
use crate::inspect::schema::{FallbackSchemas, FieldSet, SchemaResolution, SchemaResolver};
use crate::inspect::tally::{tally_parallel, NullTally};
use crate::inspect::Problem;
use crate::source::PortalClient;

pub const EMPTY_RESPONSE_MESSAGE: &str = "empty response body";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeKind {
    Clean,
    HasNulls,
    Problematic(Problem),
}

impl OutcomeKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::HasNulls => "has_nulls",
            Self::Problematic(_) => "problematic",
        }
    }
}

/// Terminal result of inspecting one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOutcome {
    pub entry: CatalogEntry,
    pub kind: OutcomeKind,
    pub total_records: usize,
    /// `None` when the schema was never resolved.
    pub field_count: Option<usize>,
    /// Present for clean and has-nulls outcomes.
    pub null_tally: Option<NullTally>,
    pub elapsed: Duration,
}

impl DatasetOutcome {
    pub fn problematic(entry: &CatalogEntry, problem: Problem, elapsed: Duration) -> Self {
        Self {
            entry: entry.clone(),
            kind: OutcomeKind::Problematic(problem),
            total_records: 0,
            field_count: None,
            null_tally: None,
            elapsed,
        }
    }

    pub fn null_total(&self) -> u64 {
        self.null_tally.as_ref().map_or(0, NullTally::total)
    }

    pub fn percent_null(&self) -> f64 {
        percent_null(self.null_total(), self.total_records, self.field_count)
    }

    pub fn problem(&self) -> Option<&Problem> {
        match &self.kind {
            OutcomeKind::Problematic(problem) => Some(problem),
            _ => None,
        }
    }
}

/// Share of all values (records x fields) that are null, in percent.
/// Zero when the field count is unknown or either factor is zero.
pub fn percent_null(null_total: u64, total_records: usize, field_count: Option<usize>) -> f64 {
    let Some(field_count) = field_count else {
        return 0.0;
    };
    let cells = total_records as f64 * field_count as f64;
    if cells == 0.0 {
        return 0.0;
    }
    100.0 * null_total as f64 / cells
}

#[derive(Debug)]
enum InspectState {
    Start,
    ResolvingSchema,
    Paging(FieldSet),
    Problematic(Problem),
    Completed,
}

pub struct DatasetInspector<'a> {
    pager: Pager<'a>,
    resolver: SchemaResolver<'a>,
}

impl<'a> DatasetInspector<'a> {
    pub fn new(
        client: &'a dyn PortalClient,
        config: &'a AuditConfig,
        fallbacks: &'a FallbackSchemas,
    ) -> Self {
        Self {
            pager: Pager::new(client, config),
            resolver: SchemaResolver::new(fallbacks),
        }
    }

    pub fn inspect(&self, entry: &CatalogEntry) -> DatasetOutcome {
        let started = Instant::now();
        let api_id = entry.api_identifier.as_str();
        let mut cursor = PageCursor::default();
        let mut counts = NullTally::default();
        let mut field_count = None;
        let mut state = InspectState::Start;

        let kind = loop {
            state = match state {
                InspectState::Start => match self.pager.excluded_export(&entry.name) {
                    Some(message) => InspectState::Problematic(Problem::new(message, None)),
                    None => InspectState::ResolvingSchema,
                },
                InspectState::ResolvingSchema => match self.pager.next_page(api_id, &cursor) {
                    PageResult::TransportError(err) => InspectState::Problematic(err.into()),
                    PageResult::Empty { url, fields_header } => {
                        match self.resolver.resolve(api_id, fields_header.as_deref(), &url) {
                            SchemaResolution::Resolved(fields) => {
                                field_count = Some(fields.len());
                                InspectState::Problematic(Problem::new(
                                    EMPTY_RESPONSE_MESSAGE,
                                    Some(url),
                                ))
                            }
                            SchemaResolution::Problem(problem) => InspectState::Problematic(problem),
                        }
                    }
                    PageResult::Records {
                        url,
                        batch,
                        fields_header,
                    } => match self.resolver.resolve(api_id, fields_header.as_deref(), &url) {
                        SchemaResolution::Resolved(fields) => {
                            field_count = Some(fields.len());
                            counts = NullTally::zeroed(&fields);
                            self.absorb(fields, &batch, &mut cursor, &mut counts)
                        }
                        SchemaResolution::Problem(problem) => InspectState::Problematic(problem),
                    },
                },
                InspectState::Paging(fields) => match self.pager.next_page(api_id, &cursor) {
                    PageResult::TransportError(err) => InspectState::Problematic(err.into()),
                    // Only reached after a full page: the record count was an exact multiple.
                    PageResult::Empty { url, .. } => {
                        tracing::debug!(%api_id, %url, "trailing empty page ends pagination");
                        InspectState::Completed
                    }
                    PageResult::Records { batch, .. } => {
                        self.absorb(fields, &batch, &mut cursor, &mut counts)
                    }
                },
                InspectState::Problematic(problem) => break OutcomeKind::Problematic(problem),
                InspectState::Completed if counts.total() == 0 => break OutcomeKind::Clean,
                InspectState::Completed => break OutcomeKind::HasNulls,
            };
        };

        let null_tally = match kind {
            OutcomeKind::Problematic(_) => None,
            OutcomeKind::Clean | OutcomeKind::HasNulls => Some(counts),
        };
        let outcome = DatasetOutcome {
            entry: entry.clone(),
            kind,
            total_records: cursor.records_seen,
            field_count,
            null_tally,
            elapsed: started.elapsed(),
        };
        log_outcome(&outcome);
        outcome
    }

    fn absorb(
        &self,
        fields: FieldSet,
        batch: &[serde_json::Value],
        cursor: &mut PageCursor,
        counts: &mut NullTally,
    ) -> InspectState {
        counts.merge(&tally_parallel(&fields, batch));
        match self.pager.advance(cursor, batch.len()) {
            PageStep::Continue => InspectState::Paging(fields),
            PageStep::Finished => InspectState::Completed,
        }
    }
}

fn log_outcome(outcome: &DatasetOutcome) {
    let dataset = outcome.entry.name.as_str();
    match &outcome.kind {
        OutcomeKind::Problematic(problem) => tracing::warn!(
            %dataset,
            api_id = %outcome.entry.api_identifier,
            message = %problem.message,
            resource = problem.resource.as_deref().unwrap_or(""),
            "dataset is problematic"
        ),
        kind => tracing::info!(
            %dataset,
            outcome = kind.label(),
            records = outcome.total_records,
            fields = outcome.field_count.unwrap_or(0),
            nulls = outcome.null_total(),
            elapsed_secs = outcome.elapsed.as_secs_f64(),
            "dataset inspected"
        ),
    }
}
