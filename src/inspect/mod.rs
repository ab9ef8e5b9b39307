//! Dataset inspection engine: schema resolution, paging and null tallying.

pub mod inspector;
pub mod pager;
pub mod schema;
pub mod tally;

pub use inspector::{percent_null, DatasetInspector, DatasetOutcome, OutcomeKind};
pub use pager::{PageCursor, PageResult, PageStep, Pager};
pub use schema::{FallbackSchemas, FieldSet, SchemaResolution, SchemaResolver};
pub use tally::{tally, tally_parallel, FieldNulls, NullTally};

use crate::source::TransportError;

/// Why a dataset could not be inspected, and the request involved if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub message: String,
    pub resource: Option<String>,
}

impl Problem {
    pub fn new(message: impl Into<String>, resource: Option<String>) -> Self {
        Self {
            message: message.into(),
            resource,
        }
    }
}

impl From<TransportError> for Problem {
    fn from(err: TransportError) -> Self {
        Self {
            message: err.reason,
            resource: Some(err.url),
        }
    }
}
