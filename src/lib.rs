//! Data quality auditor for Socrata-style open data portals.
//!
//! For every dataset in a portal's catalog the auditor discovers the field
//! schema, pages through all records, counts missing values per field and
//! classifies the dataset as clean, having nulls, or problematic.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod fleet;
pub mod inspect;
pub mod parallel;
pub mod report;
pub mod source;

pub use catalog::CatalogEntry;
pub use config::AuditConfig;
pub use fleet::{FleetRunner, RunSummary};
pub use inspect::{DatasetInspector, DatasetOutcome};
