//! Catalog of datasets, built from the portal's data freshness report.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AuditConfig;
use crate::source::{PortalClient, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub api_identifier: String,
    pub provider: String,
}

impl CatalogEntry {
    pub fn new(
        name: impl Into<String>,
        api_identifier: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            api_identifier: api_identifier.into(),
            provider: provider.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to retrieve catalog: {0}")]
    Transport(#[from] TransportError),
    #[error("catalog response was not a JSON array of records")]
    Shape,
}

#[derive(Debug, Deserialize)]
struct FreshnessRecord {
    #[serde(default)]
    dataset_name: Option<String>,
    #[serde(default)]
    data_provided_by: Option<String>,
    #[serde(default)]
    link: Option<String>,
}

pub fn catalog_url(config: &AuditConfig) -> String {
    format!(
        "{}{}.json?$limit={}",
        config.root_url, config.catalog_id, config.page_limit
    )
}

/// Fetch the freshness report and turn it into catalog entries.
pub fn fetch_catalog(
    client: &dyn PortalClient,
    config: &AuditConfig,
) -> Result<Vec<CatalogEntry>, CatalogError> {
    let url = catalog_url(config);
    tracing::info!(%url, "retrieving dataset catalog");
    let page = client.fetch(&url)?;
    let entries = parse_catalog(&page.body)?;
    tracing::info!(datasets = entries.len(), "catalog retrieved");
    Ok(entries)
}

/// Parse freshness report records. Later duplicates of a dataset name replace
/// earlier ones in place.
pub fn parse_catalog(body: &Value) -> Result<Vec<CatalogEntry>, CatalogError> {
    let records = body.as_array().ok_or(CatalogError::Shape)?;

    let mut entries: Vec<CatalogEntry> = Vec::with_capacity(records.len());
    let mut position_by_name: HashMap<String, usize> = HashMap::new();

    for (index, raw) in records.iter().enumerate() {
        let record: FreshnessRecord = match serde_json::from_value(raw.clone()) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping unreadable catalog record");
                continue;
            }
        };
        let (Some(name), Some(link)) = (record.dataset_name, record.link) else {
            tracing::warn!(index, "skipping catalog record without dataset_name or link");
            continue;
        };
        let entry = CatalogEntry {
            api_identifier: api_identifier_from_link(&link),
            provider: record.data_provided_by.unwrap_or_default(),
            name,
        };
        match position_by_name.get(&entry.name) {
            Some(&position) => entries[position] = entry,
            None => {
                position_by_name.insert(entry.name.clone(), entries.len());
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

/// Basename of the dataset link, e.g. `https://data.maryland.gov/d/abcd-1234` -> `abcd-1234`.
pub fn api_identifier_from_link(link: &str) -> String {
    link.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// ASCII letters, digits and spaces only; used for names written into reports.
pub fn display_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// ASCII letters and digits only; used for report file names.
pub fn file_stem(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}
