//! Field schema resolution: the response manifest first, then pre-fetched
//! documents for datasets too wide for the portal to send one.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::config::FallbackSchemaEntry;
use crate::inspect::Problem;

pub const SCHEMA_UNRESOLVED_MESSAGE: &str = "too many fields, no manifest and no fallback";

static FIELD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_]+").expect("field token pattern is valid"));

/// Ordered, duplicate-free field names of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    names: Vec<String>,
}

impl FieldSet {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(Into::into)
            .filter(|name| seen.insert(name.clone()))
            .collect();
        Self { names }
    }

    /// Parse a manifest such as `["name", "amount", "geo_point"]`, keeping
    /// alphanumeric/underscore runs in the order given.
    pub fn from_manifest(manifest: &str) -> Self {
        Self::from_names(FIELD_TOKEN.find_iter(manifest).map(|m| m.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema document '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse schema document '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("schema document has no meta.view.columns list")]
    MissingColumns,
}

/// Columns of a schema document, split on the presence of a `flags` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentColumns {
    pub visible: Vec<String>,
    pub hidden: Vec<String>,
}

pub fn document_columns(document: &Value) -> Result<DocumentColumns, SchemaError> {
    let columns = document
        .pointer("/meta/view/columns")
        .and_then(Value::as_array)
        .ok_or(SchemaError::MissingColumns)?;

    let mut split = DocumentColumns::default();
    for column in columns {
        let Some(name) = column.get("fieldName").and_then(Value::as_str) else {
            continue;
        };
        if column.get("flags").is_some() {
            split.hidden.push(name.to_string());
        } else {
            split.visible.push(name.to_string());
        }
    }
    Ok(split)
}

pub fn load_document_columns(path: &Path) -> Result<DocumentColumns, SchemaError> {
    let raw = fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&raw).map_err(|source| SchemaError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    document_columns(&document)
}

/// Read-only table of API identifier -> visible fields, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct FallbackSchemas {
    by_id: HashMap<String, FieldSet>,
}

impl FallbackSchemas {
    /// Load every configured document. A document that cannot be read is
    /// left out, so its dataset surfaces as unresolved instead of aborting the run.
    pub fn load(entries: &[FallbackSchemaEntry]) -> Self {
        let mut schemas = Self::default();
        for entry in entries {
            match load_document_columns(&entry.path) {
                Ok(columns) => {
                    tracing::debug!(
                        api_id = %entry.api_id,
                        visible = columns.visible.len(),
                        hidden = columns.hidden.len(),
                        "loaded fallback schema"
                    );
                    schemas.insert(&entry.api_id, FieldSet::from_names(columns.visible));
                }
                Err(err) => {
                    tracing::warn!(api_id = %entry.api_id, error = %err, "fallback schema unavailable");
                }
            }
        }
        schemas
    }

    pub fn insert(&mut self, api_id: &str, fields: FieldSet) {
        self.by_id.insert(api_id.to_string(), fields);
    }

    pub fn get(&self, api_id: &str) -> Option<&FieldSet> {
        self.by_id.get(api_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaResolution {
    Resolved(FieldSet),
    Problem(Problem),
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver<'a> {
    fallbacks: &'a FallbackSchemas,
}

impl<'a> SchemaResolver<'a> {
    pub fn new(fallbacks: &'a FallbackSchemas) -> Self {
        Self { fallbacks }
    }

    /// Resolve from the first page's manifest header; a missing header marks the
    /// dataset manifest-suppressed and only a fallback document can rescue it.
    pub fn resolve(
        &self,
        api_id: &str,
        fields_header: Option<&str>,
        request_url: &str,
    ) -> SchemaResolution {
        if let Some(manifest) = fields_header {
            return SchemaResolution::Resolved(FieldSet::from_manifest(manifest));
        }
        match self.fallbacks.get(api_id) {
            Some(fields) => {
                tracing::info!(%api_id, fields = fields.len(), "manifest suppressed, using fallback schema");
                SchemaResolution::Resolved(fields.clone())
            }
            None => SchemaResolution::Problem(Problem::new(
                SCHEMA_UNRESOLVED_MESSAGE,
                Some(request_url.to_string()),
            )),
        }
    }
}
