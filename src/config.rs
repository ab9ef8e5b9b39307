//! Audit configuration loaded from YAML, with environment overrides.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "nullwatch.yaml";
pub const DEFAULT_ROOT_URL: &str = "https://data.maryland.gov/resource/";
pub const DEFAULT_CATALOG_ID: &str = "t8k3-edvn";
pub const DEFAULT_PAGE_LIMIT: usize = 20_000;
pub const DEFAULT_COOLDOWN_MS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WORKERS: usize = 8;

/// Datasets whose name starts with this are spreadsheet exports that page forever.
pub const VEHICLE_CRASHES_PREFIX: &str = "Maryland Statewide Vehicle Crashes";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Pre-fetched schema document for a dataset too wide to send its field manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackSchemaEntry {
    pub api_id: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub root_url: String,
    pub catalog_id: String,
    pub page_limit: usize,
    pub cooldown_ms: u64,
    pub request_timeout_secs: u64,
    /// Size of the rayon pool used for tallying (and datasets, when parallel). 0 uses every core.
    pub workers: usize,
    /// Inspect several datasets at once instead of one after another.
    pub parallel_datasets: bool,
    pub output_dir: PathBuf,
    pub excluded_name_prefixes: Vec<String>,
    pub skipped_ids: Vec<String>,
    pub fallback_schemas: Vec<FallbackSchemaEntry>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            catalog_id: DEFAULT_CATALOG_ID.to_string(),
            page_limit: DEFAULT_PAGE_LIMIT,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            workers: DEFAULT_WORKERS,
            parallel_datasets: false,
            output_dir: PathBuf::from("reports"),
            excluded_name_prefixes: vec![VEHICLE_CRASHES_PREFIX.to_string()],
            skipped_ids: Vec::new(),
            fallback_schemas: vec![
                FallbackSchemaEntry {
                    api_id: "ed4q-f8tm".to_string(),
                    path: PathBuf::from("data/schemas/RealPropertyHiddenOwner_JSON.json"),
                },
                FallbackSchemaEntry {
                    api_id: "mux9-y6mb".to_string(),
                    path: PathBuf::from("data/schemas/MarylandCorrectionalEnterprises_JSON.json"),
                },
            ],
        }
    }
}

impl AuditConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Load the given file, or `nullwatch.yaml` when present, or defaults.
    /// Env overrides are applied and the result validated.
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("NULLWATCH_ROOT_URL") {
            self.root_url = url;
        }
        if let Ok(dir) = env::var("NULLWATCH_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(raw) = env::var("NULLWATCH_WORKERS") {
            match raw.parse::<usize>() {
                Ok(workers) => self.workers = workers,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid NULLWATCH_WORKERS"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_limit == 0 {
            return Err(ConfigError::Invalid("page_limit must be at least 1".to_string()));
        }
        if self.root_url.trim().is_empty() {
            return Err(ConfigError::Invalid("root_url must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_skipped(&self, api_id: &str) -> bool {
        self.skipped_ids.iter().any(|id| id == api_id)
    }
}
