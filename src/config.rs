//! Configuration System
//!
//! Layered configuration for the search backend, context sizing and logging.
//! Sources merge in order: built-in defaults, the global config file, the
//! project's `config/` directory, then `ANCHORVIEW__SECTION__KEY` environment
//! variables.

use crate::dataset::META_FIELDS;
use crate::error::ContextError;
use crate::interval::{Ladder, LOOKUP_OFFSETS_DAYS};
use crate::logging::LoggingConfig;
use crate::sort::SortDirection;
use serde::{Deserialize, Serialize};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorviewConfig {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the OpenSearch / Elasticsearch cluster
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Index or index pattern to read from
    #[serde(default)]
    pub index: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:9200".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            index: String::new(),
            username: None,
            password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Context sizing and ordering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Rows fetched on each side of the anchor initially
    #[serde(default = "default_size")]
    pub default_size: usize,

    /// Rows added by one "load more"
    #[serde(default = "default_step")]
    pub step: usize,

    /// Upper bound on rows per side
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Tie-breaker candidates, first sortable one wins
    #[serde(default = "default_tie_breaker_fields")]
    pub tie_breaker_fields: Vec<String>,

    /// Interval ladder, in days from the anchor
    #[serde(default = "default_lookup_offsets_days")]
    pub lookup_offsets_days: Vec<u64>,

    #[serde(default = "default_sort")]
    pub default_sort: SortDirection,
}

fn default_size() -> usize {
    5
}

fn default_step() -> usize {
    5
}

fn default_max_size() -> usize {
    10_000
}

fn default_tie_breaker_fields() -> Vec<String> {
    vec![META_FIELDS[0].to_string()]
}

fn default_lookup_offsets_days() -> Vec<u64> {
    LOOKUP_OFFSETS_DAYS.to_vec()
}

fn default_sort() -> SortDirection {
    SortDirection::Desc
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_size: default_size(),
            step: default_step(),
            max_size: default_max_size(),
            tie_breaker_fields: default_tie_breaker_fields(),
            lookup_offsets_days: default_lookup_offsets_days(),
            default_sort: default_sort(),
        }
    }
}

impl ContextConfig {
    pub fn ladder(&self) -> Result<Ladder, ContextError> {
        Ladder::from_days(&self.lookup_offsets_days)
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.step == 0 {
            errors.push("step must be greater than 0".to_string());
        }
        if self.max_size == 0 {
            errors.push("max_size must be greater than 0".to_string());
        }
        if self.default_size > self.max_size {
            errors.push(format!(
                "default_size {} exceeds max_size {}",
                self.default_size, self.max_size
            ));
        }
        if self.tie_breaker_fields.iter().all(|f| f.trim().is_empty()) {
            errors.push("tie_breaker_fields must name at least one field".to_string());
        }
        if let Err(e) = self.ladder() {
            errors.push(e.to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.index.trim().is_empty() {
            errors.push("index cannot be empty".to_string());
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            errors.push(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.password.is_some() && self.username.is_none() {
            errors.push("password given without username".to_string());
        }
        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be greater than 0".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Search(String),
    Context(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Search(msg) => write!(f, "Search: {}", msg),
            ValidationError::Context(msg) => write!(f, "Context: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl AnchorviewConfig {
    /// Validate the entire configuration, collecting every problem.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if let Err(msgs) = self.search.validate() {
            errors.extend(msgs.into_iter().map(ValidationError::Search));
        }
        if let Err(msgs) = self.context.validate() {
            errors.extend(msgs.into_iter().map(ValidationError::Context));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one error.
    pub fn ensure_valid(&self) -> Result<(), ContextError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ContextError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })
    }
}
