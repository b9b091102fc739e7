//! Configuration for the Weir engine
//!
//! This module contains the configuration type and its loading functionality.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Page size of business data list queries that do not declare `maxResults`
    #[serde(default = "default_business_data_max_results")]
    pub business_data_max_results: usize,

    /// Package segment holding generated business object implementations
    #[serde(default = "default_dao_server_package")]
    pub dao_server_package: String,

    /// Suffix of generated business object implementations
    #[serde(default = "default_dao_implementation_suffix")]
    pub dao_implementation_suffix: String,

    /// Maximum number of data instances returned by an unbounded hierarchy lookup
    #[serde(default)]
    pub max_data_results: Option<usize>,
}

fn default_business_data_max_results() -> usize {
    100
}

fn default_dao_server_package() -> String {
    "server".to_string()
}

fn default_dao_implementation_suffix() -> String {
    "Impl".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            business_data_max_results: default_business_data_max_results(),
            dao_server_package: default_dao_server_package(),
            dao_implementation_suffix: default_dao_implementation_suffix(),
            max_data_results: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from defaults overridden by `WEIR_*` environment variables
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides looked up by variable name
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup("WEIR_BUSINESS_DATA_MAX_RESULTS") {
            match value.parse::<usize>() {
                Ok(max) if max > 0 => self.business_data_max_results = max,
                _ => warn!("Invalid WEIR_BUSINESS_DATA_MAX_RESULTS value: {}", value),
            }
        }

        if let Some(value) = lookup("WEIR_DAO_SERVER_PACKAGE") {
            if value.is_empty() || value.contains('.') {
                warn!("Invalid WEIR_DAO_SERVER_PACKAGE value: {}", value);
            } else {
                self.dao_server_package = value;
            }
        }

        if let Some(value) = lookup("WEIR_DAO_IMPLEMENTATION_SUFFIX") {
            self.dao_implementation_suffix = value;
        }

        if let Some(value) = lookup("WEIR_MAX_DATA_RESULTS") {
            if let Ok(max) = value.parse::<usize>() {
                self.max_data_results = Some(max);
            } else {
                warn!("Invalid WEIR_MAX_DATA_RESULTS value: {}", value);
            }
        }

        self
    }
}
