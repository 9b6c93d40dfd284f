//! `grants.toml` loading.
//!
//! Every section is optional:
//!
//! ```toml
//! [database]
//! backend = "sqlite"
//! connection_string = "grants.db"
//!
//! [allocation]
//! tax_year = 2024
//! grants_allocation_percentage = "2.5"
//! total_federal_revenue = 430000000000
//! consumption_tax_rate = "0.05"
//! projection_years = 10
//!
//! [logging]
//! level = "info"
//! file = "grants.log"
//! ```
//!
//! Allocation values override whatever the store (or the built-in
//! defaults) supply for the chosen tax year. Command-line flags override
//! the file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use grants_core::calculations::AllocationConfig;
use grants_core::db::DbConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_FILENAME: &str = "grants.toml";
pub const DEFAULT_DATABASE: &str = "grants.db";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration in '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Unusable `[logging]` settings, such as a bad filter or log file.
    #[error("{0}")]
    Logging(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GrantsConfig {
    pub database: DbConfig,
    pub allocation: AllocationOverrides,
    pub logging: LoggingConfig,
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self {
            database: DbConfig {
                connection_string: DEFAULT_DATABASE.to_string(),
                ..DbConfig::default()
            },
            allocation: AllocationOverrides::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Per-field replacements for an [`AllocationConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocationOverrides {
    /// Tax year whose stored configuration is loaded.
    pub tax_year: Option<i32>,
    pub grants_allocation_percentage: Option<Decimal>,
    pub total_federal_revenue: Option<Decimal>,
    pub consumption_tax_rate: Option<Decimal>,
    pub projection_years: Option<u32>,
}

impl AllocationOverrides {
    /// `config` with every set field replaced.
    pub fn apply(
        &self,
        mut config: AllocationConfig,
    ) -> AllocationConfig {
        if let Some(value) = self.grants_allocation_percentage {
            config.grants_allocation_percentage = value;
        }
        if let Some(value) = self.total_federal_revenue {
            config.total_federal_revenue = value;
        }
        if let Some(value) = self.consumption_tax_rate {
            config.consumption_tax_rate = value;
        }
        if let Some(value) = self.projection_years {
            config.projection_years = value;
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// A bare level or any `EnvFilter` directive.
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub backend: Option<String>,
    pub connection_string: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl GrantsConfig {
    pub fn apply_cli(
        &mut self,
        overrides: CliOverrides,
    ) {
        if let Some(backend) = overrides.backend {
            self.database.backend = backend;
        }
        if let Some(connection_string) = overrides.connection_string {
            self.database.connection_string = connection_string;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(file) = overrides.log_file {
            self.logging.file = Some(file);
        }
    }
}

pub fn parse_config(
    raw: &str,
    path: &Path,
) -> Result<GrantsConfig, ConfigError> {
    toml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the configuration.
///
/// An explicit `path` must exist. Without one, `grants.toml` in the working
/// directory is read when present and the defaults are used otherwise.
pub fn load_config(path: Option<&Path>) -> Result<GrantsConfig, ConfigError> {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILENAME));

    if !config_path.is_file() {
        if path.is_some() {
            return Err(ConfigError::NotFound(config_path));
        }
        return Ok(GrantsConfig::default());
    }

    let raw = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    parse_config(&raw, &config_path)
}
