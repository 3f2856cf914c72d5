//! # Reconciliation Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     ETAL_API_URL=https://stock.example.com                             │
//! │     ETAL_MAX_CONCURRENT_DATES=8                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/reconcile/reconcile.toml (Linux)                         │
//! │     ~/Library/Application Support/com.etal.reconcile/reconcile.toml    │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # reconcile.toml
//! [api]
//! base_url = "https://stock.example.com"
//! timeout_secs = 30
//! date_format = "%Y-%m-%d"
//!
//! [api.endpoints]
//! morning_stock = "api/stock/matin"
//! evening_stock = "api/stock/soir"
//! transfers = "api/transferts"
//! outlets = "api/points-vente"
//!
//! [fetch]
//! max_concurrent_dates = 4
//! max_retries = 2
//! initial_backoff_ms = 200
//! max_backoff_secs = 5
//! max_period_days = 366
//!
//! [cache]
//! outlets_ttl_secs = 300
//!
//! [export]
//! date_format = "%d/%m/%Y"
//! sheet_name = "Ventes theoriques"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use etal_core::{validate_date_format, DEFAULT_MAX_PERIOD_DAYS};
use etal_source::ClientConfig;

use crate::error::{ReconError, ReconResult};

/// Config file name inside the project config directory.
pub const CONFIG_FILE_NAME: &str = "reconcile.toml";

// =============================================================================
// Fetch Settings
// =============================================================================

/// Per-date fetch behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Dates fetched at the same time. Each date issues three requests.
    #[serde(default = "default_max_concurrent_dates")]
    pub max_concurrent_dates: usize,

    /// Retries per request after the first attempt (retryable errors only).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff interval (milliseconds).
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling (seconds).
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Longest period accepted in one request.
    #[serde(default = "default_max_period_days")]
    pub max_period_days: i64,
}

fn default_max_concurrent_dates() -> usize {
    4
}
fn default_max_retries() -> u32 {
    2
}
fn default_initial_backoff() -> u64 {
    200
}
fn default_max_backoff() -> u64 {
    5
}
fn default_max_period_days() -> i64 {
    DEFAULT_MAX_PERIOD_DAYS
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            max_concurrent_dates: default_max_concurrent_dates(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_period_days: default_max_period_days(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// How long the active-outlet list stays fresh (seconds).
    #[serde(default = "default_outlets_ttl")]
    pub outlets_ttl_secs: u64,
}

fn default_outlets_ttl() -> u64 {
    300
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            outlets_ttl_secs: default_outlets_ttl(),
        }
    }
}

impl CacheSettings {
    pub fn outlets_ttl(&self) -> Duration {
        Duration::from_secs(self.outlets_ttl_secs)
    }
}

// =============================================================================
// Export Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// chrono format for the Date column.
    #[serde(default = "default_export_date_format")]
    pub date_format: String,

    /// Worksheet name in XLSX exports (31 characters max).
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
}

fn default_export_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_sheet_name() -> String {
    "Ventes theoriques".to_string()
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            date_format: default_export_date_format(),
            sheet_name: default_sheet_name(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete reconciliation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconConfig {
    /// Data API client settings.
    #[serde(default)]
    pub api: ClientConfig,

    #[serde(default)]
    pub fetch: FetchSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub export: ExportSettings,
}

impl ReconConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (reconcile.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ReconResult<Self> {
        Self::load_with(config_path, |key| std::env::var(key).ok())
    }

    /// [`ReconConfig::load`] with overrides read from `lookup` instead of
    /// the process environment.
    pub fn load_with<F>(config_path: Option<PathBuf>, lookup: F) -> ReconResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading reconciliation config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(lookup);
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load reconciliation config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ReconResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ReconError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ReconError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ReconError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Reconciliation config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ReconResult<()> {
        self.api
            .validate()
            .map_err(|e| ReconError::InvalidConfig(e.to_string()))?;

        if self.fetch.max_concurrent_dates == 0 {
            return Err(ReconError::InvalidConfig(
                "max_concurrent_dates must be greater than 0".into(),
            ));
        }

        if self.fetch.max_period_days < 1 {
            return Err(ReconError::InvalidConfig(
                "max_period_days must be at least 1".into(),
            ));
        }

        if self.fetch.initial_backoff_ms == 0 {
            return Err(ReconError::InvalidConfig(
                "initial_backoff_ms must be greater than 0".into(),
            ));
        }

        validate_date_format("export.date_format", &self.export.date_format)
            .map_err(|e| ReconError::InvalidConfig(e.to_string()))?;

        let sheet = self.export.sheet_name.trim();
        if sheet.is_empty()
            || sheet.chars().count() > 31
            || sheet.contains(['[', ']', ':', '*', '?', '/', '\\'])
        {
            return Err(ReconError::InvalidConfig(format!(
                "invalid sheet_name '{}': 1-31 characters, none of []:*?/\\",
                self.export.sheet_name
            )));
        }

        Ok(())
    }

    /// Applies overrides from any key lookup (the environment in production).
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ETAL_API_URL") {
            debug!(url = %url, "Overriding data API URL from environment");
            self.api.base_url = url;
        }

        if let Some(token) = lookup("ETAL_API_TOKEN") {
            self.api.token = Some(token).filter(|t| !t.is_empty());
        }

        if let Some(v) = lookup("ETAL_API_TIMEOUT_SECS") {
            match v.parse() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => warn!(value = %v, "Ignoring invalid ETAL_API_TIMEOUT_SECS"),
            }
        }

        if let Some(v) = lookup("ETAL_MAX_CONCURRENT_DATES") {
            match v.parse() {
                Ok(n) => {
                    debug!(max_concurrent_dates = n, "Overriding fetch concurrency from environment");
                    self.fetch.max_concurrent_dates = n;
                }
                Err(_) => warn!(value = %v, "Ignoring invalid ETAL_MAX_CONCURRENT_DATES"),
            }
        }

        if let Some(v) = lookup("ETAL_MAX_RETRIES") {
            match v.parse() {
                Ok(n) => self.fetch.max_retries = n,
                Err(_) => warn!(value = %v, "Ignoring invalid ETAL_MAX_RETRIES"),
            }
        }

        if let Some(v) = lookup("ETAL_MAX_PERIOD_DAYS") {
            match v.parse() {
                Ok(n) => self.fetch.max_period_days = n,
                Err(_) => warn!(value = %v, "Ignoring invalid ETAL_MAX_PERIOD_DAYS"),
            }
        }

        if let Some(v) = lookup("ETAL_OUTLETS_TTL_SECS") {
            match v.parse() {
                Ok(n) => self.cache.outlets_ttl_secs = n,
                Err(_) => warn!(value = %v, "Ignoring invalid ETAL_OUTLETS_TTL_SECS"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "etal", "reconcile")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }
}
