use crate::db::SqliteStore;
use crate::error::{InsightsError, Result};
use crate::reports::{default_recent_cutoff, SAMPLE_SIZE};
use crate::source::DataSource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings shared by the CLI, dashboard and server.
///
/// Read from `<config_dir>/listing-insights/config.toml` when present.
/// Every field has a default so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Listings CSV used when no database is configured
    pub listings_csv: PathBuf,

    pub reviews_csv: Option<PathBuf>,

    /// When set, snapshots come from this SQLite file instead of the CSVs
    pub database: Option<PathBuf>,

    pub server_addr: String,

    /// First day counted by the recent-reviews report
    pub recent_since: NaiveDate,

    /// Listing ids offered by the cumulative-series selector
    pub sample_size: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            listings_csv: PathBuf::from("listings.csv"),
            reviews_csv: None,
            database: None,
            server_addr: String::from("127.0.0.1:3000"),
            recent_since: default_recent_cutoff(),
            sample_size: SAMPLE_SIZE,
        }
    }
}

impl InsightsConfig {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("listing-insights").join("config.toml"))
    }

    /// Load from an explicit path, or the default location, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            InsightsError::DataUnavailable(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            InsightsError::DataUnavailable(msg) => {
                InsightsError::DataUnavailable(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;

        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| InsightsError::DataUnavailable(format!("invalid config: {}", e)))
    }

    /// The database wins over the CSV files when both are configured
    pub fn data_source(&self) -> DataSource {
        match &self.database {
            Some(path) => DataSource::Sqlite(SqliteStore::new(path)),
            None => DataSource::Csv {
                listings: self.listings_csv.clone(),
                reviews: self.reviews_csv.clone(),
            },
        }
    }
}
