// Error taxonomy for the listing insights catalog
//
// DataUnavailable blocks a render. EmptyResult and InvalidSelection are
// advisories: the caller shows a message and keeps rendering other sections.

use thiserror::Error;

/// Canonical result for the library.
pub type Result<T> = std::result::Result<T, InsightsError>;

#[derive(Debug, Error)]
pub enum InsightsError {
    /// Source unreachable, unreadable, or missing a required column
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A filter or selection produced zero rows
    #[error("no matching rows: {0}")]
    EmptyResult(String),

    /// A user-chosen parameter has no matching data
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
}

impl InsightsError {
    /// True for the non-fatal kinds the UI reports as a warning.
    pub fn is_advisory(&self) -> bool {
        matches!(
            self,
            InsightsError::EmptyResult(_) | InsightsError::InvalidSelection(_)
        )
    }
}

impl From<csv::Error> for InsightsError {
    fn from(e: csv::Error) -> Self {
        InsightsError::DataUnavailable(format!("csv: {}", e))
    }
}

impl From<rusqlite::Error> for InsightsError {
    fn from(e: rusqlite::Error) -> Self {
        InsightsError::DataUnavailable(format!("sqlite: {}", e))
    }
}

impl From<std::io::Error> for InsightsError {
    fn from(e: std::io::Error) -> Self {
        InsightsError::DataUnavailable(format!("io: {}", e))
    }
}
