// Listing Insights - Core Library
// Exposes the data source adapters and report catalog for the CLI, dashboard and API server

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod reports;
pub mod source;

// Re-export commonly used types
pub use catalog::{run_report, run_sql_report, ReportKind, ReportParams};
pub use config::InsightsConfig;
pub use db::{
    execute, get_all_listings, get_all_reviews, insert_listings, insert_reviews,
    setup_database, verify_count, CellValue, QueryResult, SqliteStore,
};
pub use error::{InsightsError, Result};
pub use model::{Dataset, Listing, Review};
pub use reports::{GroupDimension, PriceQuery, PriceSuggestion, ValueCategory};
pub use source::{
    export_listings_csv, load_listings_csv, load_reviews_csv, read_listings, read_reviews,
    DataSource,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
