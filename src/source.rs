// Data source adapter - CSV files or a SQLite store → Dataset snapshot
//
// No logic lives here beyond column checks; every report takes the
// snapshot this module produces.

use crate::db::SqliteStore;
use crate::error::{InsightsError, Result};
use crate::model::{Dataset, Listing, Review, LISTING_COLUMNS, REVIEW_COLUMNS};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// DATA SOURCE
// ============================================================================

/// Where a snapshot comes from
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Flat files loaded wholesale. No reviews file means an empty reviews table.
    Csv {
        listings: PathBuf,
        reviews: Option<PathBuf>,
    },

    /// Relational store, one connection per query
    Sqlite(SqliteStore),
}

impl DataSource {
    /// Take a fresh snapshot. Called once per render or request.
    pub fn snapshot(&self) -> Result<Dataset> {
        let dataset = match self {
            DataSource::Csv { listings, reviews } => {
                let listings = load_listings_csv(listings)?;
                let reviews = match reviews {
                    Some(path) => load_reviews_csv(path)?,
                    None => Vec::new(),
                };
                Dataset::new(listings, reviews)
            }
            DataSource::Sqlite(store) => store.snapshot()?,
        };

        info!(
            listings = dataset.listings.len(),
            reviews = dataset.reviews.len(),
            "snapshot loaded"
        );
        Ok(dataset)
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::Csv { listings, .. } => format!("csv:{}", listings.display()),
            DataSource::Sqlite(store) => format!("sqlite:{}", store.path().display()),
        }
    }
}

// ============================================================================
// CSV LOADING
// ============================================================================

pub fn load_listings_csv(path: &Path) -> Result<Vec<Listing>> {
    let file = open(path)?;
    read_listings(file)
}

pub fn load_reviews_csv(path: &Path) -> Result<Vec<Review>> {
    let file = open(path)?;
    read_reviews(file)
}

pub fn read_listings<R: Read>(reader: R) -> Result<Vec<Listing>> {
    read_rows(reader, &LISTING_COLUMNS, "listings")
}

pub fn read_reviews<R: Read>(reader: R) -> Result<Vec<Review>> {
    read_rows(reader, &REVIEW_COLUMNS, "reviews")
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        InsightsError::DataUnavailable(format!("cannot open {}: {}", path.display(), e))
    })
}

fn read_rows<T, R>(reader: R, required: &[&str], table: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned,
    R: Read,
{
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(InsightsError::DataUnavailable(format!(
                "{} is missing required column '{}'",
                table, column
            )));
        }
    }

    let mut rows = Vec::new();
    for (index, result) in rdr.deserialize().enumerate() {
        let row: T = result.map_err(|e| {
            InsightsError::DataUnavailable(format!("{} row {}: {}", table, index + 1, e))
        })?;
        rows.push(row);
    }

    debug!(table, rows = rows.len(), "csv parsed");
    Ok(rows)
}

// ============================================================================
// EXPORT
// ============================================================================

/// Serialize the whole listings snapshot to CSV text, header included.
///
/// Only the modelled columns in `LISTING_COLUMNS` are written. Extra columns
/// in the source file (coordinates, licence and so on) are dropped at load.
pub fn export_listings_csv(listings: &[Listing]) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(LISTING_COLUMNS)?;
    for listing in listings {
        wtr.serialize(listing)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| InsightsError::DataUnavailable(format!("csv export: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| InsightsError::DataUnavailable(format!("csv export: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::listing;

    const LISTINGS_CSV: &str = "\
id,name,host_id,host_name,neighbourhood_group,neighbourhood,latitude,longitude,room_type,price,minimum_nights,number_of_reviews,last_review,reviews_per_month,calculated_host_listings_count,availability_365,number_of_reviews_ltm,license
3176,Fabulous Flat,3718,Britta,Pankow,Prenzlauer Berg Südwest,52.535,13.417,Entire home/apt,83,63,148,2023-06-01,0.84,1,0,5,
7071,BrightRoom,17391,Bright,,Helmholtzplatz,52.543,13.415,Private room,\"$1,200.00\",2,295,2024-01-20,1.81,1,153,14,
9991,Unpriced,33852,Philipp,Pankow,Prenzlauer Berg Nordwest,52.533,13.411,Private room,,5,0,,,1,0,0,
";

    #[test]
    fn test_read_listings_ignores_extra_columns() {
        let listings = read_listings(LISTINGS_CSV.as_bytes()).unwrap();

        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].neighbourhood, "Prenzlauer Berg Südwest");
        assert_eq!(listings[0].price, Some(83.0));
        assert_eq!(listings[1].price, Some(1200.0));
        assert_eq!(listings[1].neighbourhood_group, None);
        assert_eq!(listings[2].price, None);
        assert_eq!(listings[2].reviews_per_month, None);
    }

    #[test]
    fn test_missing_column_is_data_unavailable() {
        let csv_text = "id,name,neighbourhood\n1,Flat,Mitte\n";
        let err = read_listings(csv_text.as_bytes()).unwrap_err();

        match err {
            InsightsError::DataUnavailable(msg) => assert!(msg.contains("host_id")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_data_unavailable() {
        let source = DataSource::Csv {
            listings: PathBuf::from("/nonexistent/listings.csv"),
            reviews: None,
        };
        let err = source.snapshot().unwrap_err();
        assert!(matches!(err, InsightsError::DataUnavailable(_)));
    }

    #[test]
    fn test_read_reviews() {
        let csv_text = "listing_id,id,date,reviewer_id\n3176,4283,2009-06-20,21475\n3176,134722,2009-11-07,1347\n";
        let reviews = read_reviews(csv_text.as_bytes()).unwrap();

        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].date.to_string(), "2009-11-07");
    }

    #[test]
    fn test_export_round_trip_keeps_rows_and_columns() {
        let original = read_listings(LISTINGS_CSV.as_bytes()).unwrap();

        let exported = export_listings_csv(&original).unwrap();
        let header = exported.lines().next().unwrap();
        assert_eq!(header.split(',').collect::<Vec<_>>(), LISTING_COLUMNS.to_vec());
        assert!(!header.contains("latitude"));
        assert!(!header.contains("license"));

        let reloaded = read_listings(exported.as_bytes()).unwrap();
        assert_eq!(reloaded.len(), original.len());
        assert_eq!(reloaded, original);
    }

    #[test]
    fn test_export_empty_snapshot_has_header_only() {
        let exported = export_listings_csv(&[]).unwrap();
        assert_eq!(exported.lines().count(), 1);
        assert!(read_listings(exported.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_csv_source_without_reviews() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("listings.csv");
        let text = export_listings_csv(&[listing(1, "Mitte", Some(40.0), 150)]).unwrap();
        std::fs::write(&path, text).unwrap();

        let source = DataSource::Csv {
            listings: path,
            reviews: None,
        };
        let dataset = source.snapshot().unwrap();

        assert_eq!(dataset.listings.len(), 1);
        assert!(dataset.reviews.is_empty());
    }
}
