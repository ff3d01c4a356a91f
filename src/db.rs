use crate::error::{InsightsError, Result};
use crate::model::{Dataset, Listing, Review};
use crate::reports::{
    CategorizedListing, CheapListing, CumulativeReviewPoint, ListingReviewCount,
    NeighbourhoodReviewCount, NeighbourhoodRevenue, RoomTypePrices, ValueCategory,
};
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// STORE
// ============================================================================

/// SQLite-backed listings store.
///
/// Holds only the path: every call opens a connection, runs, and drops it.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Acquire a connection for the duration of one query
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        if !self.path.exists() {
            return Err(InsightsError::DataUnavailable(format!(
                "database not found at {}",
                self.path.display()
            )));
        }

        let conn = Connection::open(&self.path)?;
        f(&conn)
    }

    pub fn snapshot(&self) -> Result<Dataset> {
        let listings = self.with_connection(get_all_listings)?;
        let reviews = self.with_connection(get_all_reviews)?;
        Ok(Dataset::new(listings, reviews))
    }

    pub fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.with_connection(|conn| execute(conn, sql))
    }
}

// ============================================================================
// SCHEMA & IMPORT
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL keeps readers unblocked during a re-import
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS listings (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            host_id INTEGER NOT NULL,
            host_name TEXT NOT NULL,
            neighbourhood_group TEXT,
            neighbourhood TEXT NOT NULL,
            room_type TEXT NOT NULL,
            price REAL,
            minimum_nights INTEGER NOT NULL,
            number_of_reviews INTEGER NOT NULL,
            number_of_reviews_ltm INTEGER NOT NULL,
            reviews_per_month REAL,
            availability_365 INTEGER NOT NULL,
            seq INTEGER NOT NULL
        )",
        [],
    )?;
    ensure_seq_column(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reviews (
            listing_id INTEGER NOT NULL,
            date TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reviews_listing ON reviews(listing_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reviews_date ON reviews(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_listings_seq ON listings(seq)",
        [],
    )?;

    Ok(())
}

/// Databases created before `seq` existed get it backfilled from rowid
fn ensure_seq_column(conn: &Connection) -> Result<()> {
    let has_seq = conn
        .prepare("SELECT 1 FROM pragma_table_info('listings') WHERE name = 'seq'")?
        .exists([])?;

    if !has_seq {
        conn.execute(
            "ALTER TABLE listings ADD COLUMN seq INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
        conn.execute("UPDATE listings SET seq = rowid", [])?;
        info!("listings.seq backfilled");
    }

    Ok(())
}

/// Upsert listings by id. Returns the number of rows written.
///
/// `seq` records file position so snapshots and grouped reports keep the
/// order rows were read in. Each import numbers after the previous one.
pub fn insert_listings(conn: &mut Connection, listings: &[Listing]) -> Result<usize> {
    let tx = conn.transaction()?;
    {
        let base: i64 =
            tx.query_row("SELECT COALESCE(MAX(seq), -1) + 1 FROM listings", [], |row| {
                row.get(0)
            })?;

        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO listings (
                id, name, host_id, host_name, neighbourhood_group, neighbourhood,
                room_type, price, minimum_nights, number_of_reviews,
                number_of_reviews_ltm, reviews_per_month, availability_365, seq
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )?;

        for (pos, l) in (base..).zip(listings) {
            stmt.execute(params![
                l.id,
                l.name,
                l.host_id,
                l.host_name,
                l.neighbourhood_group,
                l.neighbourhood,
                l.room_type,
                l.price,
                l.minimum_nights,
                l.number_of_reviews,
                l.number_of_reviews_ltm,
                l.reviews_per_month,
                l.availability_365,
                pos,
            ])?;
        }
    }
    tx.commit()?;

    info!(rows = listings.len(), "listings imported");
    Ok(listings.len())
}

/// Replace the reviews table with the given rows, preserving input order.
pub fn insert_reviews(conn: &mut Connection, reviews: &[Review]) -> Result<usize> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM reviews", [])?;
    {
        let mut stmt = tx.prepare("INSERT INTO reviews (listing_id, date) VALUES (?1, ?2)")?;
        for r in reviews {
            stmt.execute(params![r.listing_id, r.date.format("%Y-%m-%d").to_string()])?;
        }
    }
    tx.commit()?;

    info!(rows = reviews.len(), "reviews imported");
    Ok(reviews.len())
}

pub fn get_all_listings(conn: &Connection) -> Result<Vec<Listing>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, host_id, host_name, neighbourhood_group, neighbourhood,
                room_type, price, minimum_nights, number_of_reviews,
                number_of_reviews_ltm, reviews_per_month, availability_365
         FROM listings
         ORDER BY seq",
    )?;

    let listings = stmt
        .query_map([], |row| {
            Ok(Listing {
                id: row.get(0)?,
                name: row.get(1)?,
                host_id: row.get(2)?,
                host_name: row.get(3)?,
                neighbourhood_group: row.get(4)?,
                neighbourhood: row.get(5)?,
                room_type: row.get(6)?,
                price: row.get(7)?,
                minimum_nights: row.get(8)?,
                number_of_reviews: row.get(9)?,
                number_of_reviews_ltm: row.get(10)?,
                reviews_per_month: row.get(11)?,
                availability_365: row.get(12)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(listings)
}

pub fn get_all_reviews(conn: &Connection) -> Result<Vec<Review>> {
    let mut stmt = conn.prepare("SELECT listing_id, date FROM reviews ORDER BY rowid")?;

    let reviews = stmt
        .query_map([], |row| {
            let date: String = row.get(1)?;
            Ok(Review {
                listing_id: row.get(0)?,
                date: parse_date(&date, 1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(reviews)
}

/// Row counts of (listings, reviews)
pub fn verify_count(conn: &Connection) -> Result<(i64, i64)> {
    let listings: i64 = conn.query_row("SELECT COUNT(*) FROM listings", [], |row| row.get(0))?;
    let reviews: i64 = conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;

    Ok((listings, reviews))
}

fn parse_date(text: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

// ============================================================================
// GENERIC QUERY EXECUTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

/// Untyped tabular result of an arbitrary SELECT
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

pub fn execute(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let cell = match row.get_ref(i)? {
                ValueRef::Null => CellValue::Null,
                ValueRef::Integer(v) => CellValue::Integer(v),
                ValueRef::Real(v) => CellValue::Real(v),
                ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
                ValueRef::Blob(bytes) => CellValue::Text(format!("<{} bytes>", bytes.len())),
            };
            cells.push(cell);
        }
        rows.push(cells);
    }

    debug!(rows = rows.len(), "query executed");
    Ok(QueryResult { columns, rows })
}

// ============================================================================
// RELATIONAL REPORT VARIANTS
// ============================================================================

pub const REVENUE_BY_AREA_SQL: &str = "
SELECT
    neighbourhood,
    COALESCE(SUM(price * number_of_reviews), 0.0) AS total_revenue
FROM listings
GROUP BY neighbourhood
ORDER BY total_revenue DESC, neighbourhood ASC";

pub const CHEAP_AND_REVIEWED_SQL: &str = "
SELECT name, neighbourhood, price
FROM listings
WHERE price < 50 AND number_of_reviews > 10
ORDER BY price ASC, seq ASC";

pub const PRICE_BY_ROOM_TYPE_SQL: &str = "
SELECT
    room_type,
    MIN(price) AS min_price,
    AVG(price) AS avg_price,
    MAX(price) AS max_price
FROM listings
GROUP BY room_type
ORDER BY MIN(seq)";

pub const MOST_REVIEWED_SQL: &str = "
SELECT l.id, l.name, COUNT(r.date) AS total_reviews
FROM listings l
JOIN reviews r ON l.id = r.listing_id
GROUP BY l.id, l.name
ORDER BY total_reviews DESC, l.id ASC
LIMIT 10";

pub const CUMULATIVE_REVIEWS_SQL: &str = "
SELECT
    listing_id,
    date,
    strftime('%Y-%m', date) AS month,
    COUNT(*) OVER (
        PARTITION BY listing_id
        ORDER BY date, rowid
        ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW
    ) AS cumulative_reviews
FROM reviews
ORDER BY listing_id, date, rowid";

pub const CATEGORIZE_SQL: &str = "
SELECT
    name,
    neighbourhood,
    price,
    number_of_reviews,
    CASE
        WHEN price < 50 AND number_of_reviews > 100 THEN 'Top Budget Pick'
        WHEN price BETWEEN 50 AND 100 AND number_of_reviews > 50 THEN 'Best Mid-Range'
        ELSE 'Niche or Premium'
    END AS category
FROM listings
ORDER BY seq";

/// `?1` is the cutoff date as `YYYY-MM-DD`
pub const RECENT_NEIGHBOURHOOD_REVIEWS_SQL: &str = "
WITH recent_reviews AS (
    SELECT listing_id, date
    FROM reviews
    WHERE date >= ?1
)
SELECT l.neighbourhood, COUNT(*) AS review_count
FROM recent_reviews r
JOIN listings l ON r.listing_id = l.id
GROUP BY l.neighbourhood
ORDER BY review_count DESC, l.neighbourhood ASC
LIMIT 10";

pub fn sql_revenue_by_area(conn: &Connection) -> Result<Vec<NeighbourhoodRevenue>> {
    let mut stmt = conn.prepare(REVENUE_BY_AREA_SQL)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(NeighbourhoodRevenue {
                neighbourhood: row.get(0)?,
                total_revenue: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sql_cheap_and_reviewed(conn: &Connection) -> Result<Vec<CheapListing>> {
    let mut stmt = conn.prepare(CHEAP_AND_REVIEWED_SQL)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CheapListing {
                name: row.get(0)?,
                neighbourhood: row.get(1)?,
                price: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sql_price_by_room_type(conn: &Connection) -> Result<Vec<RoomTypePrices>> {
    let mut stmt = conn.prepare(PRICE_BY_ROOM_TYPE_SQL)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(RoomTypePrices {
                room_type: row.get(0)?,
                min_price: row.get(1)?,
                avg_price: row.get(2)?,
                max_price: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sql_most_reviewed(conn: &Connection) -> Result<Vec<ListingReviewCount>> {
    let mut stmt = conn.prepare(MOST_REVIEWED_SQL)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ListingReviewCount {
                listing_id: row.get(0)?,
                name: row.get(1)?,
                total_reviews: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sql_cumulative_reviews(conn: &Connection) -> Result<Vec<CumulativeReviewPoint>> {
    let mut stmt = conn.prepare(CUMULATIVE_REVIEWS_SQL)?;
    let rows = stmt
        .query_map([], |row| {
            let date: String = row.get(1)?;
            Ok(CumulativeReviewPoint {
                listing_id: row.get(0)?,
                date: parse_date(&date, 1)?,
                month: row.get(2)?,
                cumulative_reviews: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sql_categorize_listings(conn: &Connection) -> Result<Vec<CategorizedListing>> {
    let mut stmt = conn.prepare(CATEGORIZE_SQL)?;
    let rows = stmt
        .query_map([], |row| {
            let label: String = row.get(4)?;
            let category = ValueCategory::from_label(&label).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    format!("unknown category '{}'", label).into(),
                )
            })?;
            Ok(CategorizedListing {
                name: row.get(0)?,
                neighbourhood: row.get(1)?,
                price: row.get(2)?,
                number_of_reviews: row.get(3)?,
                category,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn sql_recent_neighbourhood_reviews(
    conn: &Connection,
    since: NaiveDate,
) -> Result<Vec<NeighbourhoodReviewCount>> {
    let mut stmt = conn.prepare(RECENT_NEIGHBOURHOOD_REVIEWS_SQL)?;
    let rows = stmt
        .query_map([since.format("%Y-%m-%d").to_string()], |row| {
            Ok(NeighbourhoodReviewCount {
                neighbourhood: row.get(0)?,
                review_count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
