// Report dispatch by name, shared by the CLI and the HTTP server

use crate::db;
use crate::error::{InsightsError, Result};
use crate::model::Dataset;
use crate::reports::{self, GroupDimension};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    RevenueByArea,
    CheapListings,
    RoomTypePrices,
    MostReviewed,
    CumulativeReviews,
    Categories,
    RecentNeighbourhoods,
    TopHosts,
    CityAverages,
    ListingCounts,
    LtmReviews,
}

impl ReportKind {
    pub const ALL: [ReportKind; 11] = [
        ReportKind::RevenueByArea,
        ReportKind::CheapListings,
        ReportKind::RoomTypePrices,
        ReportKind::MostReviewed,
        ReportKind::CumulativeReviews,
        ReportKind::Categories,
        ReportKind::RecentNeighbourhoods,
        ReportKind::TopHosts,
        ReportKind::CityAverages,
        ReportKind::ListingCounts,
        ReportKind::LtmReviews,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ReportKind::RevenueByArea => "revenue-by-area",
            ReportKind::CheapListings => "cheap-listings",
            ReportKind::RoomTypePrices => "room-type-prices",
            ReportKind::MostReviewed => "most-reviewed",
            ReportKind::CumulativeReviews => "cumulative-reviews",
            ReportKind::Categories => "categories",
            ReportKind::RecentNeighbourhoods => "recent-neighbourhoods",
            ReportKind::TopHosts => "top-hosts",
            ReportKind::CityAverages => "city-averages",
            ReportKind::ListingCounts => "listing-counts",
            ReportKind::LtmReviews => "ltm-reviews",
        }
    }

    pub fn has_sql_variant(&self) -> bool {
        matches!(
            self,
            ReportKind::RevenueByArea
                | ReportKind::CheapListings
                | ReportKind::RoomTypePrices
                | ReportKind::MostReviewed
                | ReportKind::CumulativeReviews
                | ReportKind::Categories
                | ReportKind::RecentNeighbourhoods
        )
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReportKind {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        ReportKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| InsightsError::InvalidSelection(format!("unknown report '{}'", s)))
    }
}

/// Optional user parameters; each report reads only what it needs
#[derive(Debug, Clone)]
pub struct ReportParams {
    pub since: NaiveDate,
    pub dimension: GroupDimension,
    /// Restricts the cumulative series to one listing
    pub listing_id: Option<i64>,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            since: reports::default_recent_cutoff(),
            dimension: GroupDimension::RoomType,
            listing_id: None,
        }
    }
}

fn to_value<T: Serialize>(rows: T) -> Result<Value> {
    serde_json::to_value(rows)
        .map_err(|e| InsightsError::DataUnavailable(format!("serialize report: {}", e)))
}

/// Run one report against an in-memory snapshot
pub fn run_report(kind: ReportKind, data: &Dataset, params: &ReportParams) -> Result<Value> {
    let listings = &data.listings;
    let reviews = &data.reviews;

    match kind {
        ReportKind::RevenueByArea => to_value(reports::revenue_by_area(listings)),
        ReportKind::CheapListings => to_value(reports::cheap_and_reviewed(listings)),
        ReportKind::RoomTypePrices => to_value(reports::price_by_room_type(listings)),
        ReportKind::MostReviewed => to_value(reports::most_reviewed(listings, reviews)),
        ReportKind::CumulativeReviews => {
            let points = reports::cumulative_reviews(reviews);
            match params.listing_id {
                Some(id) => to_value(reports::series_for_listing(&points, id)?),
                None => to_value(points),
            }
        }
        ReportKind::Categories => to_value(reports::categorize_listings(listings)),
        ReportKind::RecentNeighbourhoods => to_value(reports::recent_neighbourhood_reviews(
            listings,
            reviews,
            params.since,
        )),
        ReportKind::TopHosts => to_value(reports::top_hosts(listings)),
        ReportKind::CityAverages => to_value(reports::city_averages(listings)),
        ReportKind::ListingCounts => to_value(reports::listing_counts(listings)),
        ReportKind::LtmReviews => to_value(reports::ltm_review_means(listings, params.dimension)),
    }
}

/// Run the relational variant of a report
pub fn run_sql_report(kind: ReportKind, conn: &Connection, params: &ReportParams) -> Result<Value> {
    match kind {
        ReportKind::RevenueByArea => to_value(db::sql_revenue_by_area(conn)?),
        ReportKind::CheapListings => to_value(db::sql_cheap_and_reviewed(conn)?),
        ReportKind::RoomTypePrices => to_value(db::sql_price_by_room_type(conn)?),
        ReportKind::MostReviewed => to_value(db::sql_most_reviewed(conn)?),
        ReportKind::CumulativeReviews => {
            let points = db::sql_cumulative_reviews(conn)?;
            match params.listing_id {
                Some(id) => to_value(reports::series_for_listing(&points, id)?),
                None => to_value(points),
            }
        }
        ReportKind::Categories => to_value(db::sql_categorize_listings(conn)?),
        ReportKind::RecentNeighbourhoods => {
            to_value(db::sql_recent_neighbourhood_reviews(conn, params.since)?)
        }
        other => Err(InsightsError::InvalidSelection(format!(
            "report '{}' has no SQL variant",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{listing, review};

    fn dataset() -> Dataset {
        Dataset::new(
            vec![
                listing(1, "Mitte", Some(40.0), 150),
                listing(2, "Mitte", Some(80.0), 60),
            ],
            vec![review(1, "2025-01-02"), review(1, "2025-01-03")],
        )
    }

    #[test]
    fn test_names_round_trip() {
        for kind in ReportKind::ALL {
            assert_eq!(kind.name().parse::<ReportKind>().unwrap(), kind);
        }
        assert!("revenue".parse::<ReportKind>().unwrap_err().is_advisory());
    }

    #[test]
    fn test_every_report_runs_on_snapshot() {
        let data = dataset();
        let params = ReportParams::default();

        for kind in ReportKind::ALL {
            let value = run_report(kind, &data, &params).unwrap();
            assert!(value.is_array(), "{} did not produce rows", kind);
        }
    }

    #[test]
    fn test_revenue_json_shape() {
        let value = run_report(ReportKind::RevenueByArea, &dataset(), &ReportParams::default())
            .unwrap();

        assert_eq!(value[0]["neighbourhood"], "Mitte");
        assert_eq!(value[0]["total_revenue"], 10800.0);
    }

    #[test]
    fn test_cumulative_selection() {
        let data = dataset();
        let params = ReportParams {
            listing_id: Some(1),
            ..Default::default()
        };
        let value = run_report(ReportKind::CumulativeReviews, &data, &params).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);

        let params = ReportParams {
            listing_id: Some(2),
            ..Default::default()
        };
        let err = run_report(ReportKind::CumulativeReviews, &data, &params).unwrap_err();
        assert!(matches!(err, InsightsError::InvalidSelection(_)));
    }

    #[test]
    fn test_sql_variant_availability() {
        let mut conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        let data = dataset();
        db::insert_listings(&mut conn, &data.listings).unwrap();
        db::insert_reviews(&mut conn, &data.reviews).unwrap();
        let params = ReportParams::default();

        for kind in ReportKind::ALL {
            let result = run_sql_report(kind, &conn, &params);
            if kind.has_sql_variant() {
                assert_eq!(result.unwrap(), run_report(kind, &data, &params).unwrap());
            } else {
                assert!(result.unwrap_err().is_advisory());
            }
        }
    }
}
