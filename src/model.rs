// Listing and Review rows plus the immutable snapshot the reports run over

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Columns a listings source must provide, in export order
pub const LISTING_COLUMNS: [&str; 13] = [
    "id",
    "name",
    "host_id",
    "host_name",
    "neighbourhood_group",
    "neighbourhood",
    "room_type",
    "price",
    "minimum_nights",
    "number_of_reviews",
    "reviews_per_month",
    "availability_365",
    "number_of_reviews_ltm",
];

/// Columns a reviews source must provide
pub const REVIEW_COLUMNS: [&str; 2] = ["listing_id", "date"];

/// One rentable unit.
///
/// Nullable numerics stay `Option` so reports can treat them the way SQL
/// treats NULL: skipped by aggregates, never matching a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,

    #[serde(default)]
    pub name: String,

    pub host_id: i64,

    #[serde(default)]
    pub host_name: String,

    #[serde(default)]
    pub neighbourhood_group: Option<String>,

    pub neighbourhood: String,

    pub room_type: String,

    /// Nightly price. Accepts "85", "85.0" and "$1,200.00".
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<f64>,

    pub minimum_nights: i64,

    pub number_of_reviews: i64,

    #[serde(default)]
    pub reviews_per_month: Option<f64>,

    pub availability_365: i64,

    /// Reviews in the trailing twelve months
    pub number_of_reviews_ltm: i64,
}

impl Listing {
    /// Lookup used by group-by reports that take the dimension as a parameter
    pub fn neighbourhood_group(&self) -> Option<&str> {
        self.neighbourhood_group
            .as_deref()
            .filter(|g| !g.trim().is_empty())
    }
}

/// One dated review event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub listing_id: i64,
    pub date: NaiveDate,
}

/// Read-only snapshot taken once per render
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    pub listings: Vec<Listing>,
    pub reviews: Vec<Review>,
}

impl Dataset {
    pub fn new(listings: Vec<Listing>, reviews: Vec<Review>) -> Self {
        Self { listings, reviews }
    }
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(text) => parse_price(&text).map_err(serde::de::Error::custom),
    }
}

/// Parse a price cell, tolerating a currency symbol and thousands separators.
pub fn parse_price(text: &str) -> Result<Option<f64>, String> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ','))
        .collect();

    if cleaned.is_empty() {
        return Ok(None);
    }

    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid price '{}'", text))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(parse_price("85").unwrap(), Some(85.0));
        assert_eq!(parse_price("85.50").unwrap(), Some(85.5));
        assert_eq!(parse_price("$1,200.00").unwrap(), Some(1200.0));
        assert_eq!(parse_price("  ").unwrap(), None);
        assert!(parse_price("free").is_err());
    }

    #[test]
    fn test_blank_neighbourhood_group_is_none() {
        let mut listing = fixtures::listing(1, "Mitte", Some(40.0), 3);
        listing.neighbourhood_group = Some(" ".to_string());
        assert_eq!(listing.neighbourhood_group(), None);

        listing.neighbourhood_group = Some("Pankow".to_string());
        assert_eq!(listing.neighbourhood_group(), Some("Pankow"));
    }
}
