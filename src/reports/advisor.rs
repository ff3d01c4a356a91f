// Market advisor: nightly price suggestion and top hosts by estimated revenue
//
// Both heuristics are deliberately simple and unclamped.

use super::mean;
use crate::error::{InsightsError, Result};
use crate::model::Listing;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Added to the mean price for every bedroom beyond the first
pub const BEDROOM_PRICE_INCREMENT: f64 = 10.0;

const SAMPLE_ROWS: usize = 10;
const CHART_ROWS: usize = 20;

// ============================================================================
// PRICE SUGGESTION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuery {
    pub neighbourhood: String,
    pub room_type: String,
    pub bedrooms: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleListing {
    pub name: String,
    pub price: Option<f64>,
    pub minimum_nights: i64,
    pub number_of_reviews: i64,
    pub availability_365: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityPoint {
    pub listing_id: i64,
    pub availability_365: i64,
    pub number_of_reviews: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSuggestion {
    pub query: PriceQuery,
    pub suggested_price: f64,
    pub avg_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    /// Listings matching neighbourhood and room type
    pub similar_listings: usize,
    pub sample: Vec<SampleListing>,
    pub reviews_vs_availability: Vec<AvailabilityPoint>,
}

/// `mean price of similar listings + (bedrooms - 1) × 10`, plus the market
/// overview of those listings.
pub fn suggest_price(listings: &[Listing], query: &PriceQuery) -> Result<PriceSuggestion> {
    let similar: Vec<&Listing> = listings
        .iter()
        .filter(|l| l.neighbourhood == query.neighbourhood && l.room_type == query.room_type)
        .collect();

    if similar.is_empty() {
        return Err(InsightsError::EmptyResult(format!(
            "no {} listings in {}",
            query.room_type, query.neighbourhood
        )));
    }

    let prices: Vec<f64> = similar.iter().filter_map(|l| l.price).collect();
    let (Some(avg_price), Some(min_price), Some(max_price)) = (
        mean(&prices),
        prices.iter().copied().reduce(f64::min),
        prices.iter().copied().reduce(f64::max),
    ) else {
        return Err(InsightsError::EmptyResult(format!(
            "no priced {} listings in {}",
            query.room_type, query.neighbourhood
        )));
    };

    let suggested_price = avg_price + (f64::from(query.bedrooms) - 1.0) * BEDROOM_PRICE_INCREMENT;

    let sample = similar
        .iter()
        .take(SAMPLE_ROWS)
        .map(|l| SampleListing {
            name: l.name.clone(),
            price: l.price,
            minimum_nights: l.minimum_nights,
            number_of_reviews: l.number_of_reviews,
            availability_365: l.availability_365,
        })
        .collect();

    let reviews_vs_availability = similar
        .iter()
        .take(CHART_ROWS)
        .map(|l| AvailabilityPoint {
            listing_id: l.id,
            availability_365: l.availability_365,
            number_of_reviews: l.number_of_reviews,
        })
        .collect();

    debug!(
        neighbourhood = %query.neighbourhood,
        room_type = %query.room_type,
        similar = similar.len(),
        suggested_price,
        "suggest_price"
    );

    Ok(PriceSuggestion {
        query: query.clone(),
        suggested_price,
        avg_price,
        min_price,
        max_price,
        similar_listings: similar.len(),
        sample,
        reviews_vs_availability,
    })
}

/// Distinct neighbourhoods, sorted
pub fn neighbourhood_options(listings: &[Listing]) -> Vec<String> {
    listings
        .iter()
        .map(|l| l.neighbourhood.as_str())
        .filter(|n| !n.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct room types in first-appearance order
pub fn room_type_options(listings: &[Listing]) -> Vec<String> {
    let mut options: Vec<String> = Vec::new();
    for listing in listings {
        if !listing.room_type.is_empty() && !options.contains(&listing.room_type) {
            options.push(listing.room_type.clone());
        }
    }
    options
}

// ============================================================================
// TOP HOSTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostRevenue {
    pub neighbourhood: String,
    pub host_name: String,
    pub host_id: i64,
    pub total_listings: usize,
    pub total_revenue: f64,
}

/// `price × reviews_per_month × 12`, or `None` when either input is missing
pub fn estimated_annual_revenue(listing: &Listing) -> Option<f64> {
    Some(listing.price? * listing.reviews_per_month? * 12.0)
}

/// Highest-earning host in every neighbourhood, richest first.
///
/// Revenue ties inside a neighbourhood go to the lower host id.
pub fn top_hosts(listings: &[Listing]) -> Vec<HostRevenue> {
    let mut by_host: BTreeMap<(&str, i64), HostRevenue> = BTreeMap::new();

    for listing in listings {
        let Some(revenue) = estimated_annual_revenue(listing) else {
            continue;
        };

        let entry = by_host
            .entry((listing.neighbourhood.as_str(), listing.host_id))
            .or_insert_with(|| HostRevenue {
                neighbourhood: listing.neighbourhood.clone(),
                host_name: String::new(),
                host_id: listing.host_id,
                total_listings: 0,
                total_revenue: 0.0,
            });

        if entry.host_name.is_empty() {
            entry.host_name = listing.host_name.clone();
        }
        entry.total_listings += 1;
        entry.total_revenue += revenue;
    }

    let mut best: BTreeMap<&str, HostRevenue> = BTreeMap::new();
    for ((neighbourhood, _), host) in by_host {
        match best.get(neighbourhood) {
            Some(current) if current.total_revenue >= host.total_revenue => {}
            _ => {
                best.insert(neighbourhood, host);
            }
        }
    }

    let mut result: Vec<HostRevenue> = best.into_values().collect();
    result.sort_by(|a, b| b.total_revenue.total_cmp(&a.total_revenue));

    debug!(rows = result.len(), "top_hosts");
    result
}
