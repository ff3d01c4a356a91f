// Market reports over listings: revenue proxy, cheap picks, price spread, value labels

use super::mean;
use crate::model::Listing;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// REVENUE BY AREA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighbourhoodRevenue {
    pub neighbourhood: String,
    pub total_revenue: f64,
}

/// Lifetime revenue proxy per neighbourhood: sum of `price × number_of_reviews`.
///
/// Unpriced listings contribute nothing but their neighbourhood still appears.
pub fn revenue_by_area(listings: &[Listing]) -> Vec<NeighbourhoodRevenue> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for listing in listings {
        let entry = totals.entry(listing.neighbourhood.as_str()).or_insert(0.0);
        if let Some(price) = listing.price {
            *entry += price * listing.number_of_reviews as f64;
        }
    }

    let mut result: Vec<NeighbourhoodRevenue> = totals
        .into_iter()
        .map(|(neighbourhood, total_revenue)| NeighbourhoodRevenue {
            neighbourhood: neighbourhood.to_string(),
            total_revenue,
        })
        .collect();

    result.sort_by(|a, b| {
        b.total_revenue
            .total_cmp(&a.total_revenue)
            .then_with(|| a.neighbourhood.cmp(&b.neighbourhood))
    });

    debug!(rows = result.len(), "revenue_by_area");
    result
}

// ============================================================================
// CHEAP AND REVIEWED
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheapListing {
    pub name: String,
    pub neighbourhood: String,
    pub price: f64,
}

pub const CHEAP_PRICE_BELOW: f64 = 50.0;
pub const CHEAP_MIN_REVIEWS_ABOVE: i64 = 10;

/// Listings under 50 with more than 10 reviews, cheapest first
pub fn cheap_and_reviewed(listings: &[Listing]) -> Vec<CheapListing> {
    let mut result: Vec<CheapListing> = listings
        .iter()
        .filter(|l| l.number_of_reviews > CHEAP_MIN_REVIEWS_ABOVE)
        .filter_map(|l| match l.price {
            Some(price) if price < CHEAP_PRICE_BELOW => Some(CheapListing {
                name: l.name.clone(),
                neighbourhood: l.neighbourhood.clone(),
                price,
            }),
            _ => None,
        })
        .collect();

    result.sort_by(|a, b| a.price.total_cmp(&b.price));
    result
}

// ============================================================================
// PRICE BY ROOM TYPE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomTypePrices {
    pub room_type: String,
    pub min_price: Option<f64>,
    pub avg_price: Option<f64>,
    pub max_price: Option<f64>,
}

/// Min / mean / max price per room type, room types in first-appearance order
pub fn price_by_room_type(listings: &[Listing]) -> Vec<RoomTypePrices> {
    let mut order: Vec<&str> = Vec::new();
    let mut prices: HashMap<&str, Vec<f64>> = HashMap::new();

    for listing in listings {
        let room_type = listing.room_type.as_str();
        let bucket = prices.entry(room_type).or_insert_with(|| {
            order.push(room_type);
            Vec::new()
        });
        if let Some(price) = listing.price {
            bucket.push(price);
        }
    }

    order
        .into_iter()
        .map(|room_type| {
            let values = prices.get(room_type).map(Vec::as_slice).unwrap_or(&[]);
            RoomTypePrices {
                room_type: room_type.to_string(),
                min_price: values.iter().copied().reduce(f64::min),
                avg_price: mean(values),
                max_price: values.iter().copied().reduce(f64::max),
            }
        })
        .collect()
}

// ============================================================================
// VALUE CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueCategory {
    #[serde(rename = "Top Budget Pick")]
    TopBudgetPick,

    #[serde(rename = "Best Mid-Range")]
    BestMidRange,

    #[serde(rename = "Niche or Premium")]
    NicheOrPremium,
}

impl ValueCategory {
    /// First matching rule wins; a missing price matches neither priced rule.
    pub fn classify(price: Option<f64>, number_of_reviews: i64) -> Self {
        match price {
            Some(p) if p < 50.0 && number_of_reviews > 100 => ValueCategory::TopBudgetPick,
            Some(p) if (50.0..=100.0).contains(&p) && number_of_reviews > 50 => {
                ValueCategory::BestMidRange
            }
            _ => ValueCategory::NicheOrPremium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueCategory::TopBudgetPick => "Top Budget Pick",
            ValueCategory::BestMidRange => "Best Mid-Range",
            ValueCategory::NicheOrPremium => "Niche or Premium",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Top Budget Pick" => Some(ValueCategory::TopBudgetPick),
            "Best Mid-Range" => Some(ValueCategory::BestMidRange),
            "Niche or Premium" => Some(ValueCategory::NicheOrPremium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizedListing {
    pub name: String,
    pub neighbourhood: String,
    pub price: Option<f64>,
    pub number_of_reviews: i64,
    pub category: ValueCategory,
}

pub fn categorize_listings(listings: &[Listing]) -> Vec<CategorizedListing> {
    listings
        .iter()
        .map(|l| CategorizedListing {
            name: l.name.clone(),
            neighbourhood: l.neighbourhood.clone(),
            price: l.price,
            number_of_reviews: l.number_of_reviews,
            category: ValueCategory::classify(l.price, l.number_of_reviews),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::listing;

    fn mitte_pair() -> Vec<Listing> {
        vec![
            listing(1, "Mitte", Some(40.0), 150),
            listing(2, "Mitte", Some(80.0), 60),
        ]
    }

    #[test]
    fn test_revenue_scenario_mitte() {
        let revenue = revenue_by_area(&mitte_pair());

        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[0].neighbourhood, "Mitte");
        assert_eq!(revenue[0].total_revenue, 10800.0);
    }

    #[test]
    fn test_revenue_sorted_descending() {
        let mut listings = mitte_pair();
        listings.push(listing(3, "Kreuzberg", Some(300.0), 100));
        listings.push(listing(4, "Wedding", None, 20));

        let revenue = revenue_by_area(&listings);
        let names: Vec<&str> = revenue.iter().map(|r| r.neighbourhood.as_str()).collect();

        assert_eq!(names, vec!["Kreuzberg", "Mitte", "Wedding"]);
        assert_eq!(revenue[2].total_revenue, 0.0);
    }

    #[test]
    fn test_cheap_and_reviewed_filters_and_sorts() {
        let listings = vec![
            listing(1, "Mitte", Some(45.0), 11),
            listing(2, "Mitte", Some(30.0), 50),
            listing(3, "Mitte", Some(50.0), 99), // not strictly below 50
            listing(4, "Mitte", Some(20.0), 10), // not more than 10 reviews
            listing(5, "Mitte", None, 99),
        ];

        let cheap = cheap_and_reviewed(&listings);
        let prices: Vec<f64> = cheap.iter().map(|c| c.price).collect();

        assert_eq!(prices, vec![30.0, 45.0]);
        assert_eq!(cheap[0].name, "Listing 2");
    }

    #[test]
    fn test_room_type_min_le_mean_le_max() {
        let mut listings = vec![
            listing(1, "Mitte", Some(40.0), 1),
            listing(2, "Mitte", Some(95.5), 1),
            listing(3, "Mitte", Some(210.0), 1),
            listing(4, "Mitte", Some(33.0), 1),
            listing(5, "Mitte", Some(70.0), 1),
        ];
        listings[3].room_type = "Shared room".to_string();
        listings[4].room_type = "Shared room".to_string();

        let stats = price_by_room_type(&listings);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].room_type, "Entire home/apt");

        for group in &stats {
            let min = group.min_price.unwrap();
            let avg = group.avg_price.unwrap();
            let max = group.max_price.unwrap();
            assert!(min <= avg && avg <= max, "{:?}", group);
        }

        assert_eq!(stats[1].min_price, Some(33.0));
        assert_eq!(stats[1].max_price, Some(70.0));
        assert_eq!(stats[1].avg_price, Some(51.5));
    }

    #[test]
    fn test_room_type_without_prices() {
        let stats = price_by_room_type(&[listing(1, "Mitte", None, 1)]);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].min_price, None);
        assert_eq!(stats[0].avg_price, None);
        assert_eq!(stats[0].max_price, None);
    }

    #[test]
    fn test_category_scenario_mitte() {
        let categories = categorize_listings(&mitte_pair());

        assert_eq!(categories[0].category, ValueCategory::TopBudgetPick);
        assert_eq!(categories[1].category, ValueCategory::BestMidRange);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(ValueCategory::classify(Some(49.99), 101), ValueCategory::TopBudgetPick);
        assert_eq!(ValueCategory::classify(Some(49.99), 100), ValueCategory::NicheOrPremium);
        // Cheap with 51..=100 reviews misses the budget rule but is not mid-range priced
        assert_eq!(ValueCategory::classify(Some(40.0), 80), ValueCategory::NicheOrPremium);
        assert_eq!(ValueCategory::classify(Some(50.0), 51), ValueCategory::BestMidRange);
        assert_eq!(ValueCategory::classify(Some(100.0), 51), ValueCategory::BestMidRange);
        assert_eq!(ValueCategory::classify(Some(100.01), 500), ValueCategory::NicheOrPremium);
        assert_eq!(ValueCategory::classify(None, 500), ValueCategory::NicheOrPremium);
    }

    #[test]
    fn test_category_order_independent() {
        let listings = vec![
            listing(1, "Mitte", Some(40.0), 150),
            listing(2, "Mitte", Some(80.0), 60),
            listing(3, "Mitte", Some(500.0), 3),
        ];
        let mut reversed = listings.clone();
        reversed.reverse();

        let forward: HashMap<String, ValueCategory> = categorize_listings(&listings)
            .into_iter()
            .map(|c| (c.name, c.category))
            .collect();
        let backward: HashMap<String, ValueCategory> = categorize_listings(&reversed)
            .into_iter()
            .map(|c| (c.name, c.category))
            .collect();

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn test_category_labels_round_trip() {
        for category in [
            ValueCategory::TopBudgetPick,
            ValueCategory::BestMidRange,
            ValueCategory::NicheOrPremium,
        ] {
            assert_eq!(ValueCategory::from_label(category.as_str()), Some(category));
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
        }
    }
}
