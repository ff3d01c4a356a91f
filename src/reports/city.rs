// City-wide aggregates by neighbourhood and by a user-chosen dimension

use super::mean;
use crate::error::{InsightsError, Result};
use crate::model::Listing;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighbourhoodAverages {
    pub neighbourhood: String,
    pub avg_price: Option<f64>,
    pub avg_availability_365: f64,
    pub avg_number_of_reviews: f64,
}

/// Mean price, availability and review count per neighbourhood, priciest first.
/// Neighbourhoods without any priced listing sort last.
pub fn city_averages(listings: &[Listing]) -> Vec<NeighbourhoodAverages> {
    #[derive(Default)]
    struct Acc {
        prices: Vec<f64>,
        availability: Vec<f64>,
        reviews: Vec<f64>,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for listing in listings {
        let acc = groups.entry(listing.neighbourhood.as_str()).or_default();
        if let Some(price) = listing.price {
            acc.prices.push(price);
        }
        acc.availability.push(listing.availability_365 as f64);
        acc.reviews.push(listing.number_of_reviews as f64);
    }

    let mut result: Vec<NeighbourhoodAverages> = groups
        .into_iter()
        .map(|(neighbourhood, acc)| NeighbourhoodAverages {
            neighbourhood: neighbourhood.to_string(),
            avg_price: mean(&acc.prices),
            avg_availability_365: mean(&acc.availability).unwrap_or(0.0),
            avg_number_of_reviews: mean(&acc.reviews).unwrap_or(0.0),
        })
        .collect();

    result.sort_by(|a, b| match (a.avg_price, b.avg_price) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    result
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighbourhoodCount {
    pub neighbourhood: String,
    pub listings: usize,
}

/// Number of listings per neighbourhood, most first
pub fn listing_counts(listings: &[Listing]) -> Vec<NeighbourhoodCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for listing in listings {
        *counts.entry(listing.neighbourhood.as_str()).or_insert(0) += 1;
    }

    let mut result: Vec<NeighbourhoodCount> = counts
        .into_iter()
        .map(|(neighbourhood, listings)| NeighbourhoodCount {
            neighbourhood: neighbourhood.to_string(),
            listings,
        })
        .collect();

    result.sort_by(|a, b| {
        b.listings
            .cmp(&a.listings)
            .then_with(|| a.neighbourhood.cmp(&b.neighbourhood))
    });
    result
}

// ============================================================================
// GROUP DIMENSION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupDimension {
    RoomType,
    Neighbourhood,
    NeighbourhoodGroup,
}

impl GroupDimension {
    pub const ALL: [GroupDimension; 3] = [
        GroupDimension::RoomType,
        GroupDimension::Neighbourhood,
        GroupDimension::NeighbourhoodGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupDimension::RoomType => "room_type",
            GroupDimension::Neighbourhood => "neighbourhood",
            GroupDimension::NeighbourhoodGroup => "neighbourhood_group",
        }
    }

    /// Next dimension in `ALL`, wrapping around
    pub fn next(&self) -> Self {
        match self {
            GroupDimension::RoomType => GroupDimension::Neighbourhood,
            GroupDimension::Neighbourhood => GroupDimension::NeighbourhoodGroup,
            GroupDimension::NeighbourhoodGroup => GroupDimension::RoomType,
        }
    }

    /// Grouping key of a listing; blank keys are dropped from the grouping
    pub fn key<'a>(&self, listing: &'a Listing) -> Option<&'a str> {
        let key = match self {
            GroupDimension::RoomType => Some(listing.room_type.as_str()),
            GroupDimension::Neighbourhood => Some(listing.neighbourhood.as_str()),
            GroupDimension::NeighbourhoodGroup => listing.neighbourhood_group(),
        };
        key.filter(|k| !k.trim().is_empty())
    }
}

impl fmt::Display for GroupDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupDimension {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        GroupDimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s.trim())
            .ok_or_else(|| {
                InsightsError::InvalidSelection(format!(
                    "unknown grouping '{}', expected room_type, neighbourhood or neighbourhood_group",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LtmReviewMean {
    pub group: String,
    pub mean_reviews_ltm: f64,
}

/// Mean trailing-12-month review count per group, groups sorted by key
pub fn ltm_review_means(listings: &[Listing], dimension: GroupDimension) -> Vec<LtmReviewMean> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for listing in listings {
        if let Some(key) = dimension.key(listing) {
            groups
                .entry(key)
                .or_default()
                .push(listing.number_of_reviews_ltm as f64);
        }
    }

    groups
        .into_iter()
        .filter_map(|(group, values)| {
            mean(&values).map(|mean_reviews_ltm| LtmReviewMean {
                group: group.to_string(),
                mean_reviews_ltm,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::listing;

    #[test]
    fn test_city_averages_sorted_by_price() {
        let mut listings = vec![
            listing(1, "Mitte", Some(100.0), 10),
            listing(2, "Mitte", Some(50.0), 20),
            listing(3, "Pankow", Some(200.0), 4),
            listing(4, "Wedding", None, 8),
            listing(5, "Mitte", None, 30),
        ];
        listings[0].availability_365 = 100;
        listings[1].availability_365 = 200;
        listings[4].availability_365 = 0;

        let averages = city_averages(&listings);
        let names: Vec<&str> = averages.iter().map(|a| a.neighbourhood.as_str()).collect();

        assert_eq!(names, vec!["Pankow", "Mitte", "Wedding"]);
        assert_eq!(averages[1].avg_price, Some(75.0));
        assert_eq!(averages[1].avg_availability_365, 100.0);
        assert_eq!(averages[1].avg_number_of_reviews, 20.0);
        assert_eq!(averages[2].avg_price, None);
    }

    #[test]
    fn test_listing_counts() {
        let listings = vec![
            listing(1, "Wedding", None, 0),
            listing(2, "Mitte", None, 0),
            listing(3, "Mitte", None, 0),
            listing(4, "Alt-Treptow", None, 0),
        ];

        let counts = listing_counts(&listings);

        assert_eq!(counts[0].neighbourhood, "Mitte");
        assert_eq!(counts[0].listings, 2);
        assert_eq!(counts[1].neighbourhood, "Alt-Treptow");
        assert_eq!(counts[2].neighbourhood, "Wedding");
        assert_eq!(counts.iter().map(|c| c.listings).sum::<usize>(), listings.len());
    }

    #[test]
    fn test_ltm_means_by_each_dimension() {
        let mut listings = vec![
            listing(1, "Mitte", None, 10),
            listing(2, "Mitte", None, 30),
            listing(3, "Pankow", None, 8),
        ];
        listings[2].room_type = "Private room".to_string();
        listings[2].neighbourhood_group = None;

        let by_room = ltm_review_means(&listings, GroupDimension::RoomType);
        assert_eq!(by_room.len(), 2);
        assert_eq!(by_room[0].group, "Entire home/apt");
        assert_eq!(by_room[0].mean_reviews_ltm, 10.0);

        let by_area = ltm_review_means(&listings, GroupDimension::Neighbourhood);
        assert_eq!(by_area[1].group, "Pankow");
        assert_eq!(by_area[1].mean_reviews_ltm, 4.0);

        // Missing neighbourhood_group is dropped, not grouped as blank
        let by_group = ltm_review_means(&listings, GroupDimension::NeighbourhoodGroup);
        assert_eq!(by_group.len(), 1);
        assert_eq!(by_group[0].group, "Central");
    }

    #[test]
    fn test_dimension_parsing() {
        assert_eq!(
            "neighbourhood_group".parse::<GroupDimension>().unwrap(),
            GroupDimension::NeighbourhoodGroup
        );
        for dimension in GroupDimension::ALL {
            assert_eq!(dimension.to_string().parse::<GroupDimension>().unwrap(), dimension);
            assert_eq!(dimension.next().next().next(), dimension);
        }

        let err = "host_id".parse::<GroupDimension>().unwrap_err();
        assert!(matches!(err, InsightsError::InvalidSelection(_)));
    }
}
