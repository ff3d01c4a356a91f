// Review reports: join counts, per-listing cumulative series, recent volume by area

use super::TOP_N;
use crate::error::{InsightsError, Result};
use crate::model::{Listing, Review};
use chrono::NaiveDate;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Listing ids offered for the cumulative-series selector
pub const SAMPLE_SIZE: usize = 10;

/// Start of the "recent reviews" window
pub fn default_recent_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or(NaiveDate::MIN)
}

// ============================================================================
// MOST REVIEWED
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingReviewCount {
    pub listing_id: i64,
    pub name: String,
    pub total_reviews: i64,
}

/// Inner join listings ⋈ reviews, count per listing, top 10.
///
/// Listings without review rows never appear.
pub fn most_reviewed(listings: &[Listing], reviews: &[Review]) -> Vec<ListingReviewCount> {
    let mut counts: HashMap<i64, i64> = HashMap::new();
    for review in reviews {
        *counts.entry(review.listing_id).or_insert(0) += 1;
    }

    let mut result: Vec<ListingReviewCount> = listings
        .iter()
        .filter_map(|l| {
            counts.get(&l.id).map(|&total_reviews| ListingReviewCount {
                listing_id: l.id,
                name: l.name.clone(),
                total_reviews,
            })
        })
        .collect();

    result.sort_by(|a, b| {
        b.total_reviews
            .cmp(&a.total_reviews)
            .then_with(|| a.listing_id.cmp(&b.listing_id))
    });
    result.truncate(TOP_N);

    debug!(rows = result.len(), "most_reviewed");
    result
}

// ============================================================================
// CUMULATIVE REVIEWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeReviewPoint {
    pub listing_id: i64,
    pub date: NaiveDate,
    /// Calendar month label, `YYYY-MM`
    pub month: String,
    pub cumulative_reviews: i64,
}

/// Running review count per listing in date order.
///
/// Same-day reviews keep their input order. Output is ordered by listing,
/// then date, and the counter restarts at 1 for every listing.
pub fn cumulative_reviews(reviews: &[Review]) -> Vec<CumulativeReviewPoint> {
    let mut ordered: Vec<&Review> = reviews.iter().collect();
    // stable: ties keep input order
    ordered.sort_by_key(|r| (r.listing_id, r.date));

    let mut result = Vec::with_capacity(ordered.len());
    let mut current: Option<i64> = None;
    let mut running = 0;

    for review in ordered {
        if current != Some(review.listing_id) {
            current = Some(review.listing_id);
            running = 0;
        }
        running += 1;

        result.push(CumulativeReviewPoint {
            listing_id: review.listing_id,
            date: review.date,
            month: review.date.format("%Y-%m").to_string(),
            cumulative_reviews: running,
        });
    }

    result
}

/// Pick up to `n` distinct listing ids that have at least one review.
pub fn sample_listing_ids<R: Rng + ?Sized>(
    points: &[CumulativeReviewPoint],
    n: usize,
    rng: &mut R,
) -> Result<Vec<i64>> {
    let mut seen = HashSet::new();
    let ids: Vec<i64> = points
        .iter()
        .map(|p| p.listing_id)
        .filter(|id| seen.insert(*id))
        .collect();

    if ids.is_empty() {
        return Err(InsightsError::EmptyResult(
            "no reviews to sample listings from".to_string(),
        ));
    }

    Ok(ids.choose_multiple(rng, n).copied().collect())
}

/// The selected listing's series, in date order
pub fn series_for_listing(
    points: &[CumulativeReviewPoint],
    listing_id: i64,
) -> Result<Vec<CumulativeReviewPoint>> {
    let series: Vec<CumulativeReviewPoint> = points
        .iter()
        .filter(|p| p.listing_id == listing_id)
        .cloned()
        .collect();

    if series.is_empty() {
        return Err(InsightsError::InvalidSelection(format!(
            "listing {} has no reviews",
            listing_id
        )));
    }

    Ok(series)
}

// ============================================================================
// RECENT NEIGHBOURHOOD VOLUME
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighbourhoodReviewCount {
    pub neighbourhood: String,
    pub review_count: i64,
}

/// Reviews on or after `since`, joined to listings, counted per neighbourhood, top 10
pub fn recent_neighbourhood_reviews(
    listings: &[Listing],
    reviews: &[Review],
    since: NaiveDate,
) -> Vec<NeighbourhoodReviewCount> {
    let mut neighbourhood_of: HashMap<i64, &str> = HashMap::new();
    for listing in listings {
        neighbourhood_of
            .entry(listing.id)
            .or_insert(listing.neighbourhood.as_str());
    }

    let mut counts: HashMap<&str, i64> = HashMap::new();
    for review in reviews.iter().filter(|r| r.date >= since) {
        if let Some(neighbourhood) = neighbourhood_of.get(&review.listing_id) {
            *counts.entry(neighbourhood).or_insert(0) += 1;
        }
    }

    let mut result: Vec<NeighbourhoodReviewCount> = counts
        .into_iter()
        .map(|(neighbourhood, review_count)| NeighbourhoodReviewCount {
            neighbourhood: neighbourhood.to_string(),
            review_count,
        })
        .collect();

    result.sort_by(|a, b| {
        b.review_count
            .cmp(&a.review_count)
            .then_with(|| a.neighbourhood.cmp(&b.neighbourhood))
    });
    result.truncate(TOP_N);

    debug!(rows = result.len(), %since, "recent_neighbourhood_reviews");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{listing, review};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_most_reviewed_inner_join() {
        let listings = vec![
            listing(1, "Mitte", Some(40.0), 0),
            listing(2, "Mitte", Some(80.0), 0),
            listing(3, "Mitte", Some(90.0), 0),
        ];
        let reviews = vec![
            review(2, "2024-01-01"),
            review(2, "2024-02-01"),
            review(1, "2024-03-01"),
            review(99, "2024-03-01"), // orphan review, no listing
        ];

        let top = most_reviewed(&listings, &reviews);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].listing_id, 2);
        assert_eq!(top[0].total_reviews, 2);
        assert_eq!(top[1].listing_id, 1);
        assert!(top.iter().all(|r| r.listing_id != 3));
    }

    #[test]
    fn test_most_reviewed_truncates_to_ten() {
        let listings: Vec<Listing> = (1..=15).map(|id| listing(id, "Mitte", None, 0)).collect();
        let reviews: Vec<Review> = (1..=15)
            .flat_map(|id| (0..id).map(move |_| review(id, "2024-01-01")))
            .collect();

        let top = most_reviewed(&listings, &reviews);

        assert_eq!(top.len(), TOP_N);
        assert_eq!(top[0].listing_id, 15);
        assert_eq!(top[9].listing_id, 6);
    }

    #[test]
    fn test_empty_reviews_give_empty_tables() {
        let listings = vec![listing(1, "Mitte", Some(40.0), 150)];

        assert!(most_reviewed(&listings, &[]).is_empty());
        assert!(recent_neighbourhood_reviews(&listings, &[], default_recent_cutoff()).is_empty());
        assert!(cumulative_reviews(&[]).is_empty());
    }

    #[test]
    fn test_cumulative_counts_reset_per_listing() {
        let reviews = vec![
            review(2, "2024-03-01"),
            review(1, "2024-05-01"),
            review(2, "2024-01-15"),
            review(1, "2024-02-01"),
            review(2, "2024-01-15"),
            review(1, "2024-05-20"),
        ];

        let points = cumulative_reviews(&reviews);
        assert_eq!(points.len(), reviews.len());

        for listing_id in [1, 2] {
            let series: Vec<&CumulativeReviewPoint> =
                points.iter().filter(|p| p.listing_id == listing_id).collect();

            assert_eq!(series[0].cumulative_reviews, 1);
            for pair in series.windows(2) {
                assert!(pair[0].date <= pair[1].date);
                assert_eq!(pair[1].cumulative_reviews, pair[0].cumulative_reviews + 1);
            }
        }

        assert_eq!(points[0].month, "2024-02");
        assert_eq!(points[3].listing_id, 2);
        assert_eq!(points[3].cumulative_reviews, 1);
        assert_eq!(points[5].month, "2024-03");
        assert_eq!(points[5].cumulative_reviews, 3);
    }

    #[test]
    fn test_sample_listing_ids_distinct_and_bounded() {
        let reviews: Vec<Review> = (1..=25)
            .flat_map(|id| [review(id, "2024-01-01"), review(id, "2024-02-01")])
            .collect();
        let points = cumulative_reviews(&reviews);
        let mut rng = StdRng::seed_from_u64(7);

        let ids = sample_listing_ids(&points, SAMPLE_SIZE, &mut rng).unwrap();

        assert_eq!(ids.len(), SAMPLE_SIZE);
        let unique: HashSet<i64> = ids.iter().copied().collect();
        assert_eq!(unique.len(), SAMPLE_SIZE);
        assert!(ids.iter().all(|id| (1..=25).contains(id)));
    }

    #[test]
    fn test_sample_fewer_listings_than_requested() {
        let points = cumulative_reviews(&[review(4, "2024-01-01"), review(9, "2024-01-02")]);
        let mut rng = StdRng::seed_from_u64(1);

        let mut ids = sample_listing_ids(&points, SAMPLE_SIZE, &mut rng).unwrap();
        ids.sort();
        assert_eq!(ids, vec![4, 9]);
    }

    #[test]
    fn test_sample_requires_reviews() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = sample_listing_ids(&[], SAMPLE_SIZE, &mut rng).unwrap_err();
        assert!(matches!(err, InsightsError::EmptyResult(_)));
    }

    #[test]
    fn test_series_for_unknown_listing() {
        let points = cumulative_reviews(&[review(4, "2024-01-01")]);

        assert_eq!(series_for_listing(&points, 4).unwrap().len(), 1);
        let err = series_for_listing(&points, 5).unwrap_err();
        assert!(matches!(err, InsightsError::InvalidSelection(_)));
    }

    #[test]
    fn test_recent_neighbourhood_reviews_cutoff_inclusive() {
        let listings = vec![
            listing(1, "Mitte", None, 0),
            listing(2, "Kreuzberg", None, 0),
            listing(3, "Mitte", None, 0),
        ];
        let reviews = vec![
            review(1, "2024-12-31"),
            review(1, "2025-01-01"),
            review(3, "2025-06-01"),
            review(2, "2025-02-02"),
            review(42, "2025-02-02"), // no listing
        ];

        let counts = recent_neighbourhood_reviews(&listings, &reviews, default_recent_cutoff());

        assert_eq!(
            counts,
            vec![
                NeighbourhoodReviewCount {
                    neighbourhood: "Mitte".to_string(),
                    review_count: 2
                },
                NeighbourhoodReviewCount {
                    neighbourhood: "Kreuzberg".to_string(),
                    review_count: 1
                },
            ]
        );
    }
}
