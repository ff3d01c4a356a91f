// Report catalog - every report is a pure function over a Dataset snapshot
//
// market:  revenue by area, cheap listings, room-type prices, value categories
// reviews: most reviewed, cumulative series, recent neighbourhood volume
// advisor: price suggestion, top hosts by estimated revenue
// city:    city-wide averages, listing counts, ltm review means

pub mod advisor;
pub mod city;
pub mod market;
pub mod reviews;

pub use advisor::{
    estimated_annual_revenue, neighbourhood_options, room_type_options, suggest_price,
    top_hosts, AvailabilityPoint, HostRevenue, PriceQuery, PriceSuggestion, SampleListing,
    BEDROOM_PRICE_INCREMENT,
};
pub use city::{
    city_averages, listing_counts, ltm_review_means, GroupDimension, LtmReviewMean,
    NeighbourhoodAverages, NeighbourhoodCount,
};
pub use market::{
    categorize_listings, cheap_and_reviewed, price_by_room_type, revenue_by_area,
    CategorizedListing, CheapListing, NeighbourhoodRevenue, RoomTypePrices, ValueCategory,
};
pub use reviews::{
    cumulative_reviews, default_recent_cutoff, most_reviewed, recent_neighbourhood_reviews,
    sample_listing_ids, series_for_listing, CumulativeReviewPoint, ListingReviewCount,
    NeighbourhoodReviewCount, SAMPLE_SIZE,
};

/// Row cap for the "top N" reports
pub const TOP_N: usize = 10;

/// Mean of a slice, `None` when empty
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
