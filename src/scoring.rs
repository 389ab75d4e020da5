//! Value/location scoring and deterministic ranking of canonical listings.

use crate::canonical::is_vocabulary;
use crate::models::{Listing, ScoredListing, SearchCriteria, SearchResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Score given when the data needed for a component is missing
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Listings priced above this multiple of the budget are not ranked
pub const EXCLUSION_MULTIPLE: f64 = 2.0;

/// Weights of the three value components. They must sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub amenity: f64,
    pub price: f64,
    pub rating: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            amenity: 0.4,
            price: 0.4,
            rating: 0.2,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.amenity + self.price + self.rating
    }

    pub fn is_normalized(&self) -> bool {
        let parts = [self.amenity, self.price, self.rating];
        parts.iter().all(|w| w.is_finite() && *w >= 0.0) && (self.sum() - 1.0).abs() <= 1e-6
    }
}

#[derive(Debug, Clone)]
pub struct Scorer {
    weights: ScoringWeights,
    /// Share of the composite taken by the value score; location gets the rest
    value_share: f64,
    /// Value-score reduction for listings whose property type differs from
    /// the requested one, e.g. when a platform could not filter on it
    property_type_penalty: f64,
}

impl Default for Scorer {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            value_share: 0.7,
            property_type_penalty: 0.1,
        }
    }
}

impl Scorer {
    pub fn new(weights: ScoringWeights, value_share: f64, property_type_penalty: f64) -> Self {
        Self {
            weights,
            value_share: value_share.clamp(0.0, 1.0),
            property_type_penalty: property_type_penalty.clamp(0.0, 1.0),
        }
    }

    /// Rank every listing of `result` that is within reach of the budget.
    ///
    /// Ordering: composite score descending, then price ascending, then
    /// platform name, then external id. Ranks start at 1.
    pub fn score(&self, result: &SearchResult, criteria: &SearchCriteria) -> Vec<ScoredListing> {
        let wanted = criteria.amenities();

        let mut scored: Vec<ScoredListing> = result
            .listings
            .iter()
            .filter(|listing| {
                let keep = !is_excluded(listing.price_per_night, criteria.max_price_per_night());
                if !keep {
                    debug!("Excluding {} at {:.2}/night", listing.external_id, listing.price_per_night);
                }
                keep
            })
            .map(|listing| self.score_listing(listing, criteria, wanted))
            .collect();

        scored.sort_by(ranking_order);
        for (index, entry) in scored.iter_mut().enumerate() {
            entry.rank = index + 1;
        }
        scored
    }

    fn score_listing(&self, listing: &Listing, criteria: &SearchCriteria, wanted: &BTreeSet<String>) -> ScoredListing {
        let rating = listing.rating.map(|r| (r / 5.0).clamp(0.0, 1.0)).unwrap_or(NEUTRAL_SCORE);

        let mut value_score = amenity_match_ratio(&listing.amenities, wanted) * self.weights.amenity
            + price_fit(listing.price_per_night, criteria.max_price_per_night()) * self.weights.price
            + rating * self.weights.rating;

        if listing.property_type != criteria.property_type() {
            value_score *= 1.0 - self.property_type_penalty;
        }
        let value_score = value_score.clamp(0.0, 1.0);

        let location_score = location_score(listing.distance_to_target);
        let composite_score = value_score * self.value_share + location_score * (1.0 - self.value_share);

        ScoredListing {
            listing: listing.clone(),
            value_score,
            location_score,
            composite_score,
            rank: 0,
        }
    }
}

fn ranking_order(a: &ScoredListing, b: &ScoredListing) -> Ordering {
    b.composite_score
        .total_cmp(&a.composite_score)
        .then_with(|| a.listing.price_per_night.total_cmp(&b.listing.price_per_night))
        .then_with(|| a.listing.platform.name().cmp(b.listing.platform.name()))
        .then_with(|| a.listing.external_id.cmp(&b.listing.external_id))
}

pub fn is_excluded(price_per_night: f64, budget: Option<f64>) -> bool {
    match budget {
        Some(budget) => price_per_night > budget * EXCLUSION_MULTIPLE,
        None => false,
    }
}

/// Fraction of the wanted amenities the listing offers. 1.0 when nothing is
/// wanted.
///
/// A wanted amenity outside the shared vocabulary also matches a listing
/// amenity that was kept verbatim and mentions it.
pub fn amenity_match_ratio(offered: &BTreeSet<String>, wanted: &BTreeSet<String>) -> f64 {
    if wanted.is_empty() {
        return 1.0;
    }

    let verbatim: Vec<String> = offered
        .iter()
        .filter(|a| !is_vocabulary(a))
        .map(|a| a.to_lowercase())
        .collect();

    let matched = wanted
        .iter()
        .filter(|tag| {
            if offered.contains(*tag) {
                return true;
            }
            let needle = tag.replace('_', " ").to_lowercase();
            verbatim.iter().any(|a| a.contains(&needle))
        })
        .count();

    matched as f64 / wanted.len() as f64
}

/// 1.0 at or under budget, falling linearly to 0.0 at twice the budget.
pub fn price_fit(price_per_night: f64, budget: Option<f64>) -> f64 {
    match budget {
        None => 1.0,
        Some(budget) if price_per_night <= budget => 1.0,
        Some(budget) => (1.0 - (price_per_night - budget) / budget).clamp(0.0, 1.0),
    }
}

pub fn location_score(distance_km: Option<f64>) -> f64 {
    match distance_km {
        Some(d) if d.is_finite() && d >= 0.0 => 1.0 / (1.0 + d),
        _ => NEUTRAL_SCORE,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Platform, PropertyType};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    pub fn listing(platform: Platform, id: &str, price: f64) -> Listing {
        Listing {
            platform,
            external_id: id.to_string(),
            title: format!("Stay {}", id),
            price_per_night: price,
            total_price: Some(price * 14.0),
            rating: None,
            review_count: None,
            amenities: BTreeSet::new(),
            location_text: "Bar".to_string(),
            distance_to_target: None,
            url: format!("https://example.test/{}", id),
            property_type: PropertyType::EntirePlace,
            details: None,
        }
    }

    pub fn bar_criteria() -> SearchCriteria {
        SearchCriteria::builder(
            "Bar, Montenegro",
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 15).unwrap(),
            2,
        )
        .max_price_per_night(40.0)
        .amenities(["kitchen", "wifi", "air_conditioning"])
        .build()
        .unwrap()
    }

    pub fn result_of(criteria: &SearchCriteria, listings: Vec<Listing>) -> SearchResult {
        SearchResult {
            criteria: criteria.clone(),
            listings,
            platform_status: BTreeMap::new(),
        }
    }

    fn amenities(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bar_example_ranks_a_first() {
        let criteria = bar_criteria();
        let mut a = listing(Platform::Airbnb, "A", 35.0);
        a.rating = Some(4.8);
        a.amenities = amenities(&["kitchen", "wifi", "air_conditioning"]);
        a.distance_to_target = Some(1.0);
        let mut b = listing(Platform::Booking, "B", 40.0);
        b.rating = Some(4.2);
        b.amenities = amenities(&["wifi"]);
        b.distance_to_target = Some(3.0);

        let ranked = Scorer::default().score(&result_of(&criteria, vec![b, a]), &criteria);

        assert_eq!(ranked[0].listing.external_id, "A");
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert!((ranked[0].value_score - 0.992).abs() < 1e-9);
        assert!((ranked[0].composite_score - 0.8444).abs() < 1e-9);
        assert!((ranked[1].composite_score - 0.566).abs() < 1e-3);
    }

    #[test]
    fn test_over_twice_budget_is_excluded() {
        let criteria = bar_criteria();
        let ranked = Scorer::default().score(
            &result_of(
                &criteria,
                vec![listing(Platform::Booking, "cheap", 30.0), listing(Platform::Booking, "pricey", 85.0)],
            ),
            &criteria,
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].listing.external_id, "cheap");
        // Exactly twice the budget is still ranked
        assert!(!is_excluded(80.0, Some(40.0)));
        assert!(!is_excluded(1000.0, None));
    }

    #[test]
    fn test_price_fit_decays_linearly() {
        assert_eq!(price_fit(20.0, Some(40.0)), 1.0);
        assert_eq!(price_fit(40.0, Some(40.0)), 1.0);
        assert!((price_fit(60.0, Some(40.0)) - 0.5).abs() < 1e-12);
        assert_eq!(price_fit(80.0, Some(40.0)), 0.0);
        assert_eq!(price_fit(500.0, None), 1.0);
    }

    #[test]
    fn test_location_score() {
        assert_eq!(location_score(None), NEUTRAL_SCORE);
        assert_eq!(location_score(Some(0.0)), 1.0);
        assert_eq!(location_score(Some(3.0)), 0.25);
    }

    #[test]
    fn test_amenity_ratio_matches_verbatim_amenities() {
        let offered = amenities(&["wifi", "Private hot tub"]);
        assert_eq!(amenity_match_ratio(&offered, &amenities(&["wifi", "hot tub"])), 1.0);
        assert_eq!(amenity_match_ratio(&offered, &amenities(&["wifi", "pool"])), 0.5);
        assert_eq!(amenity_match_ratio(&offered, &BTreeSet::new()), 1.0);
    }

    #[test]
    fn test_ties_break_on_price_then_platform_then_id() {
        let criteria = SearchCriteria::builder(
            "Bar",
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 3).unwrap(),
            1,
        )
        .build()
        .unwrap();
        // No budget: price does not move the score, so all four tie
        let listings = vec![
            listing(Platform::Booking, "z", 50.0),
            listing(Platform::Booking, "b", 60.0),
            listing(Platform::Airbnb, "y", 60.0),
            listing(Platform::Booking, "a", 60.0),
        ];

        let scorer = Scorer::default();
        let result = result_of(&criteria, listings);
        let first: Vec<_> = scorer.score(&result, &criteria).into_iter().map(|s| s.listing.external_id).collect();
        let second: Vec<_> = scorer.score(&result, &criteria).into_iter().map(|s| s.listing.external_id).collect();

        assert_eq!(first, vec!["z", "y", "a", "b"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_property_type_mismatch_is_penalized() {
        let criteria = bar_criteria();
        let entire = listing(Platform::Booking, "entire", 30.0);
        let mut room = listing(Platform::Booking, "room", 30.0);
        room.property_type = PropertyType::PrivateRoom;

        let ranked = Scorer::default().score(&result_of(&criteria, vec![room, entire]), &criteria);

        assert_eq!(ranked[0].listing.external_id, "entire");
        assert!((ranked[1].value_score - ranked[0].value_score * 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_weights_validation() {
        assert!(ScoringWeights::default().is_normalized());
        let skewed = ScoringWeights {
            amenity: 0.5,
            price: 0.5,
            rating: 0.2,
        };
        assert!(!skewed.is_normalized());
    }
}
