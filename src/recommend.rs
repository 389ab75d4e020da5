//! Turns a ranked sequence into a recommendation with market context.

use crate::models::{Listing, Platform, ScoredListing, SearchResult};
use crate::scoring::is_excluded;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Listings at or under this share of the budget count as budget options
pub const BUDGET_SHARE: f64 = 0.8;
/// Listings at or over this multiple of the budget count as premium
pub const PREMIUM_MULTIPLE: f64 = 1.2;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PriceStats {
    pub min: f64,
    pub median: f64,
    pub max: f64,
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AmenityCount {
    pub amenity: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlatformSummary {
    pub listings: usize,
    pub average_price: f64,
}

/// Aggregates over every listing found, ranked or not
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketInsights {
    pub total_listings: usize,
    pub price: Option<PriceStats>,
    /// Most common first, ties by name
    pub amenity_frequency: Vec<AmenityCount>,
    pub platforms: BTreeMap<Platform, PlatformSummary>,
    pub budget_options: usize,
    pub premium_options: usize,
    pub excluded_over_budget: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendations {
    pub top: Option<ScoredListing>,
    pub alternatives: Vec<ScoredListing>,
    pub insights: MarketInsights,
    pub notes: Vec<String>,
}

/// Pick the top listing and `alternatives` runners-up from `ranked`.
///
/// Pure: works only from what the search already returned.
pub fn recommend(result: &SearchResult, ranked: &[ScoredListing], alternatives: usize) -> Recommendations {
    let top = ranked.first().cloned();
    let alternatives = ranked.iter().skip(1).take(alternatives).cloned().collect();
    let insights = market_insights(result);
    let notes = notes(result, ranked, &insights);

    Recommendations {
        top,
        alternatives,
        insights,
        notes,
    }
}

pub fn market_insights(result: &SearchResult) -> MarketInsights {
    let listings = &result.listings;
    let budget = result.criteria.max_price_per_night();

    let mut per_platform: BTreeMap<Platform, Vec<f64>> = BTreeMap::new();
    for listing in listings {
        per_platform
            .entry(listing.platform)
            .or_default()
            .push(listing.price_per_night);
    }
    let platforms = per_platform
        .into_iter()
        .map(|(platform, prices)| {
            let summary = PlatformSummary {
                listings: prices.len(),
                average_price: mean(&prices),
            };
            (platform, summary)
        })
        .collect();

    let (budget_options, premium_options, excluded_over_budget) = match budget {
        Some(budget) => (
            count_where(listings, |p| p <= budget * BUDGET_SHARE),
            count_where(listings, |p| p >= budget * PREMIUM_MULTIPLE),
            count_where(listings, |p| is_excluded(p, Some(budget))),
        ),
        None => (0, 0, 0),
    };

    MarketInsights {
        total_listings: listings.len(),
        price: price_stats(listings.iter().map(|l| l.price_per_night).collect()),
        amenity_frequency: amenity_frequency(listings),
        platforms,
        budget_options,
        premium_options,
        excluded_over_budget,
    }
}

fn count_where(listings: &[Listing], predicate: impl Fn(f64) -> bool) -> usize {
    listings.iter().filter(|l| predicate(l.price_per_night)).count()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn price_stats(mut prices: Vec<f64>) -> Option<PriceStats> {
    if prices.is_empty() {
        return None;
    }
    prices.sort_by(|a, b| a.total_cmp(b));

    let n = prices.len();
    let median = if n % 2 == 1 {
        prices[n / 2]
    } else {
        (prices[n / 2 - 1] + prices[n / 2]) / 2.0
    };
    let mean = mean(&prices);
    let variance = prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n as f64;

    Some(PriceStats {
        min: prices[0],
        median,
        max: prices[n - 1],
        mean,
        std_dev: variance.sqrt(),
    })
}

fn amenity_frequency(listings: &[Listing]) -> Vec<AmenityCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for listing in listings {
        for amenity in &listing.amenities {
            *counts.entry(amenity.as_str()).or_default() += 1;
        }
    }

    let mut histogram: Vec<AmenityCount> = counts
        .into_iter()
        .map(|(amenity, count)| AmenityCount {
            amenity: amenity.to_string(),
            count,
        })
        .collect();
    histogram.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.amenity.cmp(&b.amenity)));
    histogram
}

fn notes(result: &SearchResult, ranked: &[ScoredListing], insights: &MarketInsights) -> Vec<String> {
    let mut notes = Vec::new();

    if ranked.is_empty() {
        notes.push(
            "No properties found matching your criteria. Consider widening the search area or adjusting the budget."
                .to_string(),
        );
    }

    if let (Some(budget), Some(price)) = (result.criteria.max_price_per_night(), &insights.price) {
        if price.mean > budget {
            notes.push(format!(
                "Average price ({:.0}/night) is above your budget of {:.0}. Shoulder-season dates or a wider area may help.",
                price.mean, budget
            ));
        }
    }

    let best_value = ranked
        .iter()
        .max_by(|a, b| a.value_score.total_cmp(&b.value_score).then_with(|| b.rank.cmp(&a.rank)));
    if let Some(best) = best_value {
        notes.push(format!(
            "Best value option: {} on {} at {:.2}/night",
            best.listing.title, best.listing.platform, best.listing.price_per_night
        ));
    }

    let area = result.criteria.location().split(',').next().unwrap_or_default().trim();
    if !area.is_empty() {
        let needle = area.to_lowercase();
        let in_area = ranked
            .iter()
            .filter(|s| s.listing.location_text.to_lowercase().contains(&needle))
            .count();
        if in_area > 0 {
            notes.push(format!("Found {} properties in the {} area", in_area, area));
        }
    }

    let instant = ranked
        .iter()
        .filter(|s| s.listing.details.as_ref().map_or(false, |d| d.instant_book))
        .count();
    if instant > 0 {
        notes.push(format!(
            "{} properties offer instant booking for immediate confirmation",
            instant
        ));
    }

    let failed = result.failed_platforms().count();
    if failed > 0 {
        notes.push(format!(
            "{} platform(s) could not be searched; results may be incomplete.",
            failed
        ));
    }

    notes
}
