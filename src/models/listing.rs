use super::criteria::PropertyType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Marketplace a listing was found on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Airbnb,
    Booking,
}

impl Platform {
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Airbnb => "airbnb",
            Platform::Booking => "booking",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dedup key: one physical listing on one platform
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingKey {
    pub platform: Platform,
    pub external_id: String,
}

/// Canonical, platform-agnostic accommodation record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub platform: Platform,
    pub external_id: String,
    pub title: String,
    /// Always in the run's reference currency
    pub price_per_night: f64,
    pub total_price: Option<f64>,
    /// 0..=5, absent when the platform shows no rating
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub amenities: BTreeSet<String>,
    pub location_text: String,
    /// Kilometres to the searched location
    pub distance_to_target: Option<f64>,
    pub url: String,
    pub property_type: PropertyType,
    /// From the listing's own page; only the cheapest listings per platform
    /// are visited.
    pub details: Option<PropertyDetails>,
}

/// What a listing page adds to its results card.
///
/// Fees are in the run's reference currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertyDetails {
    pub description: Option<String>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<f64>,
    pub max_guests: Option<u32>,
    pub cleaning_fee: Option<f64>,
    pub service_fee: Option<f64>,
    pub taxes: Option<f64>,
    /// Refundable, so never part of `total_price`
    pub security_deposit: Option<f64>,
    pub host_name: Option<String>,
    /// 0..=5
    pub host_rating: Option<f64>,
    pub host_response_time: Option<String>,
    pub instant_book: bool,
    pub cancellation_policy: Option<String>,
    pub house_rules: Vec<String>,
}

impl Listing {
    pub fn key(&self) -> ListingKey {
        ListingKey {
            platform: self.platform,
            external_id: self.external_id.clone(),
        }
    }
}

/// A listing with its scores and final position in the ranking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredListing {
    pub listing: Listing,
    pub value_score: f64,
    pub location_score: f64,
    pub composite_score: f64,
    /// 1-based
    pub rank: usize,
}
