use crate::geo::Coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What a scraped price covers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PriceBasis {
    PerNight,
    /// Whole stay for the searched dates
    Stay,
}

/// A listing card as scraped, before any normalization.
///
/// Text fields hold what the page showed; the canonicalizer owns all
/// parsing and unit conversion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawListingRecord {
    pub external_id: String,
    pub title: String,
    pub price_text: Option<String>,
    pub price_basis: PriceBasis,
    /// Used when the price text carries no currency marker
    pub currency_hint: Option<String>,
    pub fee_texts: Vec<String>,
    pub rating_text: Option<String>,
    /// Top of the platform's rating scale (5 or 10)
    pub rating_scale: f64,
    pub amenities: Vec<String>,
    pub location_text: String,
    pub coordinates: Option<Coordinates>,
    pub url: String,
    pub property_type_hint: Option<String>,
    pub raw_data: serde_json::Value,
}

/// A listing's own page as scraped.
///
/// Like [`RawListingRecord`], only text; the canonicalizer parses it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawPropertyDetails {
    pub description: Option<String>,
    /// Capacity lines such as "2 bedrooms", "1.5 baths", "4 guests"
    pub facts: Vec<String>,
    /// Price breakdown lines such as "Cleaning fee €40"
    pub fee_lines: Vec<String>,
    pub currency_hint: Option<String>,
    pub host_name: Option<String>,
    pub host_rating_text: Option<String>,
    pub host_rating_scale: f64,
    pub host_response_time: Option<String>,
    pub instant_book: bool,
    pub cancellation_policy: Option<String>,
    pub amenities: Vec<String>,
    pub house_rules: Vec<String>,
}

/// Position of one adapter run in the search state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterState {
    Init,
    Navigated,
    CriteriaApplied,
    FiltersApplied,
    Extracting,
    Paginating,
    /// Reading the pages of the cheapest listings
    Enriching,
    Done,
    Failed(String),
}

impl AdapterState {
    pub fn name(&self) -> &'static str {
        match self {
            AdapterState::Init => "init",
            AdapterState::Navigated => "navigated",
            AdapterState::CriteriaApplied => "criteria_applied",
            AdapterState::FiltersApplied => "filters_applied",
            AdapterState::Extracting => "extracting",
            AdapterState::Paginating => "paginating",
            AdapterState::Enriching => "enriching",
            AdapterState::Done => "done",
            AdapterState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for AdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterState::Failed(reason) => write!(f, "failed({})", reason),
            other => f.write_str(other.name()),
        }
    }
}

/// Which filters a platform could apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl FilterReport {
    pub fn applied(&mut self, filter: impl Into<String>) {
        self.applied.push(filter.into());
    }

    pub fn skipped(&mut self, filter: impl Into<String>) {
        self.skipped.push(filter.into());
    }
}

/// Per-adapter settings passed in at construction
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    /// Site root, overridable for staging mirrors and tests
    pub base_url: String,
    /// Wait after every page load or form submission
    pub settle: Duration,
    pub max_results_per_page: usize,
    /// Currency the site is asked to display prices in
    pub currency: String,
}
