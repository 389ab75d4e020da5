//! Multi-platform short-term rental search: drives Booking.com and Airbnb
//! through a headless browser, normalizes what they list, and ranks it
//! against the traveller's criteria.

pub mod canonical;
pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod orchestrator;
pub mod rates;
pub mod recommend;
pub mod retry;
pub mod scoring;
pub mod scrapers;

pub use canonical::Canonicalizer;
pub use config::Config;
pub use error::{AdapterError, InvalidCriteria, MalformedRecord, RateConversionUnavailable, RenderingError};
pub use models::{
    Listing, Platform, PlatformStatus, PropertyDetails, PropertyType, ScoredListing, SearchCriteria, SearchResult,
};
pub use orchestrator::SearchOrchestrator;
pub use recommend::{recommend, MarketInsights, Recommendations};
pub use retry::RetryPolicy;
pub use scoring::{Scorer, ScoringWeights};
