//! TOML configuration with built-in defaults for every field.

use crate::error::InvalidCriteria;
use crate::geo::Coordinates;
use crate::models::{PropertyType, SearchCriteria};
use crate::rates::RateTable;
use crate::retry::RetryPolicy;
use crate::scoring::{Scorer, ScoringWeights};
use crate::scrapers::AdapterSettings;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const CONFIG_ENV: &str = "STAY_SCOUT_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "stay-scout.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub retry: RetryConfig,
    pub search: SearchConfig,
    pub scoring: ScoringConfig,
    pub platforms: PlatformsConfig,
    pub rates: RatesConfig,
    pub criteria: CriteriaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub hard_refresh: bool,
    /// State name ("navigated", "extracting", …) → retries
    pub per_state: HashMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub timeout_secs: u64,
    pub max_pages: u32,
    /// Cheapest listings per platform whose own page is read; 0 turns it off
    pub details_per_platform: usize,
    pub reference_currency: String,
    pub alternatives: usize,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub amenity_weight: f64,
    pub price_weight: f64,
    pub rating_weight: f64,
    pub value_share: f64,
    pub property_type_penalty: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    pub booking: PlatformConfig,
    pub airbnb: PlatformConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub enabled: bool,
    /// Override of the site root
    pub base_url: Option<String>,
    pub settle_ms: u64,
    pub max_results_per_page: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesConfig {
    /// open.er-api.com style endpoint; the static table is used when unset
    /// or unreachable
    pub endpoint: Option<String>,
    /// Currency → units per reference currency
    pub table: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaConfig {
    pub location: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub max_price_per_night: Option<f64>,
    pub property_type: PropertyType,
    pub amenities: Vec<String>,
    /// "lat,lng" of the target; geocoded from `location` when unset
    pub target: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 500,
            max_backoff_ms: 8000,
            hard_refresh: true,
            per_state: HashMap::new(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_pages: 3,
            details_per_platform: 5,
            reference_currency: "USD".to_string(),
            alternatives: 2,
            output: PathBuf::from("search_results.json"),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        let weights = ScoringWeights::default();
        Self {
            amenity_weight: weights.amenity,
            price_weight: weights.price,
            rating_weight: weights.rating,
            value_share: 0.7,
            property_type_penalty: 0.1,
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            settle_ms: 3000,
            max_results_per_page: 20,
        }
    }
}

impl Default for RatesConfig {
    fn default() -> Self {
        let table = [("EUR", 0.92), ("GBP", 0.79), ("CAD", 1.36), ("AUD", 1.52), ("PLN", 3.98)]
            .into_iter()
            .map(|(code, units)| (code.to_string(), units))
            .collect();
        Self {
            endpoint: Some("https://open.er-api.com/v6/latest".to_string()),
            table,
        }
    }
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            location: "Bar, Montenegro".to_string(),
            check_in: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default(),
            check_out: NaiveDate::from_ymd_opt(2024, 9, 15).unwrap_or_default(),
            guests: 2,
            max_price_per_night: Some(40.0),
            property_type: PropertyType::EntirePlace,
            amenities: ["kitchen", "wifi", "air_conditioning", "parking"]
                .iter()
                .map(|a| a.to_string())
                .collect(),
            target: None,
        }
    }
}

impl Config {
    /// Load from `$STAY_SCOUT_CONFIG`, else `stay-scout.toml`, else defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }

        info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&content).with_context(|| format!("Invalid config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let weights = self.scoring.weights();
        if !weights.is_normalized() {
            bail!(
                "scoring weights must be non-negative and sum to 1, got {:.4}",
                weights.sum()
            );
        }
        if !(0.0..=1.0).contains(&self.scoring.value_share) {
            bail!("scoring.value_share must be within 0..=1");
        }
        if !(0.0..=1.0).contains(&self.scoring.property_type_penalty) {
            bail!("scoring.property_type_penalty must be within 0..=1");
        }
        if self.search.max_pages == 0 {
            bail!("search.max_pages must be at least 1");
        }
        if self.search.timeout_secs == 0 {
            bail!("search.timeout_secs must be at least 1");
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            bail!("retry.initial_backoff_ms exceeds retry.max_backoff_ms");
        }
        Ok(())
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            hard_refresh: self.hard_refresh,
            per_state: self.per_state.clone(),
        }
    }
}

impl SearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ScoringConfig {
    pub fn weights(&self) -> ScoringWeights {
        ScoringWeights {
            amenity: self.amenity_weight,
            price: self.price_weight,
            rating: self.rating_weight,
        }
    }

    pub fn scorer(&self) -> Scorer {
        Scorer::new(self.weights(), self.value_share, self.property_type_penalty)
    }
}

impl PlatformConfig {
    pub fn settings(&self, default_base_url: &str, currency: &str) -> AdapterSettings {
        AdapterSettings {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            settle: Duration::from_millis(self.settle_ms),
            max_results_per_page: self.max_results_per_page,
            currency: currency.to_uppercase(),
        }
    }
}

impl RatesConfig {
    /// The configured fallback table, based on `reference_currency`.
    pub fn static_table(&self, reference_currency: &str, taken_on: NaiveDate) -> RateTable {
        let mut table = RateTable::new(reference_currency, taken_on);
        for (currency, units) in &self.table {
            table.insert(currency, *units);
        }
        table
    }
}

impl CriteriaConfig {
    pub fn build(&self) -> Result<SearchCriteria, InvalidCriteria> {
        let mut builder = SearchCriteria::builder(&self.location, self.check_in, self.check_out, self.guests)
            .property_type(self.property_type)
            .amenities(self.amenities.iter().cloned());
        if let Some(max) = self.max_price_per_night {
            builder = builder.max_price_per_night(max);
        }
        builder.build()
    }

    pub fn target(&self) -> Option<Coordinates> {
        self.target.as_deref().and_then(Coordinates::parse_pair)
    }
}
