use crate::error::RateConversionUnavailable;
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// Currency conversion collaborator used by the canonicalizer.
pub trait CurrencyRates: Send + Sync {
    /// Units of `to` per one unit of `from`.
    fn rate(&self, from: &str, to: &str, as_of: NaiveDate) -> Result<f64, RateConversionUnavailable>;
}

/// Snapshot of exchange rates relative to one base currency.
///
/// A snapshot answers for any `as_of` date; it is taken once per run.
#[derive(Debug, Clone)]
pub struct RateTable {
    base: String,
    taken_on: NaiveDate,
    /// Units of each currency per one unit of `base`
    units_per_base: HashMap<String, f64>,
}

impl RateTable {
    pub fn new(base: &str, taken_on: NaiveDate) -> Self {
        let base = base.to_uppercase();
        let mut units_per_base = HashMap::new();
        units_per_base.insert(base.clone(), 1.0);
        Self {
            base,
            taken_on,
            units_per_base,
        }
    }

    pub fn with_rate(mut self, currency: &str, units_per_base: f64) -> Self {
        self.insert(currency, units_per_base);
        self
    }

    pub fn insert(&mut self, currency: &str, units_per_base: f64) {
        if units_per_base.is_finite() && units_per_base > 0.0 {
            self.units_per_base
                .insert(currency.to_uppercase(), units_per_base);
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn taken_on(&self) -> NaiveDate {
        self.taken_on
    }

    pub fn len(&self) -> usize {
        self.units_per_base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units_per_base.is_empty()
    }
}

impl CurrencyRates for RateTable {
    fn rate(&self, from: &str, to: &str, _as_of: NaiveDate) -> Result<f64, RateConversionUnavailable> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Ok(1.0);
        }

        match (self.units_per_base.get(&from), self.units_per_base.get(&to)) {
            (Some(from_units), Some(to_units)) => Ok(to_units / from_units),
            _ => Err(RateConversionUnavailable { from, to }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    base_code: String,
    rates: HashMap<String, f64>,
}

/// Fetch a fresh [`RateTable`] from an open.er-api.com compatible endpoint.
///
/// `endpoint` is the URL prefix; the base currency is appended as the last
/// path segment.
pub async fn fetch_rate_table(client: &reqwest::Client, endpoint: &str, base: &str) -> Result<RateTable> {
    let url = format!("{}/{}", endpoint.trim_end_matches('/'), base.to_uppercase());
    debug!("Fetching exchange rates from {}", url);

    let response: LatestRatesResponse = client
        .get(&url)
        .send()
        .await
        .context("Failed to fetch exchange rates")?
        .error_for_status()
        .context("Exchange rate service returned an error")?
        .json()
        .await
        .context("Failed to parse exchange rates")?;

    if response.result != "success" {
        bail!("Exchange rate service answered {:?}", response.result);
    }

    let mut table = RateTable::new(&response.base_code, Utc::now().date_naive());
    for (currency, units) in &response.rates {
        table.insert(currency, *units);
    }

    info!(
        "Loaded {} exchange rates (base {}, as of {})",
        table.len(),
        table.base(),
        table.taken_on()
    );
    Ok(table)
}
