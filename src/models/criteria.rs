use crate::canonical::canonical_amenity;
use crate::error::InvalidCriteria;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const MIN_GUESTS: u32 = 1;
pub const MAX_GUESTS: u32 = 20;

/// Kind of accommodation requested or offered
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    EntirePlace,
    PrivateRoom,
    SharedRoom,
}

impl PropertyType {
    /// Classify free text such as "Entire rental unit" or "Room in guest house".
    pub fn from_hint(hint: &str) -> Self {
        let hint = hint.to_lowercase();
        if hint.contains("shared") {
            PropertyType::SharedRoom
        } else if hint.contains("private room") || hint.contains("room in") {
            PropertyType::PrivateRoom
        } else {
            PropertyType::EntirePlace
        }
    }
}

/// A validated, read-only search request.
///
/// Built through [`SearchCriteria::builder`]; every invariant is checked in
/// [`SearchCriteriaBuilder::build`] so a value of this type is always valid.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchCriteria {
    location: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: u32,
    max_price_per_night: Option<f64>,
    property_type: PropertyType,
    amenities: BTreeSet<String>,
}

impl SearchCriteria {
    pub fn builder(
        location: impl Into<String>,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
    ) -> SearchCriteriaBuilder {
        SearchCriteriaBuilder {
            location: location.into(),
            check_in,
            check_out,
            guests,
            max_price_per_night: None,
            property_type: PropertyType::default(),
            amenities: BTreeSet::new(),
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn guests(&self) -> u32 {
        self.guests
    }

    pub fn max_price_per_night(&self) -> Option<f64> {
        self.max_price_per_night
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn amenities(&self) -> &BTreeSet<String> {
        &self.amenities
    }

    /// Number of nights between check-in and check-out (always ≥ 1).
    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }
}

/// Collects optional fields before validation
#[derive(Debug, Clone)]
pub struct SearchCriteriaBuilder {
    location: String,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: u32,
    max_price_per_night: Option<f64>,
    property_type: PropertyType,
    amenities: BTreeSet<String>,
}

impl SearchCriteriaBuilder {
    pub fn max_price_per_night(mut self, price: f64) -> Self {
        self.max_price_per_night = Some(price);
        self
    }

    pub fn property_type(mut self, property_type: PropertyType) -> Self {
        self.property_type = property_type;
        self
    }

    pub fn amenities<I, S>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.amenities.extend(amenities.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<SearchCriteria, InvalidCriteria> {
        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(InvalidCriteria::new("location", "must not be empty"));
        }

        if self.check_out <= self.check_in {
            return Err(InvalidCriteria::new(
                "check_out",
                format!("{} is not after check-in {}", self.check_out, self.check_in),
            ));
        }

        if !(MIN_GUESTS..=MAX_GUESTS).contains(&self.guests) {
            return Err(InvalidCriteria::new(
                "guests",
                format!("{} is outside {}..={}", self.guests, MIN_GUESTS, MAX_GUESTS),
            ));
        }

        if let Some(price) = self.max_price_per_night {
            if !price.is_finite() || price <= 0.0 {
                return Err(InvalidCriteria::new(
                    "max_price_per_night",
                    format!("{} is not a positive amount", price),
                ));
            }
        }

        let amenities = self
            .amenities
            .iter()
            .map(|a| canonical_amenity(a))
            .filter(|a| !a.is_empty())
            .collect();

        Ok(SearchCriteria {
            location,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            max_price_per_night: self.max_price_per_night,
            property_type: self.property_type,
            amenities,
        })
    }
}
