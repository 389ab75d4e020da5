//! Raw card → canonical [`Listing`].
//!
//! Every price leaving this module is in the run's reference currency and
//! per night. A price that cannot be parsed or converted drops the record;
//! a wrong price is never reported.

use crate::error::MalformedRecord;
use crate::geo::Coordinates;
use crate::models::{Listing, Platform, PropertyDetails, PropertyType, SearchCriteria};
use crate::rates::CurrencyRates;
use crate::scrapers::parse::collapse_ws;
use crate::scrapers::types::{PriceBasis, RawListingRecord, RawPropertyDetails};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Shared amenity vocabulary and the platform spellings that map onto it
const AMENITY_SYNONYMS: &[(&str, &str)] = &[
    ("wifi", "wifi"),
    ("wi-fi", "wifi"),
    ("free wifi", "wifi"),
    ("free wi-fi", "wifi"),
    ("wifi in all areas", "wifi"),
    ("wireless internet", "wifi"),
    ("internet", "wifi"),
    ("kitchen", "kitchen"),
    ("kitchenette", "kitchen"),
    ("full kitchen", "kitchen"),
    ("air conditioning", "air_conditioning"),
    ("air-conditioning", "air_conditioning"),
    ("central air conditioning", "air_conditioning"),
    ("ac", "air_conditioning"),
    ("a/c", "air_conditioning"),
    ("parking", "parking"),
    ("free parking", "parking"),
    ("free parking on premises", "parking"),
    ("private parking", "parking"),
    ("washer", "washer"),
    ("washing machine", "washer"),
    ("dryer", "dryer"),
    ("tumble dryer", "dryer"),
    ("tv", "tv"),
    ("television", "tv"),
    ("flat-screen tv", "tv"),
    ("hdtv", "tv"),
    ("balcony", "balcony"),
    ("patio or balcony", "balcony"),
    ("garden", "garden"),
    ("pool", "pool"),
    ("swimming pool", "pool"),
    ("outdoor swimming pool", "pool"),
    ("private pool", "pool"),
    ("beach access", "beach_access"),
    ("beachfront", "beach_access"),
    ("restaurant", "restaurant"),
    ("gym", "gym"),
    ("fitness centre", "gym"),
    ("fitness center", "gym"),
    ("spa", "spa"),
    ("spa and wellness centre", "spa"),
    ("pet friendly", "pet_friendly"),
    ("pets allowed", "pet_friendly"),
    ("heating", "heating"),
    ("sea view", "sea_view"),
    ("ocean view", "sea_view"),
];

/// ISO codes recognised when a price carries no symbol
const CURRENCY_CODES: &[&str] = &[
    "USD", "EUR", "GBP", "CHF", "RSD", "BAM", "HRK", "HUF", "CZK", "PLN", "SEK", "NOK", "DKK", "TRY",
    "CAD", "AUD",
];

/// Symbols checked longest first so "US$" wins over "$"
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("US$", "USD"),
    ("CA$", "CAD"),
    ("A$", "AUD"),
    ("€", "EUR"),
    ("£", "GBP"),
    ("zł", "PLN"),
    ("$", "USD"),
];

fn amenity_key(raw: &str) -> String {
    collapse_ws(&raw.replace('_', " ")).to_lowercase()
}

/// Map a platform or caller amenity onto the shared vocabulary.
///
/// Unknown amenities come back verbatim (whitespace-normalized) so they can
/// still be matched later.
pub fn canonical_amenity(raw: &str) -> String {
    let key = amenity_key(raw);
    AMENITY_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| collapse_ws(raw))
}

/// True when `amenity` is part of the shared vocabulary.
pub fn is_vocabulary(amenity: &str) -> bool {
    AMENITY_SYNONYMS.iter().any(|(_, canonical)| *canonical == amenity)
}

/// An amount with the currency the page showed, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub amount: f64,
    pub currency: Option<String>,
}

/// Parse texts like "€ 1.234,50", "US$40", "1 234 RSD" or "$35 night".
pub fn parse_money(text: &str) -> Option<Money> {
    let amount = parse_amount(text)?;
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    Some(Money {
        amount,
        currency: detect_currency(text),
    })
}

fn detect_currency(text: &str) -> Option<String> {
    if let Some((_, code)) = CURRENCY_SYMBOLS.iter().find(|(symbol, _)| text.contains(symbol)) {
        return Some(code.to_string());
    }
    text.split(|c: char| !c.is_ascii_alphabetic())
        .find(|token| CURRENCY_CODES.contains(token))
        .map(|code| code.to_string())
}

fn is_digit_group(rest: &[char]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(|c| c.is_ascii_digit())
        && rest.get(3).map_or(true, |c| !c.is_ascii_digit())
}

fn parse_amount(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let chars: Vec<char> = text[start..].chars().collect();

    // Spaces only count as thousands separators in front of a 3-digit group
    let mut number = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() || c == ',' || c == '.' {
            number.push(c);
        } else if matches!(c, ' ' | '\u{a0}' | '\u{202f}') && is_digit_group(&chars[i + 1..]) {
            // thousands separator
        } else {
            break;
        }
        i += 1;
    }

    let number = number.trim_end_matches([',', '.']);
    let commas = number.matches(',').count();
    let dots = number.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => number.to_string(),
        (_, 0) => {
            let decimals = number.len() - number.rfind(',')? - 1;
            if commas == 1 && decimals != 3 {
                number.replace(',', ".")
            } else {
                number.replace(',', "")
            }
        }
        (0, _) => {
            if dots > 1 {
                number.replace('.', "")
            } else {
                number.to_string()
            }
        }
        _ => {
            // Both present: the last one is the decimal separator
            if number.rfind(',')? > number.rfind('.')? {
                number.replace('.', "").replace(',', ".")
            } else {
                number.replace(',', "")
            }
        }
    };

    normalized.parse().ok()
}

/// First decimal number in a rating text ("Scored 8.6", "4.85 (123)").
fn parse_rating_value(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let chars: Vec<char> = text[start..].chars().collect();

    let mut number = String::new();
    let mut i = 0;
    while i < chars.len() && chars[i].is_ascii_digit() {
        number.push(chars[i]);
        i += 1;
    }

    // At most two decimals, otherwise the separator is a thousands mark
    if i < chars.len() && matches!(chars[i], '.' | ',') {
        let decimals: String = chars[i + 1..].iter().take_while(|c| c.is_ascii_digit()).collect();
        if (1..=2).contains(&decimals.len()) {
            number.push('.');
            number.push_str(&decimals);
        }
    }

    number.parse().ok()
}

/// Rescale a platform rating onto 0..=5; unreadable or off-scale → absent.
pub fn normalize_rating(text: &str, scale: f64) -> Option<f64> {
    if !scale.is_finite() || scale <= 0.0 {
        return None;
    }
    let value = parse_rating_value(text)?;
    if value > scale {
        return None;
    }
    Some((value * 5.0 / scale).clamp(0.0, 5.0))
}

/// Review count shown next to a rating: "4.85 (123)" or "1,234 reviews".
pub fn parse_review_count(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    if let Some(open) = lower.find('(') {
        let digits: String = lower[open + 1..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
            .filter(|c| c.is_ascii_digit())
            .collect();
        if !digits.is_empty() {
            return digits.parse().ok();
        }
    }
    let before = lower[..lower.find("review")?].trim_end();
    let digits: String = before
        .rsplit(' ')
        .next()?
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FeeKind {
    Cleaning,
    Service,
    Taxes,
    Deposit,
}

/// Which fee a price-breakdown line names. Nightly subtotals and
/// discounts name none.
fn fee_kind(line: &str) -> Option<FeeKind> {
    let lower = line.to_lowercase();
    if lower.contains("clean") {
        Some(FeeKind::Cleaning)
    } else if lower.contains("deposit") {
        Some(FeeKind::Deposit)
    } else if lower.contains("service") {
        Some(FeeKind::Service)
    } else if lower.contains("tax") || lower.contains("vat") {
        Some(FeeKind::Taxes)
    } else {
        None
    }
}

/// Leading number of a fact such as "2 bedrooms" or "Sleeps 4".
fn fact_number(fact: &str) -> Option<f64> {
    parse_rating_value(fact)
}

fn apply_fact(details: &mut PropertyDetails, fact: &str) {
    let lower = fact.to_lowercase();
    if lower.contains("bedroom") {
        if let Some(n) = fact_number(fact) {
            details.bedrooms = Some(n as u32);
        }
    } else if lower.contains("bath") {
        if let Some(n) = fact_number(fact) {
            details.bathrooms = Some(n);
        }
    } else if lower.contains("guest") || lower.contains("sleeps") {
        if let Some(n) = fact_number(fact) {
            details.max_guests = Some(n as u32);
        }
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Maps adapter records onto [`Listing`] for one search run.
#[derive(Clone)]
pub struct Canonicalizer {
    rates: Arc<dyn CurrencyRates>,
    reference_currency: String,
    nights: u32,
    as_of: NaiveDate,
    target: Option<Coordinates>,
}

impl Canonicalizer {
    pub fn new(rates: Arc<dyn CurrencyRates>, reference_currency: &str, criteria: &SearchCriteria) -> Self {
        Self {
            rates,
            reference_currency: reference_currency.to_uppercase(),
            nights: criteria.nights().max(1),
            as_of: criteria.check_in(),
            target: None,
        }
    }

    /// Coordinates of the searched location, enabling `distance_to_target`.
    pub fn with_target(mut self, target: Option<Coordinates>) -> Self {
        self.target = target;
        self
    }

    pub fn canonicalize(&self, platform: Platform, record: &RawListingRecord) -> Result<Listing, MalformedRecord> {
        let id = record.external_id.trim().to_string();
        let missing = |field: &'static str| MalformedRecord::MissingField {
            id: id.clone(),
            field,
        };

        if id.is_empty() {
            return Err(missing("external_id"));
        }
        if record.url.trim().is_empty() {
            return Err(missing("url"));
        }
        let title = collapse_ws(&record.title);
        if title.is_empty() {
            return Err(missing("title"));
        }

        let price_text = record.price_text.as_deref().ok_or_else(|| missing("price"))?;
        let price = self
            .to_reference(price_text, record.currency_hint.as_deref())
            .map_err(|failure| failure.into_malformed(&id, price_text))?;

        let nights = f64::from(self.nights);
        let (nightly, stay) = match record.price_basis {
            PriceBasis::PerNight => (price, price * nights),
            PriceBasis::Stay => (price / nights, price),
        };

        // Fees share the price's currency unless they show their own
        let fee_currency = parse_money(price_text)
            .and_then(|m| m.currency)
            .or_else(|| record.currency_hint.clone());
        let fees: Option<f64> = record
            .fee_texts
            .iter()
            .map(|fee| self.to_reference(fee, fee_currency.as_deref()).ok())
            .sum();

        let rating = record
            .rating_text
            .as_deref()
            .and_then(|text| normalize_rating(text, record.rating_scale));

        let amenities: BTreeSet<String> = record
            .amenities
            .iter()
            .map(|a| canonical_amenity(a))
            .filter(|a| !a.is_empty())
            .collect();

        let distance_to_target = match (self.target, record.coordinates) {
            (Some(target), Some(here)) => Some((target.distance_km(&here) * 1000.0).round() / 1000.0),
            _ => None,
        };

        let property_type = record
            .property_type_hint
            .as_deref()
            .map(PropertyType::from_hint)
            .unwrap_or_default();

        Ok(Listing {
            platform,
            external_id: id,
            title,
            price_per_night: round_cents(nightly),
            total_price: fees.map(|fees| round_cents(stay + fees)),
            rating,
            review_count: record.rating_text.as_deref().and_then(parse_review_count),
            amenities,
            location_text: collapse_ws(&record.location_text),
            distance_to_target,
            url: record.url.trim().to_string(),
            property_type,
            details: None,
        })
    }

    /// Fold a listing page into `listing`.
    ///
    /// When the page itemizes cleaning, service or tax fees the stay total
    /// is rebuilt from them; a fee that cannot be converted leaves the total
    /// absent. The nightly price is never touched.
    pub fn enrich(&self, listing: &mut Listing, raw: &RawPropertyDetails) {
        let mut details = PropertyDetails {
            description: raw.description.as_deref().map(collapse_ws),
            host_name: raw.host_name.as_deref().map(|name| {
                let name = collapse_ws(name);
                name.strip_prefix("Hosted by ").map(str::to_string).unwrap_or(name)
            }),
            host_rating: raw
                .host_rating_text
                .as_deref()
                .and_then(|text| normalize_rating(text, raw.host_rating_scale)),
            host_response_time: raw.host_response_time.clone(),
            instant_book: raw.instant_book,
            cancellation_policy: raw.cancellation_policy.clone(),
            house_rules: raw.house_rules.clone(),
            ..PropertyDetails::default()
        };

        for fact in &raw.facts {
            apply_fact(&mut details, fact);
        }

        let mut convertible = true;
        for line in &raw.fee_lines {
            let kind = match fee_kind(line) {
                Some(kind) => kind,
                None => continue,
            };
            // "Cleaning fee included" carries no amount
            if !line.chars().any(|c| c.is_ascii_digit()) {
                continue;
            }
            let amount = match self.to_reference(line, raw.currency_hint.as_deref()) {
                Ok(amount) => round_cents(amount),
                Err(_) => {
                    if kind != FeeKind::Deposit {
                        convertible = false;
                    }
                    continue;
                }
            };
            let slot = match kind {
                FeeKind::Cleaning => &mut details.cleaning_fee,
                FeeKind::Service => &mut details.service_fee,
                FeeKind::Taxes => &mut details.taxes,
                FeeKind::Deposit => &mut details.security_deposit,
            };
            *slot = Some(round_cents(slot.unwrap_or(0.0) + amount));
        }

        let itemized = [details.cleaning_fee, details.service_fee, details.taxes];
        if !convertible {
            listing.total_price = None;
        } else if itemized.iter().any(Option::is_some) {
            let fees: f64 = itemized.iter().flatten().sum();
            let stay = listing.price_per_night * f64::from(self.nights);
            listing.total_price = Some(round_cents(stay + fees));
        }

        listing.amenities.extend(
            raw.amenities
                .iter()
                .map(|a| canonical_amenity(a))
                .filter(|a| !a.is_empty()),
        );
        listing.details = Some(details);
    }

    fn to_reference(&self, text: &str, currency_hint: Option<&str>) -> Result<f64, PriceFailure> {
        let money = parse_money(text).ok_or(PriceFailure::Unparseable)?;
        let currency = money
            .currency
            .or_else(|| currency_hint.map(str::to_uppercase))
            .ok_or(PriceFailure::Unparseable)?;

        let rate = self
            .rates
            .rate(&currency, &self.reference_currency, self.as_of)
            .map_err(PriceFailure::Rate)?;
        Ok(money.amount * rate)
    }
}

enum PriceFailure {
    Unparseable,
    Rate(crate::error::RateConversionUnavailable),
}

impl PriceFailure {
    fn into_malformed(self, id: &str, text: &str) -> MalformedRecord {
        match self {
            PriceFailure::Unparseable => MalformedRecord::Price {
                id: id.to_string(),
                text: text.to_string(),
            },
            PriceFailure::Rate(source) => MalformedRecord::Rate {
                id: id.to_string(),
                source,
            },
        }
    }
}
