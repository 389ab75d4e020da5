use super::details::{parse_details, DetailSelectors};
use super::parse::{absolute_url, attr_of, collapse_ws, document_has, selector, text_of};
use super::session::Session;
use super::traits::PlatformAdapter;
use super::types::{AdapterSettings, FilterReport, PriceBasis, RawListingRecord, RawPropertyDetails};
use crate::error::AdapterError;
use crate::geo::Coordinates;
use crate::models::{Listing, Platform, PropertyType, SearchCriteria};
use async_trait::async_trait;
use chrono::NaiveDate;
use scraper::Html;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.airbnb.com/";

const QUERY_INPUT: &str = "input[data-testid='structured-search-input-field-query']";
const QUERY_SUGGESTION: &str = "[data-testid='structured-search-input-field-query-item']";
const DATES_TOGGLE: &str = "[data-testid='structured-search-input-field-split-dates-0']";
const GUESTS_TOGGLE: &str = "[data-testid='structured-search-input-field-guests-button']";
const ADULTS_INCREASE: &str = "[data-testid='stepper-adults-increase-button']";
const SEARCH_BUTTON: &str = "[data-testid='structured-search-input-search-button']";

const LISTING_CARD: &str = "[data-testid='listing-card']";
const EMPTY_STATE: &str = "[data-testid='search-empty-state']";
const NEXT_PAGE: &str = "nav[aria-label='Search results pagination'] a[aria-label='Next']:not([aria-disabled='true'])";

const CARD_NAME: &str = "[data-testid='listing-card-name']";
const CARD_TITLE: &str = "[data-testid='listing-card-title']";
const CARD_LOCATION: &str = "[data-testid='listing-card-location']";
const CARD_PRICE: &str = "[data-testid='listing-card-price']";
const CARD_RATING: &str = "[data-testid='listing-card-rating']";
const CARD_SUBTITLE: &str = "[data-testid='listing-card-subtitle']";
const ROOM_LINK: &str = "a[href*='/rooms/']";
const LATITUDE: &str = "meta[itemprop='latitude']";
const LONGITUDE: &str = "meta[itemprop='longitude']";

const FILTERS_TOGGLE: &str = "[data-testid='filter-button']";
const FILTERS_SHOW: &str = "[data-testid='filter-button-show']";
const PRICE_MAX_INPUT: &str = "input[data-testid='price-max-input']";

const ROOM_PAGE: DetailSelectors = DetailSelectors {
    root: "[data-section-id='TITLE_DEFAULT'], [data-testid='description']",
    description: "[data-testid='description']",
    facts: "[data-testid='property-details'] span, [data-section-id='OVERVIEW_DEFAULT'] li",
    fee_lines: "[data-testid='price-breakdown'] div",
    host_name: "[data-testid='host-profile'] [data-testid='host-name']",
    host_rating: "[data-testid='host-profile'] [data-testid='host-rating']",
    host_response_time: "[data-testid='host-profile'] [data-testid='response-time']",
    instant_book: "[data-testid='instant-book']",
    cancellation: "[data-section-id='POLICIES_DEFAULT'] [data-testid='cancellation-policy']",
    amenities: "[data-testid='amenities'] li",
    house_rules: "[data-testid='house-rules'] li",
};

fn property_type_filter(property_type: PropertyType) -> &'static str {
    match property_type {
        PropertyType::EntirePlace => "[data-testid='entire-place-filter']",
        PropertyType::PrivateRoom => "[data-testid='private-room-filter']",
        PropertyType::SharedRoom => "[data-testid='shared-room-filter']",
    }
}

fn room_type_param(property_type: PropertyType) -> &'static str {
    match property_type {
        PropertyType::EntirePlace => "Entire home/apt",
        PropertyType::PrivateRoom => "Private room",
        PropertyType::SharedRoom => "Shared room",
    }
}

fn amenity_id(amenity: &str) -> Option<u32> {
    match amenity {
        "wifi" => Some(4),
        "air_conditioning" => Some(5),
        "pool" => Some(7),
        "kitchen" => Some(8),
        "parking" => Some(9),
        "gym" => Some(15),
        "heating" => Some(30),
        "washer" => Some(33),
        "dryer" => Some(34),
        "tv" => Some(58),
        _ => None,
    }
}

fn calendar_day(date: NaiveDate) -> String {
    format!("[data-testid='calendar-day-{}']", date.format("%Y-%m-%d"))
}

/// Airbnb adapter.
///
/// Card prices are nightly unless the card only shows a stay total;
/// ratings run 0–5.
pub struct AirbnbAdapter {
    settings: AdapterSettings,
}

impl AirbnbAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    pub fn search_url(&self, criteria: &SearchCriteria) -> Result<String, AdapterError> {
        let mut url =
            Url::parse(&self.settings.base_url).map_err(|e| AdapterError::FormFill(format!("bad base url: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| AdapterError::FormFill("base url cannot carry a path".to_string()))?
            .clear()
            .push("s")
            .push(criteria.location())
            .push("homes");

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("adults", &criteria.guests().to_string())
                .append_pair("checkin", &criteria.check_in().format("%Y-%m-%d").to_string())
                .append_pair("checkout", &criteria.check_out().format("%Y-%m-%d").to_string())
                .append_pair("display_currency", &self.settings.currency)
                .append_pair("room_types[]", room_type_param(criteria.property_type()));
            if let Some(max) = criteria.max_price_per_night() {
                query.append_pair("price_max", &max.ceil().to_string());
            }
        }

        Ok(url.to_string())
    }

    fn settle(&self) -> Duration {
        self.settings.settle
    }

    async fn on_results_page(&self, session: &Session) -> Result<bool, AdapterError> {
        Ok(session.exists(LISTING_CARD).await? || session.exists(EMPTY_STATE).await?)
    }

    async fn fill_search_form(&self, session: &mut Session, criteria: &SearchCriteria) -> Result<bool, AdapterError> {
        if !session.fill(QUERY_INPUT, criteria.location()).await? {
            return Ok(false);
        }
        session.settle(self.settle()).await;
        if !session.click(QUERY_SUGGESTION).await? {
            debug!("No location suggestion for {}", criteria.location());
        }

        session.click(DATES_TOGGLE).await?;
        for date in [criteria.check_in(), criteria.check_out()] {
            if !session.click(&calendar_day(date)).await? {
                debug!("Calendar has no day {}", date);
                return Ok(false);
            }
        }

        if !session.click(GUESTS_TOGGLE).await? {
            return Ok(false);
        }
        for _ in 0..criteria.guests() {
            if !session.click(ADULTS_INCREASE).await? {
                return Ok(false);
            }
        }

        if !session.click(SEARCH_BUTTON).await? {
            return Ok(false);
        }
        session.settle(self.settle()).await;
        Ok(true)
    }

    /// Parse one rendered results page.
    pub fn parse_results(&self, html: &str, page_url: &str) -> Result<Vec<RawListingRecord>, AdapterError> {
        let document = Html::parse_document(html);
        let card_sel = selector(LISTING_CARD)?;

        let cards: Vec<_> = document
            .select(&card_sel)
            .take(self.settings.max_results_per_page)
            .collect();

        if cards.is_empty() {
            if document_has(&document, &selector(EMPTY_STATE)?) {
                info!("Airbnb reports no homes for this search");
                return Ok(Vec::new());
            }
            return Err(AdapterError::EmptyPage);
        }

        let name_sel = selector(CARD_NAME)?;
        let title_sel = selector(CARD_TITLE)?;
        let location_sel = selector(CARD_LOCATION)?;
        let price_sel = selector(CARD_PRICE)?;
        let rating_sel = selector(CARD_RATING)?;
        let subtitle_sel = selector(CARD_SUBTITLE)?;
        let link_sel = selector(ROOM_LINK)?;
        let lat_sel = selector(LATITUDE)?;
        let lng_sel = selector(LONGITUDE)?;

        let mut records = Vec::with_capacity(cards.len());
        for card in &cards {
            let url = attr_of(card, &link_sel, "href")
                .map(|href| absolute_url(page_url, &href))
                .unwrap_or_default();
            let external_id = room_id(&url).unwrap_or_default();

            let title_line = text_of(card, &title_sel);
            let title = text_of(card, &name_sel)
                .or_else(|| title_line.clone())
                .unwrap_or_default();

            let price_line = text_of(card, &price_sel);
            let (price_text, price_basis) = match price_line.as_deref().map(price_quote) {
                Some((quote, basis)) => (Some(quote), basis),
                None => (None, PriceBasis::PerNight),
            };

            let amenities = text_of(card, &subtitle_sel)
                .map(|line| {
                    line.split('·')
                        .map(collapse_ws)
                        .filter(|part| !part.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            let coordinates = match (attr_of(card, &lat_sel, "content"), attr_of(card, &lng_sel, "content")) {
                (Some(lat), Some(lng)) => Coordinates::parse_pair(&format!("{},{}", lat, lng)),
                _ => None,
            };

            debug!("Airbnb card {:?}: {:?} ({:?})", external_id, price_text, price_basis);

            records.push(RawListingRecord {
                external_id,
                title,
                price_text: price_text.clone(),
                price_basis,
                currency_hint: Some(self.settings.currency.clone()),
                fee_texts: Vec::new(),
                rating_text: text_of(card, &rating_sel),
                rating_scale: 5.0,
                amenities,
                location_text: text_of(card, &location_sel).unwrap_or_default(),
                coordinates,
                url,
                property_type_hint: title_line,
                raw_data: json!({
                    "scraped_from": "airbnb_results",
                    "page_url": page_url,
                    "price_text": price_line,
                }),
            });
        }

        Ok(records)
    }
}

/// "night" and "/night" mark a nightly quote, "total" a stay total.
/// "14 nights" is a stay length, not a marker.
fn price_marker(word: &str) -> Option<PriceBasis> {
    let word = word.trim_matches(|c: char| !c.is_alphabetic()).to_lowercase();
    match word.as_str() {
        "night" => Some(PriceBasis::PerNight),
        "total" => Some(PriceBasis::Stay),
        _ => None,
    }
}

/// Split a card price line into quotes, each ending at its marker:
/// "€38 night · €532 total" → [("€38 night", PerNight), ("€532 total", Stay)].
fn price_segments(line: &str) -> Vec<(String, Option<PriceBasis>)> {
    let spaced = line.replace('·', " · ");
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut basis = None;

    for word in spaced.split_whitespace() {
        if word == "·" {
            if !current.is_empty() {
                segments.push((current.join(" "), basis.take()));
                current.clear();
            }
            continue;
        }
        current.push(word);
        if let Some(marker) = price_marker(word) {
            basis = Some(marker);
            // "Total $532" keeps its leading marker
            if current.iter().any(|w| w.chars().any(|c| c.is_ascii_digit())) {
                segments.push((current.join(" "), basis.take()));
                current.clear();
            }
        }
    }
    if !current.is_empty() {
        segments.push((current.join(" "), basis));
    }
    segments
}

/// "$35", "€38", "US$40": an amount led by a currency symbol
fn is_symbol_amount(word: &str) -> bool {
    match word.find(|c: char| c.is_ascii_digit()) {
        Some(at) => word[..at].chars().any(|c| !c.is_alphanumeric()),
        None => false,
    }
}

/// A discounted card shows the struck-out price first: "$40 $35 night".
/// Keep the quote from the last symbol-led amount on.
fn current_amount(quote: &str) -> String {
    let words: Vec<&str> = quote.split_whitespace().collect();
    let amounts = words.iter().filter(|word| is_symbol_amount(word)).count();
    match words.iter().rposition(|word| is_symbol_amount(word)) {
        Some(at) if amounts > 1 => words[at..].join(" "),
        _ => quote.to_string(),
    }
}

/// The nightly quote when the card shows one, else the stay total.
fn price_quote(line: &str) -> (String, PriceBasis) {
    let segments = price_segments(line);
    for wanted in [PriceBasis::PerNight, PriceBasis::Stay] {
        if let Some((quote, _)) = segments.iter().find(|(_, basis)| *basis == Some(wanted)) {
            return (current_amount(quote), wanted);
        }
    }
    (current_amount(line), PriceBasis::PerNight)
}

/// "https://www.airbnb.com/rooms/48213?check_in=…" → "48213"
fn room_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    segments.find(|segment| *segment == "rooms")?;
    let id = segments.next()?;
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
        Some(id.to_string())
    } else {
        None
    }
}

#[async_trait]
impl PlatformAdapter for AirbnbAdapter {
    fn platform(&self) -> Platform {
        Platform::Airbnb
    }

    async fn navigate(&self, session: &mut Session, _criteria: &SearchCriteria) -> Result<(), AdapterError> {
        info!("Opening Airbnb search page...");
        session.load(&self.settings.base_url, self.settle()).await?;
        session.dismiss_interstitial().await?;

        if !session.exists(QUERY_INPUT).await? {
            return Err(AdapterError::Navigation("Airbnb search bar not reachable".to_string()));
        }
        Ok(())
    }

    async fn apply_criteria(&self, session: &mut Session, criteria: &SearchCriteria) -> Result<(), AdapterError> {
        let submitted = self.fill_search_form(session, criteria).await?;

        if !submitted || !self.on_results_page(session).await? {
            info!("Airbnb search form incomplete, loading results URL directly");
            let url = self.search_url(criteria)?;
            session.load(&url, self.settle()).await?;
            session.dismiss_interstitial().await?;
        }

        if !self.on_results_page(session).await? {
            return Err(AdapterError::FormFill("Airbnb results page not reached".to_string()));
        }

        session.set_page(1);
        Ok(())
    }

    async fn apply_filters(&self, session: &mut Session, criteria: &SearchCriteria) -> FilterReport {
        let mut report = FilterReport::default();
        let property_label = format!("property_type:{:?}", criteria.property_type());
        let amenities = criteria.amenities();

        if !session.click_or_skip(FILTERS_TOGGLE).await {
            debug!("Airbnb filter panel not available");
            report.skipped(property_label);
            if criteria.max_price_per_night().is_some() {
                report.skipped("max_price");
            }
            for amenity in amenities {
                report.skipped(format!("amenity:{}", amenity));
            }
            return report;
        }

        if session.click_or_skip(property_type_filter(criteria.property_type())).await {
            report.applied(property_label);
        } else {
            report.skipped(property_label);
        }

        if let Some(max) = criteria.max_price_per_night() {
            if session.fill_or_skip(PRICE_MAX_INPUT, &max.ceil().to_string()).await {
                report.applied("max_price");
            } else {
                report.skipped("max_price");
            }
        }

        for amenity in amenities {
            let clicked = match amenity_id(amenity) {
                Some(id) => session.click_or_skip(&format!("#filter-item-amenities-{}", id)).await,
                None => false,
            };
            let label = format!("amenity:{}", amenity);
            if clicked {
                report.applied(label);
            } else {
                report.skipped(label);
            }
        }

        session.click_or_skip(FILTERS_SHOW).await;
        session.settle(self.settle()).await;
        report
    }

    async fn extract_page(&self, session: &Session) -> Result<Vec<RawListingRecord>, AdapterError> {
        let html = session.html().await?;
        let page_url = session.current_url().await?;
        let records = self.parse_results(&html, &page_url)?;
        info!("Extracted {} Airbnb cards from page {}", records.len(), session.page());
        Ok(records)
    }

    async fn has_next_page(&self, session: &Session) -> Result<bool, AdapterError> {
        Ok(session.exists(NEXT_PAGE).await?)
    }

    async fn next_page(&self, session: &mut Session) -> Result<(), AdapterError> {
        if !session.click(NEXT_PAGE).await? {
            return Err(AdapterError::Extraction("Airbnb next-page link vanished".to_string()));
        }
        session.settle(self.settle()).await;
        session.set_page(session.page() + 1);
        Ok(())
    }

    async fn property_details(
        &self,
        session: &mut Session,
        listing: &Listing,
    ) -> Result<Option<RawPropertyDetails>, AdapterError> {
        session.load(&listing.url, self.settle()).await?;
        session.dismiss_interstitial().await?;
        let html = session.html().await?;
        let details = parse_details(&html, &ROOM_PAGE, 5.0, Some(self.settings.currency.clone()))?;
        debug!("Airbnb room {}: {} fee lines", listing.external_id, details.fee_lines.len());
        Ok(Some(details))
    }
}
