use super::details::{parse_details, DetailSelectors};
use super::parse::{absolute_url, attr_of, document_has, selector, text_of, texts_of};
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

pub const DEFAULT_BASE_URL: &str = "https://www.booking.com/";

const DESTINATION_INPUT: &str = "input[name='ss']";
const AUTOCOMPLETE_SUGGESTIONS: &[&str] = &["[data-testid='autocomplete-result']", ".c-autocomplete__item"];
const DATES_TOGGLE: &str = "[data-testid='date-display-field-start']";
const OCCUPANCY_TOGGLE: &str = "button[data-testid='occupancy-config']";
const ADULTS_INPUT: &str = "input[name='group_adults']";
const SUBMIT: &str = "button[type='submit']";

const PROPERTY_CARD: &str = "[data-testid='property-card']";
const NO_RESULTS: &str = "[data-testid='no-results-message']";
const NEXT_PAGE: &str = "button[aria-label='Next page']:not([disabled])";

const TITLE: &str = "[data-testid='title']";
const TITLE_LINK: &str = "a[data-testid='title-link']";
const ANY_LINK: &str = "a[href]";
const PRICE: &str = "[data-testid='price-and-discounted-price']";
const TAXES: &str = "[data-testid='taxes-and-charges']";
const REVIEW_SCORE: &str = "[data-testid='review-score']";
const ADDRESS: &str = "[data-testid='address']";
const MAP_LINK: &str = "[data-atlas-latlng]";
const FACILITY: &str = "[data-testid='facility']";
const UNIT_CONFIGURATION: &str = "[data-testid='property-card-unit-configuration']";

const PRICE_MAX_INPUT: &str = "input[data-testid='price-max']";

const PROPERTY_PAGE: DetailSelectors = DetailSelectors {
    root: "#hp_hotel_name, [data-testid='property-description']",
    description: "[data-testid='property-description']",
    facts: "[data-testid='property-highlights'] li",
    fee_lines: "[data-testid='price-breakdown'] div",
    host_name: "[data-testid='host-profile'] [data-testid='host-name']",
    host_rating: "[data-testid='host-profile'] [data-testid='host-rating']",
    host_response_time: "[data-testid='host-profile'] [data-testid='response-time']",
    instant_book: "[data-testid='instant-confirmation']",
    cancellation: "[data-testid='cancellation-policy']",
    amenities: "[data-testid='property-most-popular-facilities-wrapper'] li",
    house_rules: "[data-testid='house-rules'] li",
};

fn property_type_filter(property_type: PropertyType) -> Option<&'static str> {
    match property_type {
        PropertyType::EntirePlace => Some("[data-filters-item='privacy_type:3']"),
        PropertyType::PrivateRoom => Some("[data-filters-item='privacy_type:2']"),
        // Booking has no shared-room category
        PropertyType::SharedRoom => None,
    }
}

fn amenity_filter(amenity: &str) -> Option<&'static str> {
    match amenity {
        "wifi" => Some("[data-filters-item='hotelfacility:107']"),
        "parking" => Some("[data-filters-item='hotelfacility:2']"),
        "restaurant" => Some("[data-filters-item='hotelfacility:3']"),
        "pet_friendly" => Some("[data-filters-item='hotelfacility:4']"),
        "gym" => Some("[data-filters-item='hotelfacility:11']"),
        "spa" => Some("[data-filters-item='hotelfacility:54']"),
        "pool" => Some("[data-filters-item='hotelfacility:433']"),
        "air_conditioning" => Some("[data-filters-item='roomfacility:11']"),
        "kitchen" => Some("[data-filters-item='roomfacility:999']"),
        "balcony" => Some("[data-filters-item='roomfacility:17']"),
        "sea_view" => Some("[data-filters-item='roomfacility:81']"),
        _ => None,
    }
}

fn date_cell(date: NaiveDate) -> String {
    format!("[data-date='{}']", date.format("%Y-%m-%d"))
}

/// Booking.com adapter.
///
/// Prices on result cards cover the whole stay and review scores run 0–10.
pub struct BookingAdapter {
    settings: AdapterSettings,
}

impl BookingAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    /// Direct results URL encoding location, dates and guests.
    pub fn search_url(&self, criteria: &SearchCriteria) -> Result<String, AdapterError> {
        let mut url = Url::parse(&self.settings.base_url)
            .and_then(|base| base.join("searchresults.html"))
            .map_err(|e| AdapterError::FormFill(format!("bad base url: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("ss", criteria.location())
            .append_pair("checkin", &criteria.check_in().format("%Y-%m-%d").to_string())
            .append_pair("checkout", &criteria.check_out().format("%Y-%m-%d").to_string())
            .append_pair("group_adults", &criteria.guests().to_string())
            .append_pair("no_rooms", "1")
            .append_pair("group_children", "0")
            .append_pair("selected_currency", &self.settings.currency)
            .append_pair("order", "price");

        Ok(url.to_string())
    }

    fn settle(&self) -> Duration {
        self.settings.settle
    }

    async fn on_results_page(&self, session: &Session) -> Result<bool, AdapterError> {
        Ok(session.exists(PROPERTY_CARD).await? || session.exists(NO_RESULTS).await?)
    }

    /// Drive the search box. Returns false as soon as a control is missing.
    async fn fill_search_form(&self, session: &mut Session, criteria: &SearchCriteria) -> Result<bool, AdapterError> {
        if !session.fill(DESTINATION_INPUT, criteria.location()).await? {
            return Ok(false);
        }
        session.settle(self.settle()).await;

        // Ambiguous destinations: always take the first suggestion
        if !session.click_first(AUTOCOMPLETE_SUGGESTIONS).await? {
            debug!("No autocomplete suggestion for {}", criteria.location());
        }

        session.click(DATES_TOGGLE).await?;
        for date in [criteria.check_in(), criteria.check_out()] {
            if !session.click(&date_cell(date)).await? {
                debug!("Calendar has no cell for {}", date);
                return Ok(false);
            }
        }

        session.click(OCCUPANCY_TOGGLE).await?;
        if !session.fill(ADULTS_INPUT, &criteria.guests().to_string()).await? {
            return Ok(false);
        }

        if !session.click(SUBMIT).await? {
            return Ok(false);
        }
        session.settle(self.settle()).await;
        Ok(true)
    }

    /// Parse one rendered results page.
    pub fn parse_results(&self, html: &str, page_url: &str) -> Result<Vec<RawListingRecord>, AdapterError> {
        let document = Html::parse_document(html);
        let card_sel = selector(PROPERTY_CARD)?;

        let cards: Vec<_> = document
            .select(&card_sel)
            .take(self.settings.max_results_per_page)
            .collect();

        if cards.is_empty() {
            if document_has(&document, &selector(NO_RESULTS)?) {
                info!("Booking reports no properties for this search");
                return Ok(Vec::new());
            }
            return Err(AdapterError::EmptyPage);
        }

        let title_sel = selector(TITLE)?;
        let title_link_sel = selector(TITLE_LINK)?;
        let any_link_sel = selector(ANY_LINK)?;
        let price_sel = selector(PRICE)?;
        let taxes_sel = selector(TAXES)?;
        let score_sel = selector(REVIEW_SCORE)?;
        let address_sel = selector(ADDRESS)?;
        let map_sel = selector(MAP_LINK)?;
        let facility_sel = selector(FACILITY)?;
        let unit_sel = selector(UNIT_CONFIGURATION)?;

        let currency_hint = query_param(page_url, "selected_currency");

        let mut records = Vec::with_capacity(cards.len());
        for card in &cards {
            let href = attr_of(card, &title_link_sel, "href").or_else(|| attr_of(card, &any_link_sel, "href"));
            let url = href.map(|href| absolute_url(page_url, &href)).unwrap_or_default();
            let external_id = property_slug(&url).unwrap_or_default();

            let title = text_of(card, &title_sel).unwrap_or_default();
            let price_text = text_of(card, &price_sel);

            // "Includes taxes and charges" carries no amount
            let fee_texts: Vec<String> = text_of(card, &taxes_sel)
                .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
                .into_iter()
                .collect();

            let coordinates = attr_of(card, &map_sel, "data-atlas-latlng").and_then(|pair| Coordinates::parse_pair(&pair));

            debug!("Booking card {:?}: {:?}", external_id, price_text);

            records.push(RawListingRecord {
                external_id,
                title,
                price_text: price_text.clone(),
                price_basis: PriceBasis::Stay,
                currency_hint: currency_hint.clone(),
                fee_texts,
                rating_text: text_of(card, &score_sel),
                rating_scale: 10.0,
                amenities: texts_of(card, &facility_sel),
                location_text: text_of(card, &address_sel).unwrap_or_default(),
                coordinates,
                url,
                property_type_hint: text_of(card, &unit_sel),
                raw_data: json!({
                    "scraped_from": "booking_results",
                    "page_url": page_url,
                    "price_text": price_text,
                }),
            });
        }

        Ok(records)
    }
}

/// "https://www.booking.com/hotel/me/villa-adriatic.en-gb.html?aid=1" → "me/villa-adriatic"
fn property_slug(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let path = parsed.path().strip_prefix("/hotel/")?;
    let stem = path.strip_suffix(".html").unwrap_or(path);
    // Drop a language suffix such as ".en-gb"
    let stem = stem.split('.').next().unwrap_or(stem);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

pub(crate) fn query_param(url: &str, key: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.to_uppercase())
}

#[async_trait]
impl PlatformAdapter for BookingAdapter {
    fn platform(&self) -> Platform {
        Platform::Booking
    }

    async fn navigate(&self, session: &mut Session, _criteria: &SearchCriteria) -> Result<(), AdapterError> {
        info!("Opening Booking.com search page...");
        session.load(&self.settings.base_url, self.settle()).await?;
        session.dismiss_interstitial().await?;

        if !session.exists(DESTINATION_INPUT).await? {
            return Err(AdapterError::Navigation("Booking search form not reachable".to_string()));
        }
        Ok(())
    }

    async fn apply_criteria(&self, session: &mut Session, criteria: &SearchCriteria) -> Result<(), AdapterError> {
        let submitted = self.fill_search_form(session, criteria).await?;

        if !submitted || !self.on_results_page(session).await? {
            info!("Booking search form incomplete, loading results URL directly");
            let url = self.search_url(criteria)?;
            session.load(&url, self.settle()).await?;
            session.dismiss_interstitial().await?;
        }

        if !self.on_results_page(session).await? {
            return Err(AdapterError::FormFill("Booking results page not reached".to_string()));
        }

        session.set_page(1);
        Ok(())
    }

    async fn apply_filters(&self, session: &mut Session, criteria: &SearchCriteria) -> FilterReport {
        let mut report = FilterReport::default();

        let property_label = format!("property_type:{:?}", criteria.property_type());
        let clicked = match property_type_filter(criteria.property_type()) {
            Some(sel) => session.click_or_skip(sel).await,
            None => false,
        };
        if clicked {
            report.applied(property_label);
        } else {
            report.skipped(property_label);
        }

        if let Some(max) = criteria.max_price_per_night() {
            let amount = max.ceil().to_string();
            if session.fill_or_skip(PRICE_MAX_INPUT, &amount).await {
                report.applied("max_price");
            } else {
                report.skipped("max_price");
            }
        }

        for amenity in criteria.amenities() {
            let label = format!("amenity:{}", amenity);
            let clicked = match amenity_filter(amenity) {
                Some(sel) => session.click_or_skip(sel).await,
                None => false,
            };
            if clicked {
                report.applied(label);
            } else {
                report.skipped(label);
            }
        }

        if !report.applied.is_empty() {
            session.settle(self.settle()).await;
        }
        report
    }

    async fn extract_page(&self, session: &Session) -> Result<Vec<RawListingRecord>, AdapterError> {
        let html = session.html().await?;
        let page_url = session.current_url().await?;
        let records = self.parse_results(&html, &page_url)?;
        info!("Extracted {} Booking cards from page {}", records.len(), session.page());
        Ok(records)
    }

    async fn has_next_page(&self, session: &Session) -> Result<bool, AdapterError> {
        Ok(session.exists(NEXT_PAGE).await?)
    }

    async fn next_page(&self, session: &mut Session) -> Result<(), AdapterError> {
        if !session.click(NEXT_PAGE).await? {
            return Err(AdapterError::Extraction("Booking next-page control vanished".to_string()));
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
        // Host scores on Booking use the same 0–10 scale as guest reviews
        let details = parse_details(&html, &PROPERTY_PAGE, 10.0, Some(self.settings.currency.clone()))?;
        debug!("Booking page {}: {} fee lines", listing.external_id, details.fee_lines.len());
        Ok(Some(details))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::scrapers::fake::FakeDriver;

    pub const HOME: &str = r#"<html><body>
        <div id="onetrust-banner"><button id="onetrust-accept-btn-handler">Accept</button></div>
        <form><input name="ss"><button type="submit">Search</button></form>
    </body></html>"#;

    pub const RESULTS: &str = r##"<html><body>
        <input name="ss">
        <div data-testid="property-card">
            <a data-testid="title-link" href="https://www.booking.com/hotel/me/villa-adriatic.en-gb.html?aid=1">
                <div data-testid="title">Villa Adriatic</div>
            </a>
            <span data-testid="address">Bar, Montenegro</span>
            <a data-atlas-latlng="42.0937,19.0984" href="#map">Show on map</a>
            <div data-testid="review-score"><div>Scored 8.6</div> <div>Excellent</div></div>
            <div data-testid="property-card-unit-configuration">Entire apartment • 1 bedroom</div>
            <span data-testid="facility">Free WiFi</span>
            <span data-testid="price-and-discounted-price">€&nbsp;392</span>
            <div data-testid="taxes-and-charges">+€ 28 taxes and charges</div>
        </div>
        <div data-testid="property-card">
            <a data-testid="title-link" href="/hotel/me/sunny-room.html">
                <div data-testid="title">Sunny Room</div>
            </a>
            <span data-testid="address">Sutomore</span>
            <div data-testid="property-card-unit-configuration">Private room</div>
            <span data-testid="price-and-discounted-price">€ 300</span>
            <div data-testid="taxes-and-charges">Includes taxes and charges</div>
        </div>
        <button aria-label="Next page">Next</button>
    </body></html>"##;

    pub const LAST_PAGE: &str = r#"<html><body>
        <div data-testid="property-card">
            <a data-testid="title-link" href="/hotel/me/old-town.html"><div data-testid="title">Old Town Flat</div></a>
            <span data-testid="price-and-discounted-price">€ 420</span>
        </div>
        <button aria-label="Next page" disabled>Next</button>
    </body></html>"#;

    pub fn settings(base_url: &str) -> AdapterSettings {
        AdapterSettings {
            base_url: base_url.to_string(),
            settle: Duration::ZERO,
            max_results_per_page: 20,
            currency: "EUR".to_string(),
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria::builder(
            "Bar, Montenegro",
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 15).unwrap(),
            2,
        )
        .max_price_per_night(40.0)
        .amenities(["wifi", "kitchen", "hot tub"])
        .build()
        .unwrap()
    }

    #[test]
    fn test_search_url_encodes_criteria() {
        let adapter = BookingAdapter::new(settings(DEFAULT_BASE_URL));
        let url = adapter.search_url(&criteria()).unwrap();

        assert!(url.starts_with("https://www.booking.com/searchresults.html?"));
        assert!(url.contains("ss=Bar%2C+Montenegro"));
        assert!(url.contains("checkin=2024-09-01"));
        assert!(url.contains("checkout=2024-09-15"));
        assert!(url.contains("group_adults=2"));
        assert!(url.contains("selected_currency=EUR"));
    }

    #[test]
    fn test_parse_results_page() {
        let adapter = BookingAdapter::new(settings(DEFAULT_BASE_URL));
        let records = adapter
            .parse_results(RESULTS, "https://www.booking.com/searchresults.html?selected_currency=eur")
            .unwrap();

        assert_eq!(records.len(), 2);

        let villa = &records[0];
        assert_eq!(villa.external_id, "me/villa-adriatic");
        assert_eq!(villa.title, "Villa Adriatic");
        assert_eq!(villa.price_text.as_deref(), Some("€ 392"));
        assert_eq!(villa.price_basis, PriceBasis::Stay);
        assert_eq!(villa.currency_hint.as_deref(), Some("EUR"));
        assert_eq!(villa.fee_texts, vec!["+€ 28 taxes and charges"]);
        assert_eq!(villa.rating_text.as_deref(), Some("Scored 8.6 Excellent"));
        assert_eq!(villa.rating_scale, 10.0);
        assert_eq!(villa.amenities, vec!["Free WiFi"]);
        assert_eq!(villa.coordinates, Some(Coordinates::new(42.0937, 19.0984)));

        let room = &records[1];
        assert_eq!(room.external_id, "me/sunny-room");
        assert_eq!(room.url, "https://www.booking.com/hotel/me/sunny-room.html");
        assert!(room.fee_texts.is_empty());
        assert_eq!(room.rating_text, None);
        assert_eq!(room.property_type_hint.as_deref(), Some("Private room"));
    }

    #[test]
    fn test_empty_page_needs_indicator() {
        let adapter = BookingAdapter::new(settings(DEFAULT_BASE_URL));
        let blank = "<html><body><div>loading…</div></body></html>";
        assert_eq!(
            adapter.parse_results(blank, DEFAULT_BASE_URL),
            Err(AdapterError::EmptyPage)
        );

        let none = r#"<html><body><div data-testid="no-results-message">No properties found</div></body></html>"#;
        assert_eq!(adapter.parse_results(none, DEFAULT_BASE_URL), Ok(Vec::new()));
    }

    #[test]
    fn test_results_capped_per_page() {
        let mut s = settings(DEFAULT_BASE_URL);
        s.max_results_per_page = 1;
        let adapter = BookingAdapter::new(s);
        assert_eq!(adapter.parse_results(RESULTS, DEFAULT_BASE_URL).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_navigate_accepts_consent_once() {
        let driver = FakeDriver::new().route("booking.test", HOME);
        let mut session = Session::new(Box::new(driver.clone()));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        adapter.navigate(&mut session, &criteria()).await.unwrap();
        adapter.navigate(&mut session, &criteria()).await.unwrap();

        assert_eq!(driver.count("click:#onetrust-accept-btn-handler"), 1);
    }

    #[tokio::test]
    async fn test_navigate_without_consent_banner() {
        let home = r#"<html><body><input name="ss"></body></html>"#;
        let driver = FakeDriver::new().route("booking.test", home);
        let mut session = Session::new(Box::new(driver.clone()));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        adapter.navigate(&mut session, &criteria()).await.unwrap();
        assert_eq!(driver.count("click:"), 0);
    }

    #[tokio::test]
    async fn test_navigate_fails_without_search_form() {
        let driver = FakeDriver::new().route("booking.test", "<html><body>Maintenance</body></html>");
        let mut session = Session::new(Box::new(driver));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        let err = adapter.navigate(&mut session, &criteria()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Navigation(_)));
    }

    #[tokio::test]
    async fn test_form_fill_picks_first_suggestion() {
        let home = r#"<html><body>
            <input name="ss">
            <ul><li data-testid="autocomplete-result">Bar, Montenegro</li><li data-testid="autocomplete-result">Bar, Ukraine</li></ul>
            <button data-testid="date-display-field-start">Dates</button>
            <span data-date="2024-09-01">1</span><span data-date="2024-09-15">15</span>
            <button data-testid="occupancy-config">Guests</button><input name="group_adults">
            <button type="submit">Search</button>
        </body></html>"#;
        let driver = FakeDriver::new()
            .route("booking.test", home)
            .route("booking.test/searchresults", RESULTS)
            .on_click(SUBMIT, "https://booking.test/searchresults.html?ss=Bar");
        let mut session = Session::new(Box::new(driver.clone()));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        adapter.navigate(&mut session, &criteria()).await.unwrap();
        adapter.apply_criteria(&mut session, &criteria()).await.unwrap();

        let log = driver.entries();
        assert!(log.contains(&"fill:input[name='ss']=Bar, Montenegro".to_string()));
        assert!(log.contains(&"click:[data-testid='autocomplete-result']".to_string()));
        assert!(log.contains(&"fill:input[name='group_adults']=2".to_string()));
        // Form reached results, so no direct-URL fallback
        assert_eq!(driver.count("goto:https://booking.test/searchresults.html?ss=Bar%2C"), 0);
        assert_eq!(session.page(), 1);
    }

    #[tokio::test]
    async fn test_missing_calendar_falls_back_to_search_url() {
        let driver = FakeDriver::new()
            .route("booking.test", HOME)
            .route("booking.test/searchresults", RESULTS);
        let mut session = Session::new(Box::new(driver.clone()));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        adapter.navigate(&mut session, &criteria()).await.unwrap();
        adapter.apply_criteria(&mut session, &criteria()).await.unwrap();

        assert_eq!(driver.count("goto:https://booking.test/searchresults.html?ss=Bar%2C+Montenegro"), 1);
    }

    #[tokio::test]
    async fn test_filters_report_skipped_controls() {
        let page = r#"<html><body>
            <div data-filters-item="privacy_type:3">Entire homes</div>
            <div data-filters-item="hotelfacility:107">Free WiFi</div>
        </body></html>"#;
        let driver = FakeDriver::new().route("booking.test", page);
        let mut session = Session::new(Box::new(driver));
        session.load("https://booking.test/", Duration::ZERO).await.unwrap();
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        let report = adapter.apply_filters(&mut session, &criteria()).await;

        assert_eq!(report.applied, vec!["property_type:EntirePlace", "amenity:wifi"]);
        assert_eq!(report.skipped, vec!["max_price", "amenity:hot tub", "amenity:kitchen"]);
    }

    #[tokio::test]
    async fn test_pagination_controls() {
        let driver = FakeDriver::new()
            .route("booking.test/page1", RESULTS)
            .route("booking.test/page2", LAST_PAGE)
            .on_click(NEXT_PAGE, "https://booking.test/page2");
        let mut session = Session::new(Box::new(driver));
        session.load("https://booking.test/page1", Duration::ZERO).await.unwrap();
        session.set_page(1);
        let adapter = BookingAdapter::new(settings("https://booking.test/"));

        assert!(adapter.has_next_page(&session).await.unwrap());
        adapter.next_page(&mut session).await.unwrap();
        assert_eq!(session.page(), 2);
        assert!(!adapter.has_next_page(&session).await.unwrap());

        let records = adapter.extract_page(&session).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_id, "me/old-town");
    }

    pub const PROPERTY: &str = r#"<html><body>
        <h2 id="hp_hotel_name">Villa Adriatic</h2>
        <div data-testid="property-description">Two floors, five minutes from the beach.</div>
        <ul data-testid="property-highlights"><li>2 bedrooms · 1 bathroom · Sleeps 4</li></ul>
        <div data-testid="price-breakdown"><div>Cleaning fee € 30</div><div>City tax € 14</div></div>
        <div data-testid="instant-confirmation">Instant confirmation</div>
        <div data-testid="cancellation-policy">Free cancellation before 25 August</div>
        <ul data-testid="property-most-popular-facilities-wrapper"><li>Free WiFi</li><li>Air conditioning</li></ul>
    </body></html>"#;

    #[tokio::test]
    async fn test_property_details_from_listing_page() {
        let driver = FakeDriver::new().route("booking.test/hotel/me/villa-adriatic", PROPERTY);
        let mut session = Session::new(Box::new(driver.clone()));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));
        let mut listing = crate::scoring::tests::listing(Platform::Booking, "me/villa-adriatic", 28.0);
        listing.url = "https://booking.test/hotel/me/villa-adriatic.html".to_string();

        let details = adapter.property_details(&mut session, &listing).await.unwrap().unwrap();

        assert_eq!(driver.count("goto:https://booking.test/hotel/me/villa-adriatic.html"), 1);
        assert_eq!(details.facts, vec!["2 bedrooms", "1 bathroom", "Sleeps 4"]);
        assert_eq!(details.fee_lines, vec!["Cleaning fee € 30", "City tax € 14"]);
        assert_eq!(details.host_rating_scale, 10.0);
        assert_eq!(details.currency_hint.as_deref(), Some("EUR"));
        assert!(details.instant_book);
        assert_eq!(details.amenities, vec!["Free WiFi", "Air conditioning"]);
    }

    #[tokio::test]
    async fn test_removed_property_page_is_an_error() {
        let driver = FakeDriver::new().route("booking.test", "<html><body>Page not found</body></html>");
        let mut session = Session::new(Box::new(driver));
        let adapter = BookingAdapter::new(settings("https://booking.test/"));
        let mut listing = crate::scoring::tests::listing(Platform::Booking, "me/gone", 28.0);
        listing.url = "https://booking.test/hotel/me/gone.html".to_string();

        let err = adapter.property_details(&mut session, &listing).await.unwrap_err();
        assert!(matches!(err, AdapterError::Extraction(_)));
    }
}
