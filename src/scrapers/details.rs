//! Listing pages: the fields a results card does not show.

use super::parse::{collapse_ws, document_has, selector, text_of, texts_of};
use super::types::RawPropertyDetails;
use crate::error::AdapterError;
use scraper::Html;

/// Where one platform keeps each detail on a listing page
pub struct DetailSelectors {
    /// Present on every rendered listing page
    pub root: &'static str,
    pub description: &'static str,
    pub facts: &'static str,
    pub fee_lines: &'static str,
    pub host_name: &'static str,
    pub host_rating: &'static str,
    pub host_response_time: &'static str,
    pub instant_book: &'static str,
    pub cancellation: &'static str,
    pub amenities: &'static str,
    pub house_rules: &'static str,
}

/// Parse a rendered listing page.
///
/// Every field is optional except `root`: a page without it was not a
/// listing page (removed listing, captcha, error page).
pub fn parse_details(
    html: &str,
    css: &DetailSelectors,
    host_rating_scale: f64,
    currency_hint: Option<String>,
) -> Result<RawPropertyDetails, AdapterError> {
    let document = Html::parse_document(html);
    if !document_has(&document, &selector(css.root)?) {
        return Err(AdapterError::Extraction("listing page not rendered".to_string()));
    }
    let page = document.root_element();

    // "4 guests · 2 bedrooms · 1 bath" arrives as one line on some layouts
    let facts = texts_of(&page, &selector(css.facts)?)
        .iter()
        .flat_map(|line| line.split('·').map(collapse_ws).collect::<Vec<_>>())
        .filter(|fact| !fact.is_empty())
        .collect();

    Ok(RawPropertyDetails {
        description: text_of(&page, &selector(css.description)?),
        facts,
        fee_lines: texts_of(&page, &selector(css.fee_lines)?),
        currency_hint,
        host_name: text_of(&page, &selector(css.host_name)?),
        host_rating_text: text_of(&page, &selector(css.host_rating)?),
        host_rating_scale,
        host_response_time: text_of(&page, &selector(css.host_response_time)?),
        instant_book: document_has(&document, &selector(css.instant_book)?),
        cancellation_policy: text_of(&page, &selector(css.cancellation)?),
        amenities: texts_of(&page, &selector(css.amenities)?),
        house_rules: texts_of(&page, &selector(css.house_rules)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSS: DetailSelectors = DetailSelectors {
        root: "main#listing",
        description: "#about",
        facts: "ul.facts li",
        fee_lines: "#fees li",
        host_name: "#host .name",
        host_rating: "#host .rating",
        host_response_time: "#host .response",
        instant_book: ".instant",
        cancellation: "#cancellation",
        amenities: "#amenities li",
        house_rules: "#rules li",
    };

    #[test]
    fn test_parse_listing_page() {
        let html = r#"<html><body><main id="listing">
            <p id="about">Stone house   above the old town.</p>
            <ul class="facts"><li>4 guests · 2 bedrooms · 1.5 baths</li></ul>
            <ul id="fees"><li>Cleaning fee €40</li><li>Service fee €55</li></ul>
            <div id="host"><span class="name">Milica</span><span class="rating">4.9</span></div>
            <ul id="amenities"><li>Sea view</li><li>Washer</li></ul>
            <ul id="rules"><li>No parties</li><li>Check-in after 14:00</li></ul>
        </main></body></html>"#;

        let details = parse_details(html, &CSS, 5.0, Some("EUR".to_string())).unwrap();

        assert_eq!(details.description.as_deref(), Some("Stone house above the old town."));
        assert_eq!(details.facts, vec!["4 guests", "2 bedrooms", "1.5 baths"]);
        assert_eq!(details.fee_lines, vec!["Cleaning fee €40", "Service fee €55"]);
        assert_eq!(details.host_name.as_deref(), Some("Milica"));
        assert_eq!(details.host_rating_text.as_deref(), Some("4.9"));
        assert_eq!(details.host_response_time, None);
        assert!(!details.instant_book);
        assert_eq!(details.amenities, vec!["Sea view", "Washer"]);
        assert_eq!(details.house_rules.len(), 2);
        assert_eq!(details.currency_hint.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_page_without_listing_is_an_extraction_error() {
        let err = parse_details("<html><body>Not found</body></html>", &CSS, 5.0, None).unwrap_err();
        assert!(matches!(err, AdapterError::Extraction(_)));
    }
}
