//! Small DOM helpers shared by the platform adapters.

use crate::error::AdapterError;
use scraper::{ElementRef, Html, Selector};

/// Parse a CSS selector, reporting a bad one as an extraction failure.
pub fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Extraction(format!("bad selector {:?}: {}", css, e)))
}

/// Collapse runs of whitespace (including &nbsp;) into single spaces.
pub fn collapse_ws(text: &str) -> String {
    text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first `selector` match under `element`, if non-empty.
pub fn text_of(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    let node = element.select(selector).next()?;
    let text = collapse_ws(&node.text().collect::<String>());
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Attribute of the first `selector` match under `element`.
pub fn attr_of(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|node| node.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Texts of every `selector` match under `element`.
pub fn texts_of(element: &ElementRef<'_>, selector: &Selector) -> Vec<String> {
    element
        .select(selector)
        .map(|node| collapse_ws(&node.text().collect::<String>()))
        .filter(|text| !text.is_empty())
        .collect()
}

pub fn document_has(document: &Html, selector: &Selector) -> bool {
    document.select(selector).next().is_some()
}

/// Make a possibly relative link absolute against `base`.
pub fn absolute_url(base: &str, href: &str) -> String {
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_ws() {
        assert_eq!(collapse_ws("  Bar,\u{a0}\n Montenegro  "), "Bar, Montenegro");
        assert_eq!(collapse_ws("   "), "");
    }

    #[test]
    fn test_text_and_attr_helpers() {
        let html = Html::parse_fragment(
            r#"<div><span class="t">  Villa   Sun </span><span class="t">second</span><a href="/rooms/1"> x</a><span class="e"> </span></div>"#,
        );
        let root = html.root_element();
        let t = selector("span.t").unwrap();
        let a = selector("a").unwrap();
        let e = selector("span.e").unwrap();

        assert_eq!(text_of(&root, &t).as_deref(), Some("Villa Sun"));
        assert_eq!(texts_of(&root, &t), vec!["Villa Sun", "second"]);
        assert_eq!(attr_of(&root, &a, "href").as_deref(), Some("/rooms/1"));
        assert_eq!(text_of(&root, &e), None);
    }

    #[test]
    fn test_absolute_url() {
        assert_eq!(
            absolute_url("https://www.airbnb.com/s/Bar/homes", "/rooms/42?adults=2"),
            "https://www.airbnb.com/rooms/42?adults=2"
        );
        assert_eq!(
            absolute_url("https://www.booking.com/", "https://www.booking.com/hotel/me/x.html"),
            "https://www.booking.com/hotel/me/x.html"
        );
    }

    #[test]
    fn test_bad_selector_is_extraction_error() {
        assert!(matches!(selector("[[["), Err(AdapterError::Extraction(_))));
    }
}
