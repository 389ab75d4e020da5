use super::traits::PageDriver;
use crate::error::RenderingError;
use std::time::Duration;
use tracing::{debug, warn};

/// Cookie/consent "accept" buttons seen across marketplaces
pub const CONSENT_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "button[data-testid='cookie-banner-accept']",
    "button[data-testid='accept-btn']",
    "button[aria-label*='Accept all']",
    "button[aria-label*='Accept']",
    ".cookie-accept",
];

/// A browser session lent to an adapter for one run.
///
/// Wraps the driver with the run's page counter and consent bookkeeping.
pub struct Session {
    driver: Box<dyn PageDriver>,
    page: u32,
    consent_dismissed: bool,
    closed: bool,
}

impl Session {
    pub fn new(driver: Box<dyn PageDriver>) -> Self {
        Self {
            driver,
            page: 0,
            consent_dismissed: false,
            closed: false,
        }
    }

    /// 1-based results page currently shown, 0 before the first results page.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page;
    }

    /// Forget run progress before a hard refresh from the entry point.
    pub fn restart(&mut self) {
        self.page = 0;
        self.consent_dismissed = false;
    }

    /// Navigate and give the page `settle` to finish rendering.
    pub async fn load(&mut self, url: &str, settle: Duration) -> Result<(), RenderingError> {
        debug!("Loading {}", url);
        self.driver.goto(url).await?;
        self.settle(settle).await;
        Ok(())
    }

    pub async fn settle(&self, settle: Duration) {
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
    }

    pub async fn html(&self) -> Result<String, RenderingError> {
        self.driver.html().await
    }

    pub async fn current_url(&self) -> Result<String, RenderingError> {
        self.driver.current_url().await
    }

    pub async fn exists(&self, selector: &str) -> Result<bool, RenderingError> {
        self.driver.exists(selector).await
    }

    pub async fn click(&mut self, selector: &str) -> Result<bool, RenderingError> {
        self.driver.click(selector).await
    }

    /// Click the first selector of `candidates` present on the page.
    pub async fn click_first(&mut self, candidates: &[&str]) -> Result<bool, RenderingError> {
        for selector in candidates {
            if self.driver.click(selector).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub async fn fill(&mut self, selector: &str, text: &str) -> Result<bool, RenderingError> {
        self.driver.fill(selector, text).await
    }

    /// Click for a best-effort step; rendering trouble counts as "not there".
    pub async fn click_or_skip(&mut self, selector: &str) -> bool {
        match self.driver.click(selector).await {
            Ok(clicked) => clicked,
            Err(e) => {
                warn!(selector, error = %e, "Optional control could not be clicked");
                false
            }
        }
    }

    pub async fn fill_or_skip(&mut self, selector: &str, text: &str) -> bool {
        match self.driver.fill(selector, text).await {
            Ok(filled) => filled,
            Err(e) => {
                warn!(selector, error = %e, "Optional field could not be filled");
                false
            }
        }
    }

    /// Accept a consent interstitial if one is showing.
    ///
    /// The interstitial shows up at most once per session; later calls are
    /// no-ops once it has been dismissed. Its absence is not an error.
    pub async fn dismiss_interstitial(&mut self) -> Result<bool, RenderingError> {
        if self.consent_dismissed {
            return Ok(false);
        }
        let dismissed = self.click_first(CONSENT_SELECTORS).await?;
        if dismissed {
            debug!("Dismissed consent interstitial");
            self.consent_dismissed = true;
        }
        Ok(dismissed)
    }

    /// Release the underlying browser tab. Safe to call more than once.
    pub async fn close(&mut self) -> Result<(), RenderingError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::fake::FakeDriver;

    const BANNER: &str = r#"<html><body><button aria-label="Accept all cookies">OK</button><a class="go">Go</a></body></html>"#;

    #[tokio::test]
    async fn test_interstitial_dismissed_once() {
        let driver = FakeDriver::new().route("site.test", BANNER);
        let mut session = Session::new(Box::new(driver.clone()));
        session.load("https://site.test/", Duration::ZERO).await.unwrap();

        assert!(session.dismiss_interstitial().await.unwrap());
        assert!(!session.dismiss_interstitial().await.unwrap());
        assert_eq!(driver.count("click:"), 1);

        // A hard refresh starts over, banner included
        session.restart();
        assert!(session.dismiss_interstitial().await.unwrap());
    }

    #[tokio::test]
    async fn test_click_first_takes_first_present() {
        let driver = FakeDriver::new().route("site.test", BANNER);
        let mut session = Session::new(Box::new(driver.clone()));
        session.load("https://site.test/", Duration::ZERO).await.unwrap();

        assert!(session.click_first(&[".missing", "a.go", "button"]).await.unwrap());
        assert_eq!(driver.entries().last().map(String::as_str), Some("click:a.go"));
        assert!(!session.click_first(&[".missing"]).await.unwrap());
        assert!(!session.fill_or_skip("input", "x").await);
    }

    #[tokio::test]
    async fn test_load_failure_surfaces_rendering_error() {
        let driver = FakeDriver::new().route("site.test", BANNER).fail_next_gotos(1);
        let mut session = Session::new(Box::new(driver));

        assert!(session.load("https://site.test/", Duration::ZERO).await.is_err());
        assert!(session.load("https://site.test/", Duration::ZERO).await.is_ok());
        assert!(session.load("https://elsewhere.test/", Duration::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let driver = FakeDriver::new();
        let mut session = Session::new(Box::new(driver.clone()));

        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(driver.count("close"), 1);
    }
}
