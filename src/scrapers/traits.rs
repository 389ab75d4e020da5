use super::session::Session;
use super::types::{FilterReport, RawListingRecord, RawPropertyDetails};
use crate::error::{AdapterError, RenderingError};
use crate::models::{Listing, Platform, SearchCriteria};
use async_trait::async_trait;

/// One exclusively owned browser tab.
///
/// Selector arguments are CSS selectors; interactions act on the first match.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Load `url` and wait for navigation to finish.
    async fn goto(&mut self, url: &str) -> Result<(), RenderingError>;

    /// Current rendered document.
    async fn html(&self) -> Result<String, RenderingError>;

    async fn current_url(&self) -> Result<String, RenderingError>;

    async fn exists(&self, selector: &str) -> Result<bool, RenderingError>;

    /// Returns false when nothing matched.
    async fn click(&mut self, selector: &str) -> Result<bool, RenderingError>;

    /// Replace the value of an input. Returns false when nothing matched.
    async fn fill(&mut self, selector: &str, text: &str) -> Result<bool, RenderingError>;

    /// Release the tab. Called exactly once per session.
    async fn close(&mut self) -> Result<(), RenderingError>;
}

/// Hands out fresh browser sessions
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>, RenderingError>;
}

/// The navigate / fill / filter / extract protocol against one marketplace.
///
/// Every step works on a session lent by the orchestrator, which owns the
/// session's lifetime and drives the steps strictly in order.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Open the search entry point, passing any consent interstitial.
    async fn navigate(&self, session: &mut Session, criteria: &SearchCriteria) -> Result<(), AdapterError>;

    /// Enter location, dates and guests and reach the results page.
    async fn apply_criteria(&self, session: &mut Session, criteria: &SearchCriteria) -> Result<(), AdapterError>;

    /// Best effort. Filters without a control on the page are reported as
    /// skipped rather than failing.
    async fn apply_filters(&self, session: &mut Session, criteria: &SearchCriteria) -> FilterReport;

    /// Parse the currently rendered results page only.
    async fn extract_page(&self, session: &Session) -> Result<Vec<RawListingRecord>, AdapterError>;

    async fn has_next_page(&self, session: &Session) -> Result<bool, AdapterError>;

    /// Move to the following results page.
    async fn next_page(&self, session: &mut Session) -> Result<(), AdapterError>;

    /// Read one listing's own page. `Ok(None)` means the platform has no
    /// detail page worth reading; the session may be left on that page.
    async fn property_details(
        &self,
        _session: &mut Session,
        _listing: &Listing,
    ) -> Result<Option<RawPropertyDetails>, AdapterError> {
        Ok(None)
    }
}
