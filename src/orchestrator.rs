//! Drives every platform adapter through its search state machine and
//! collects the canonical listings into one [`SearchResult`].

use crate::canonical::Canonicalizer;
use crate::error::AdapterError;
use crate::geo::Coordinates;
use crate::models::{ListingSet, Platform, PlatformReport, PlatformStatus, SearchCriteria, SearchResult};
use crate::rates::CurrencyRates;
use crate::retry::RetryPolicy;
use crate::scoring::is_excluded;
use crate::scrapers::{AdapterState, DriverFactory, PlatformAdapter, Session};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

const CLOSE_GRACE: Duration = Duration::from_secs(5);
const TIMEOUT_REASON: &str = "timeout";

/// What one adapter run has gathered so far. Survives a timeout.
#[derive(Default)]
struct Progress {
    listings: ListingSet,
    pages: u32,
    malformed: usize,
    enriched: usize,
    skipped_filters: Vec<String>,
}

pub struct SearchOrchestrator {
    factory: Arc<dyn DriverFactory>,
    rates: Arc<dyn CurrencyRates>,
    policy: RetryPolicy,
    max_pages: u32,
    details_limit: usize,
    timeout: Duration,
    reference_currency: String,
    target: Option<Coordinates>,
}

impl SearchOrchestrator {
    pub fn new(factory: Arc<dyn DriverFactory>, rates: Arc<dyn CurrencyRates>) -> Self {
        Self {
            factory,
            rates,
            policy: RetryPolicy::default(),
            max_pages: 3,
            details_limit: 0,
            timeout: Duration::from_secs(300),
            reference_currency: "USD".to_string(),
            target: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Read the own page of up to `limit` cheapest in-budget listings per
    /// platform. Zero disables it.
    pub fn with_details_limit(mut self, limit: usize) -> Self {
        self.details_limit = limit;
        self
    }

    /// Budget for the whole search, shared by all adapters.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_reference_currency(mut self, currency: &str) -> Self {
        self.reference_currency = currency.to_uppercase();
        self
    }

    /// Coordinates of the searched location, used for distance scoring.
    pub fn with_target(mut self, target: Option<Coordinates>) -> Self {
        self.target = target;
        self
    }

    /// Run every adapter concurrently and merge what they found.
    ///
    /// Never fails: a platform that could not finish is reported in
    /// `platform_status` with its reason, and whatever it collected before
    /// failing is kept.
    pub async fn run(&self, criteria: &SearchCriteria, adapters: &[Arc<dyn PlatformAdapter>]) -> SearchResult {
        let deadline = Instant::now() + self.timeout;
        let canonicalizer =
            Canonicalizer::new(Arc::clone(&self.rates), &self.reference_currency, criteria).with_target(self.target);

        info!(
            "Searching {} platform(s) for {} ({} → {}, {} guests)",
            adapters.len(),
            criteria.location(),
            criteria.check_in(),
            criteria.check_out(),
            criteria.guests()
        );

        let runs = adapters
            .iter()
            .map(|adapter| self.run_adapter(adapter.as_ref(), criteria, &canonicalizer, deadline));
        let outcomes = join_all(runs).await;

        let mut listings = ListingSet::default();
        let mut platform_status = BTreeMap::new();
        for (platform, found, report) in outcomes {
            listings.extend(found);
            platform_status.insert(platform, report);
        }

        info!("Search finished with {} unique listings", listings.len());

        SearchResult {
            criteria: criteria.clone(),
            listings: listings.into_vec(),
            platform_status,
        }
    }

    async fn run_adapter(
        &self,
        adapter: &dyn PlatformAdapter,
        criteria: &SearchCriteria,
        canonicalizer: &Canonicalizer,
        deadline: Instant,
    ) -> (Platform, ListingSet, PlatformReport) {
        let platform = adapter.platform();
        let mut progress = Progress::default();

        let outcome = match timeout_at(deadline, self.factory.open()).await {
            Err(_) => Err(TIMEOUT_REASON.to_string()),
            Ok(Err(e)) => Err(format!("browser session unavailable: {}", e)),
            Ok(Ok(driver)) => {
                let mut session = Session::new(driver);
                let driven = timeout_at(
                    deadline,
                    self.drive(adapter, &mut session, criteria, canonicalizer, &mut progress),
                )
                .await;

                match timeout(CLOSE_GRACE, session.close()).await {
                    Ok(Ok(())) => debug!(platform = %platform, "Session closed"),
                    Ok(Err(e)) => warn!(platform = %platform, error = %e, "Session did not close cleanly"),
                    Err(_) => warn!(platform = %platform, "Session close timed out"),
                }

                driven.unwrap_or_else(|_| Err(TIMEOUT_REASON.to_string()))
            }
        };

        let status = match outcome {
            Ok(()) => PlatformStatus::Success,
            Err(reason) if !progress.listings.is_empty() => {
                warn!(platform = %platform, %reason, "Platform stopped early, keeping {} listings", progress.listings.len());
                PlatformStatus::Partial { reason }
            }
            Err(reason) => {
                error!(platform = %platform, %reason, "Platform failed");
                PlatformStatus::Failed { reason }
            }
        };

        let report = PlatformReport {
            status,
            listings: progress.listings.len(),
            pages: progress.pages,
            malformed: progress.malformed,
            enriched: progress.enriched,
            skipped_filters: progress.skipped_filters,
        };
        (platform, progress.listings, report)
    }

    /// Walk the state machine until DONE or FAILED.
    ///
    /// A failing step is retried in place; once its retries are spent the
    /// run restarts from INIT at most once, keeping collected listings.
    async fn drive(
        &self,
        adapter: &dyn PlatformAdapter,
        session: &mut Session,
        criteria: &SearchCriteria,
        canonicalizer: &Canonicalizer,
        progress: &mut Progress,
    ) -> Result<(), String> {
        let platform = adapter.platform();
        let mut state = AdapterState::Init;
        let mut attempts = 0u32;
        let mut refreshed = false;

        loop {
            let step = match &state {
                AdapterState::Init => adapter.navigate(session, criteria).await.map(|_| AdapterState::Navigated),
                AdapterState::Navigated => adapter
                    .apply_criteria(session, criteria)
                    .await
                    .map(|_| AdapterState::CriteriaApplied),
                AdapterState::CriteriaApplied => {
                    let report = adapter.apply_filters(session, criteria).await;
                    for filter in &report.skipped {
                        warn!(platform = %platform, filter = %filter, "Filter not available, relying on scoring");
                    }
                    progress.skipped_filters = report.skipped;
                    Ok(AdapterState::FiltersApplied)
                }
                AdapterState::FiltersApplied => Ok(AdapterState::Extracting),
                AdapterState::Extracting => self
                    .extract(adapter, session, canonicalizer, progress)
                    .await
                    .map(|_| AdapterState::Paginating),
                AdapterState::Paginating => self.paginate(adapter, session).await,
                AdapterState::Enriching => {
                    self.enrich(adapter, session, criteria, canonicalizer, progress).await;
                    Ok(AdapterState::Done)
                }
                AdapterState::Done => return Ok(()),
                AdapterState::Failed(reason) => return Err(reason.clone()),
            };

            match step {
                Ok(next) => {
                    debug!(platform = %platform, from = %state, to = %next, "State transition");
                    attempts = 0;
                    state = next;
                }
                Err(e) if e.is_transient() && attempts < self.policy.retries_for(&state) => {
                    attempts += 1;
                    let wait = self.policy.backoff(attempts);
                    warn!(
                        platform = %platform,
                        state = %state,
                        attempt = attempts,
                        error = %e,
                        "Step failed, retrying in {:?}",
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) if e.is_transient() && self.policy.hard_refresh && !refreshed => {
                    warn!(platform = %platform, state = %state, error = %e, "Retries exhausted, restarting from the entry page");
                    refreshed = true;
                    attempts = 0;
                    session.restart();
                    state = AdapterState::Init;
                }
                Err(e) => {
                    state = AdapterState::Failed(format!("{}: {}", state.name(), e));
                }
            }
        }
    }

    async fn extract(
        &self,
        adapter: &dyn PlatformAdapter,
        session: &Session,
        canonicalizer: &Canonicalizer,
        progress: &mut Progress,
    ) -> Result<(), AdapterError> {
        let platform = adapter.platform();
        let records = adapter.extract_page(session).await?;

        let mut added = 0;
        for record in &records {
            match canonicalizer.canonicalize(platform, record) {
                Ok(listing) => {
                    if progress.listings.upsert(listing) {
                        added += 1;
                    }
                }
                Err(e) => {
                    progress.malformed += 1;
                    warn!(platform = %platform, error = %e, "Dropping malformed record");
                }
            }
        }

        progress.pages = progress.pages.max(session.page());
        info!(
            "{}: page {} gave {} records, {} new listings",
            platform,
            session.page(),
            records.len(),
            added
        );
        Ok(())
    }

    async fn paginate(&self, adapter: &dyn PlatformAdapter, session: &mut Session) -> Result<AdapterState, AdapterError> {
        if session.page() >= self.max_pages {
            debug!("Reached page limit {}", self.max_pages);
            return Ok(AdapterState::Enriching);
        }
        if !adapter.has_next_page(session).await? {
            return Ok(AdapterState::Enriching);
        }
        adapter.next_page(session).await?;
        Ok(AdapterState::Extracting)
    }

    /// Best effort: a listing page that fails is logged and skipped.
    async fn enrich(
        &self,
        adapter: &dyn PlatformAdapter,
        session: &mut Session,
        criteria: &SearchCriteria,
        canonicalizer: &Canonicalizer,
        progress: &mut Progress,
    ) {
        if self.details_limit == 0 {
            return;
        }
        let platform = adapter.platform();

        let mut candidates: Vec<_> = progress
            .listings
            .iter()
            .filter(|l| !is_excluded(l.price_per_night, criteria.max_price_per_night()))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            a.price_per_night
                .total_cmp(&b.price_per_night)
                .then_with(|| a.external_id.cmp(&b.external_id))
        });
        candidates.truncate(self.details_limit);

        for mut listing in candidates {
            match adapter.property_details(session, &listing).await {
                Ok(Some(raw)) => {
                    canonicalizer.enrich(&mut listing, &raw);
                    progress.listings.upsert(listing);
                    progress.enriched += 1;
                }
                Ok(None) => return,
                Err(e) => {
                    warn!(platform = %platform, listing = %listing.external_id, error = %e, "Listing page unreadable, keeping card data");
                }
            }
        }
        info!("{}: read {} listing pages", platform, progress.enriched);
    }
}
