use super::criteria::SearchCriteria;
use super::listing::{Listing, ListingKey, Platform};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Outcome of one platform's run
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PlatformStatus {
    Success,
    /// Failed after some listings were collected; those listings are kept.
    Partial { reason: String },
    Failed { reason: String },
}

impl PlatformStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, PlatformStatus::Failed { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            PlatformStatus::Success => None,
            PlatformStatus::Partial { reason } | PlatformStatus::Failed { reason } => Some(reason),
        }
    }
}

/// Per-platform bookkeeping attached to a [`SearchResult`]
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlatformReport {
    pub status: PlatformStatus,
    pub listings: usize,
    pub pages: u32,
    /// Raw records dropped by the canonicalizer
    pub malformed: usize,
    /// Filters the platform had no control for
    pub skipped_filters: Vec<String>,
    /// Listings whose own page was read
    pub enriched: usize,
}

/// All canonical listings of one search run
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub criteria: SearchCriteria,
    pub listings: Vec<Listing>,
    pub platform_status: BTreeMap<Platform, PlatformReport>,
}

impl SearchResult {
    pub fn status(&self, platform: Platform) -> Option<&PlatformStatus> {
        self.platform_status.get(&platform).map(|r| &r.status)
    }

    pub fn failed_platforms(&self) -> impl Iterator<Item = (Platform, &str)> {
        self.platform_status
            .iter()
            .filter(|(_, r)| r.status.is_failed())
            .map(|(p, r)| (*p, r.status.reason().unwrap_or_default()))
    }
}

/// Insertion-ordered listing collection keyed by `(platform, external_id)`.
///
/// Re-inserting a key replaces the stored listing in place, so the freshest
/// extraction wins without reordering the set.
#[derive(Debug, Clone, Default)]
pub struct ListingSet {
    index: HashMap<ListingKey, usize>,
    listings: Vec<Listing>,
}

impl ListingSet {
    /// Returns true when the key was new.
    pub fn upsert(&mut self, listing: Listing) -> bool {
        match self.index.get(&listing.key()) {
            Some(&slot) => {
                self.listings[slot] = listing;
                false
            }
            None => {
                self.index.insert(listing.key(), self.listings.len());
                self.listings.push(listing);
                true
            }
        }
    }

    pub fn extend(&mut self, other: ListingSet) {
        for listing in other.listings {
            self.upsert(listing);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter()
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    pub fn into_vec(self) -> Vec<Listing> {
        self.listings
    }
}
