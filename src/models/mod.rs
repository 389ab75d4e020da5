pub mod criteria;
pub mod listing;
pub mod result;

pub use criteria::{PropertyType, SearchCriteria, SearchCriteriaBuilder};
pub use listing::{Listing, ListingKey, Platform, PropertyDetails, ScoredListing};
pub use result::{ListingSet, PlatformReport, PlatformStatus, SearchResult};
