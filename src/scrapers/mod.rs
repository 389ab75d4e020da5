pub mod airbnb;
pub mod booking;
pub mod browser;
pub mod details;
pub mod parse;
pub mod session;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use airbnb::AirbnbAdapter;
pub use booking::BookingAdapter;
pub use browser::{ChromeDriver, ChromeFactory};
pub use session::Session;
pub use traits::{DriverFactory, PageDriver, PlatformAdapter};
pub use types::{
    AdapterSettings, AdapterState, FilterReport, PriceBasis, RawListingRecord,
    RawPropertyDetails,
};
