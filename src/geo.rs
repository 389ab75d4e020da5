use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// A point on the map
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Parse "42.0937,19.0984" as found in map-link attributes.
    pub fn parse_pair(text: &str) -> Option<Self> {
        let (lat, lng) = text.split_once(',')?;
        let latitude: f64 = lat.trim().parse().ok()?;
        let longitude: f64 = lng.trim().parse().ok()?;
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self::new(latitude, longitude))
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (dlng / 2.0).sin().powi(2);

        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Resolve a free-text location ("Bar, Montenegro") through Nominatim.
#[instrument(skip(client))]
pub async fn geocode(client: &reqwest::Client, query: &str) -> Result<Coordinates> {
    let places: Vec<NominatimPlace> = client
        .get(NOMINATIM_URL)
        .query(&[("q", query), ("format", "json"), ("limit", "1")])
        .send()
        .await
        .context("Geocoding request failed")?
        .error_for_status()
        .context("Geocoding service returned an error")?
        .json()
        .await
        .context("Failed to parse geocoding response")?;

    let place = places.first().ok_or_else(|| {
        warn!(query, "Location not found by geocoding service");
        anyhow!("Location not found: {}", query)
    })?;

    let latitude: f64 = place
        .lat
        .parse()
        .with_context(|| format!("Invalid latitude {:?}", place.lat))?;
    let longitude: f64 = place
        .lon
        .parse()
        .with_context(|| format!("Invalid longitude {:?}", place.lon))?;

    debug!("Geocoded {} → ({}, {})", query, latitude, longitude);

    Ok(Coordinates::new(latitude, longitude))
}
