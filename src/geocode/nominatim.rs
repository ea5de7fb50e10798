//! OpenStreetMap Nominatim search client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::{normalize_base_url, Geocoder};
use crate::error::GeocodeError;
use crate::types::Coordinates;

const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/";
const USER_AGENT: &str = "nearcity/0.1 (nearby-city-filters)";

// Nominatim returns coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Client for Nominatim's `GET /search` endpoint, restricted to US results.
///
/// Nominatim's usage policy requires an identifying User-Agent and at most one
/// request per second; throttling is the caller's job.
pub struct NominatimGeocoder {
    client: Client,
    endpoint: Url,
}

impl NominatimGeocoder {
    /// Creates a client for the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, GeocodeError> {
        Self::with_base_url(timeout, DEFAULT_BASE_URL)
    }

    /// Creates a client for a self-hosted instance or a mock server.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the client cannot be built or
    /// [`GeocodeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(timeout: Duration, base_url: &str) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;
        let endpoint = normalize_base_url(base_url)?
            .join("search")
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, endpoint })
    }

    fn build_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1")
            .append_pair("countrycodes", "us");
        url
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self.client.get(self.build_url(query)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let hits: Vec<SearchHit> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        let Some(hit) = hits.into_iter().next() else {
            return Ok(None);
        };

        let lat = hit
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::Malformed(format!("lat '{}': {e}", hit.lat)))?;
        let lng = hit
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::Malformed(format!("lon '{}': {e}", hit.lon)))?;

        debug!(query, lat, lng, "nominatim geocode hit");
        Ok(Some(Coordinates::new(lat, lng)))
    }

    fn provider_name(&self) -> &'static str {
        "nominatim"
    }
}
