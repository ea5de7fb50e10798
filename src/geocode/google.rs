//! Google Maps Geocoding API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use super::{normalize_base_url, Geocoder};
use crate::error::GeocodeError;
use crate::types::Coordinates;

const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Client for `GET /maps/api/geocode/json`.
///
/// Use [`GoogleGeocoder::new`] for production or
/// [`GoogleGeocoder::with_base_url`] to point at a mock server in tests.
pub struct GoogleGeocoder {
    client: Client,
    api_key: String,
    endpoint: Url,
}

impl GoogleGeocoder {
    /// Creates a client for the production Google endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, GeocodeError> {
        Self::with_base_url(api_key, timeout, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the client cannot be built or
    /// [`GeocodeError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        timeout: Duration,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let endpoint = normalize_base_url(base_url)?
            .join("maps/api/geocode/json")
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            endpoint,
        })
    }

    fn build_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", &self.api_key);
        url
    }
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
        let response = self.client.get(self.build_url(query)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: GeocodeResponse =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Malformed(e.to_string()))?;

        match parsed.status.as_str() {
            "OK" => {
                let location = parsed
                    .results
                    .into_iter()
                    .next()
                    .map(|r| r.geometry.location)
                    .ok_or_else(|| GeocodeError::Malformed("OK status with no results".into()))?;
                debug!(query, lat = location.lat, lng = location.lng, "google geocode hit");
                Ok(Some(Coordinates::new(location.lat, location.lng)))
            }
            "ZERO_RESULTS" => Ok(None),
            other => Err(GeocodeError::Api(other.to_string())),
        }
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_address_and_key() {
        let geocoder =
            GoogleGeocoder::with_base_url("test-key", Duration::from_secs(5), "http://127.0.0.1:9")
                .unwrap();
        let url = geocoder.build_url("Katy, TX, USA");
        assert_eq!(url.path(), "/maps/api/geocode/json");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("address".to_string(), "Katy, TX, USA".to_string()),
                ("key".to_string(), "test-key".to_string()),
            ]
        );
    }
}
