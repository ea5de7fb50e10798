//! External geocoding collaborators.
//!
//! The nearby-city pipeline only needs one capability from a provider: turn a
//! free-form location string into coordinates. [`Geocoder`] is that seam; the
//! HTTP clients here implement it for Google Maps and OpenStreetMap Nominatim,
//! and tests substitute their own implementations.

mod google;
mod nominatim;

pub use google::GoogleGeocoder;
pub use nominatim::NominatimGeocoder;

use async_trait::async_trait;

use crate::error::GeocodeError;
use crate::types::Coordinates;

/// Resolves a free-form location to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Looks up `query` (a street address or `"city, state"`).
    ///
    /// `Ok(None)` means the provider answered but found nothing.
    async fn locate(&self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;

    /// Short provider name for logs.
    fn provider_name(&self) -> &'static str;
}

/// Parses `base_url` so that relative joins append to its path.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<reqwest::Url, GeocodeError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    reqwest::Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })
}
