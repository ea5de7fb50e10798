//! Nearby-city enrichment for property records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::{LocationQuery, NearbyCityPipeline, SourceStrategy};
use crate::types::Coordinates;

/// Default cap on stored nearby cities per property.
pub const DEFAULT_MAX_CITIES: usize = 100;

/// Where a property sits, as the listing describes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyLocation {
    /// Street address, used for geocoding when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// City name from the listing
    pub city: String,
    /// Two-letter state code
    pub state: String,
    /// Coordinates already stored on the property
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

impl PropertyLocation {
    /// Whether city and state are both present.
    pub fn is_complete(&self) -> bool {
        !self.city.trim().is_empty() && !self.state.trim().is_empty()
    }

    fn query(&self) -> LocationQuery {
        LocationQuery {
            city: self.city.clone(),
            state: self.state.clone(),
            address: self.address.clone(),
            coordinates: self.coordinates,
            geocode_timeout: None,
        }
    }
}

/// One stored nearby city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyCity {
    /// Catalog name
    pub name: String,
    /// Two-letter state code
    pub state: String,
    /// Miles from the property, rounded to 0.01
    pub distance: f64,
}

/// The nearby-city block persisted on a property record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyNearbyResult {
    /// Nearby cities closest first, the property's own city excluded
    pub nearby_cities: Vec<NearbyCity>,
    /// Which strategy produced the list
    #[serde(rename = "nearbyCitiesSource")]
    pub source_strategy: SourceStrategy,
    /// When the list was computed
    pub nearby_cities_updated_at: DateTime<Utc>,
    /// Set only when the property's coordinates were newly geocoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    /// Pairs with `latitude`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl PropertyNearbyResult {
    /// The newly geocoded coordinates, if any.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// Produces [`PropertyNearbyResult`]s through the nearby-city pipeline.
#[derive(Clone)]
pub struct PropertyEnricher {
    pipeline: NearbyCityPipeline,
    max_cities: usize,
}

impl PropertyEnricher {
    /// An enricher storing at most `max_cities` neighbours per property.
    pub fn new(pipeline: NearbyCityPipeline, max_cities: usize) -> Self {
        Self {
            pipeline,
            max_cities,
        }
    }

    /// Resolves the cities around a property, excluding the property's own
    /// city, closest first and capped at `max_cities`.
    ///
    /// The own city is excluded while the chain runs, so a town with no
    /// neighbour inside `radius_miles` escalates like any other miss.
    pub async fn enrich(&self, location: &PropertyLocation, radius_miles: f64) -> PropertyNearbyResult {
        let own_city = location.city.trim();
        let outcome = self
            .pipeline
            .resolve_excluding(&location.query(), radius_miles, |city| city.is_named(own_city))
            .await;

        let nearby_cities: Vec<NearbyCity> = outcome
            .cities
            .iter()
            .take(self.max_cities)
            .map(|found| NearbyCity {
                name: found.city.name.clone(),
                state: found.city.state.clone(),
                distance: (found.distance_miles * 100.0).round() / 100.0,
            })
            .collect();

        let geocoded = if location.coordinates.is_none() {
            outcome.geocoded
        } else {
            None
        };

        let source_strategy = outcome.source();
        if source_strategy == SourceStrategy::Failed {
            warn!(city = %location.city, state = %location.state, "property nearby cities unresolved");
        } else {
            info!(
                city = %location.city,
                state = %location.state,
                nearby = nearby_cities.len(),
                source = ?source_strategy,
                "property enriched"
            );
        }

        PropertyNearbyResult {
            nearby_cities,
            source_strategy,
            nearby_cities_updated_at: Utc::now(),
            latitude: geocoded.map(|c| c.lat),
            longitude: geocoded.map(|c| c.lng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_storage_shape() {
        let result = PropertyNearbyResult {
            nearby_cities: vec![NearbyCity {
                name: "Bartlett".into(),
                state: "TN".into(),
                distance: 10.59,
            }],
            source_strategy: SourceStrategy::Geocoded,
            nearby_cities_updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            latitude: Some(35.1),
            longitude: Some(-90.0),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["nearbyCities"][0]["name"], "Bartlett");
        assert_eq!(json["nearbyCities"][0]["distance"], 10.59);
        assert_eq!(json["nearbyCitiesSource"], "geocoded");
        assert_eq!(json["nearbyCitiesUpdatedAt"], "2026-01-02T03:04:05Z");
        assert_eq!(json["latitude"], 35.1);
        assert_eq!(result.coordinates(), Some(Coordinates::new(35.1, -90.0)));
    }

    #[test]
    fn omits_coordinates_when_not_geocoded() {
        let result = PropertyNearbyResult {
            nearby_cities: vec![],
            source_strategy: SourceStrategy::Failed,
            nearby_cities_updated_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            latitude: None,
            longitude: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("latitude").is_none());
        assert_eq!(json["nearbyCitiesSource"], "failed");
        assert!(result.coordinates().is_none());
    }

    #[test]
    fn incomplete_locations() {
        let mut location = PropertyLocation {
            city: "Memphis".into(),
            state: " ".into(),
            ..PropertyLocation::default()
        };
        assert!(!location.is_complete());
        location.state = "TN".into();
        assert!(location.is_complete());
    }
}
