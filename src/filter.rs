//! Pre-computed nearby-city filters.
//!
//! A radius search per page view is too expensive at buyer scale, so it runs
//! once at signup (or when the buyer moves) and the result is stored on the
//! buyer record as a [`Filter`]. [`StalenessPolicy`] decides when a stored
//! filter must be regenerated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::geohash;
use crate::names::same_city_name;
use crate::pipeline::{LocationQuery, NearbyCityPipeline, Strategy};
use crate::types::BoundingBox;

/// Default maximum filter age before regeneration.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// The cached artifact persisted on a buyer or property record.
///
/// Serializes to the storage shape `{nearbyCities, nearbyCitiesCount,
/// radiusMiles, lastCityUpdate, boundingBox?, geohashPrefix?,
/// geocodedFromGoogle?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// City names ordered by ascending distance from the center
    #[serde(rename = "nearbyCities")]
    pub nearby_city_names: Vec<String>,
    /// Always `nearby_city_names.len()`
    #[serde(rename = "nearbyCitiesCount")]
    pub count: usize,
    /// Radius the filter was requested with
    pub radius_miles: f64,
    /// When the filter was generated
    #[serde(rename = "lastCityUpdate")]
    pub last_updated: DateTime<Utc>,
    /// Box around the center and every listed city; absent when unresolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    /// Geohash of the center at [`geohash::FILTER_PRECISION`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geohash_prefix: Option<String>,
    /// Set when the center came from the external geocoder
    #[serde(
        rename = "geocodedFromGoogle",
        default,
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub resolved_via_geocode: bool,
}

impl Filter {
    /// Case-insensitive membership test on the nearby city names.
    pub fn contains_city(&self, city: &str) -> bool {
        self.nearby_city_names
            .iter()
            .any(|name| same_city_name(name, city))
    }

    /// Whole days elapsed between `last_updated` and `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_updated).num_days()
    }
}

/// Rules deciding when a stored filter is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    /// Filters strictly older than this are regenerated
    pub max_age: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }
}

impl StalenessPolicy {
    /// A policy expiring filters after `days` whole days.
    pub fn with_max_age_days(days: i64) -> Self {
        Self {
            max_age: Duration::days(days),
        }
    }

    /// Whether `stored` must be regenerated for a user now located in
    /// `current_city`, evaluated at `now`.
    ///
    /// True iff there is no stored filter, the current city is not among its
    /// names, or it is older than `max_age`. The state does not take part:
    /// the stored filter does not record one.
    pub fn should_regenerate_at(
        &self,
        current_city: &str,
        current_state: &str,
        stored: Option<&Filter>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(filter) = stored else {
            debug!(city = current_city, state = current_state, "no stored filter");
            return true;
        };

        if !filter.contains_city(current_city) {
            debug!(
                city = current_city,
                state = current_state,
                previous = filter.nearby_city_names.first().map(String::as_str),
                "city not covered by stored filter"
            );
            return true;
        }

        if now - filter.last_updated > self.max_age {
            debug!(
                city = current_city,
                age_days = filter.age_days(now),
                "stored filter expired"
            );
            return true;
        }

        false
    }
}

/// Builds filters through the pipeline and judges stored ones.
#[derive(Clone)]
pub struct FilterCache {
    pipeline: NearbyCityPipeline,
    policy: StalenessPolicy,
}

impl FilterCache {
    /// A cache generating through `pipeline` and judging with `policy`.
    pub fn new(pipeline: NearbyCityPipeline, policy: StalenessPolicy) -> Self {
        Self { pipeline, policy }
    }

    /// The staleness rules in effect.
    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Runs the nearby-city pipeline for `city, state` and packs the result.
    ///
    /// Names are ordered by distance with case-insensitive duplicates removed.
    /// When the search center was not a catalog entry named like `city`
    /// (geocoded, fuzzy-matched) the requested name is put first so the stored
    /// filter recognises its own city. If nothing resolves, the filter holds
    /// only `city` and has no bounding box or geohash.
    pub async fn generate(&self, city: &str, state: &str, radius_miles: f64) -> Filter {
        let started = std::time::Instant::now();
        let query = LocationQuery::new(city, state);
        let outcome = self.pipeline.resolve(&query, radius_miles).await;
        let now = Utc::now();
        let city = city.trim();

        let Some(center) = outcome.center.filter(|_| !outcome.cities.is_empty()) else {
            warn!(city, state, radius_miles, "falling back to a self-only filter");
            return Filter {
                nearby_city_names: vec![city.to_string()],
                count: 1,
                radius_miles,
                last_updated: now,
                bounding_box: None,
                geohash_prefix: None,
                resolved_via_geocode: false,
            };
        };

        let mut names: Vec<String> = Vec::with_capacity(outcome.cities.len() + 1);
        for found in &outcome.cities {
            if !names.iter().any(|n| same_city_name(n, &found.city.name)) {
                names.push(found.city.name.clone());
            }
        }
        if !names.iter().any(|n| same_city_name(n, city)) {
            names.insert(0, city.to_string());
        }

        let mut bounding_box = BoundingBox::around(center);
        for found in &outcome.cities {
            bounding_box.extend(found.city.coordinates());
        }

        let filter = Filter {
            count: names.len(),
            nearby_city_names: names,
            radius_miles,
            last_updated: now,
            bounding_box: Some(bounding_box),
            geohash_prefix: Some(geohash::encode(
                center.lat,
                center.lng,
                geohash::FILTER_PRECISION,
            )),
            resolved_via_geocode: outcome.resolved_by == Some(Strategy::GeocodeLookup),
        };

        info!(
            city,
            state,
            cities = filter.count,
            radius_used = outcome.radius_miles,
            escalated = outcome.escalated,
            source = ?outcome.source(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "generated nearby-city filter"
        );
        filter
    }

    /// [`StalenessPolicy::should_regenerate_at`] evaluated now.
    pub fn should_regenerate(
        &self,
        current_city: &str,
        current_state: &str,
        stored: Option<&Filter>,
    ) -> bool {
        self.policy
            .should_regenerate_at(current_city, current_state, stored, Utc::now())
    }
}

/// One-line diagnostic summary of a stored filter.
pub fn stats(filter: Option<&Filter>) -> String {
    stats_at(filter, Utc::now())
}

/// [`stats`] evaluated at `now`.
pub fn stats_at(filter: Option<&Filter>, now: DateTime<Utc>) -> String {
    match filter {
        None => "No filter configured".to_string(),
        Some(filter) => format!(
            "{} cities within {} miles (updated {} days ago)",
            filter.count,
            filter.radius_miles,
            filter.age_days(now)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn filter_updated(names: &[&str], last_updated: DateTime<Utc>) -> Filter {
        Filter {
            nearby_city_names: names.iter().map(|s| s.to_string()).collect(),
            count: names.len(),
            radius_miles: 30.0,
            last_updated,
            bounding_box: None,
            geohash_prefix: None,
            resolved_via_geocode: false,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn missing_filter_regenerates() {
        let policy = StalenessPolicy::default();
        assert!(policy.should_regenerate_at("Houston", "TX", None, now()));
    }

    #[test]
    fn staleness_combinations() {
        let policy = StalenessPolicy::default();
        let fresh = now() - Duration::days(3);
        let old = now() - Duration::days(31);

        let covered_fresh = filter_updated(&["Houston", "Pasadena"], fresh);
        let covered_old = filter_updated(&["Houston", "Pasadena"], old);
        let moved_fresh = filter_updated(&["Austin", "Round Rock"], fresh);
        let moved_old = filter_updated(&["Austin", "Round Rock"], old);

        assert!(!policy.should_regenerate_at("houston", "TX", Some(&covered_fresh), now()));
        assert!(policy.should_regenerate_at("Houston", "TX", Some(&covered_old), now()));
        assert!(policy.should_regenerate_at("Houston", "TX", Some(&moved_fresh), now()));
        assert!(policy.should_regenerate_at("Houston", "TX", Some(&moved_old), now()));
    }

    #[test]
    fn exactly_thirty_days_is_still_fresh() {
        let policy = StalenessPolicy::default();
        let filter = filter_updated(&["Houston"], now() - Duration::days(30));
        assert!(!policy.should_regenerate_at("Houston", "TX", Some(&filter), now()));
    }

    #[test]
    fn custom_max_age() {
        let policy = StalenessPolicy::with_max_age_days(7);
        let filter = filter_updated(&["Houston"], now() - Duration::days(8));
        assert!(policy.should_regenerate_at("Houston", "TX", Some(&filter), now()));
    }

    #[test]
    fn stats_text() {
        assert_eq!(stats_at(None, now()), "No filter configured");
        let filter = filter_updated(&["Houston", "Pasadena"], now() - Duration::days(4));
        assert_eq!(
            stats_at(Some(&filter), now()),
            "2 cities within 30 miles (updated 4 days ago)"
        );
    }

    #[test]
    fn serializes_storage_shape() {
        let mut filter = filter_updated(&["Houston"], now());
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["nearbyCities"][0], "Houston");
        assert_eq!(json["nearbyCitiesCount"], 1);
        assert_eq!(json["radiusMiles"], 30.0);
        assert_eq!(json["lastCityUpdate"], "2026-03-01T12:00:00Z");
        assert!(json.get("boundingBox").is_none());
        assert!(json.get("geocodedFromGoogle").is_none());

        filter.resolved_via_geocode = true;
        filter.geohash_prefix = Some("9vk".into());
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(json["geocodedFromGoogle"], true);
        assert_eq!(json["geohashPrefix"], "9vk");

        let back: Filter = serde_json::from_value(json).unwrap();
        assert_eq!(back, filter);
    }
}
