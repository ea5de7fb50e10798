//! Radius search over one state partition of the catalog.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::catalog::CityCatalog;
use crate::distance::distance_miles;
use crate::types::{CityWithDistance, Coordinates};

/// Finds catalog entries within a radius of a center, scanning only the
/// center's state.
///
/// Cheap to clone; all clones share the same catalog.
#[derive(Debug, Clone)]
pub struct RadiusResolver {
    catalog: Arc<CityCatalog>,
}

impl RadiusResolver {
    /// Creates a resolver over a loaded catalog.
    pub fn new(catalog: Arc<CityCatalog>) -> Self {
        Self { catalog }
    }

    /// The catalog this resolver scans.
    pub fn catalog(&self) -> &CityCatalog {
        &self.catalog
    }

    /// Cities within `radius_miles` of the named center city.
    ///
    /// The center is resolved with an exact (case-insensitive) catalog lookup.
    /// An unknown center or an empty state yields an empty list; this method
    /// never falls back to another strategy.
    pub fn by_name(&self, center_name: &str, state: &str, radius_miles: f64) -> Vec<CityWithDistance> {
        match self.catalog.coordinates_of(center_name, state) {
            Some(center) => self.by_coordinates(center.lat, center.lng, state, radius_miles),
            None => Vec::new(),
        }
    }

    /// Cities of `state` within `radius_miles` of `(lat, lng)`.
    ///
    /// The comparison is inclusive, so a radius of 0 keeps only entries at
    /// exactly the center. Results are sorted by ascending distance, ties by
    /// name.
    pub fn by_coordinates(
        &self,
        lat: f64,
        lng: f64,
        state: &str,
        radius_miles: f64,
    ) -> Vec<CityWithDistance> {
        let mut nearby: Vec<CityWithDistance> = self
            .catalog
            .entries_in_state(state)
            .filter_map(|city| {
                let distance = distance_miles(lat, lng, city.lat, city.lng);
                (distance <= radius_miles).then(|| CityWithDistance {
                    city: city.clone(),
                    distance_miles: distance,
                })
            })
            .collect();

        nearby.sort_by(compare_by_distance);
        nearby
    }

    /// Same as [`by_coordinates`](Self::by_coordinates) for a [`Coordinates`] center.
    pub fn around(&self, center: Coordinates, state: &str, radius_miles: f64) -> Vec<CityWithDistance> {
        self.by_coordinates(center.lat, center.lng, state, radius_miles)
    }

    /// Distance in miles between two catalog cities, rounded to 0.1 mile.
    ///
    /// Returns `None` if either city is missing from the catalog.
    pub fn distance_between(
        &self,
        city_a: &str,
        state_a: &str,
        city_b: &str,
        state_b: &str,
    ) -> Option<f64> {
        let a = self.catalog.coordinates_of(city_a, state_a)?;
        let b = self.catalog.coordinates_of(city_b, state_b)?;
        Some((a.distance_to(&b) * 10.0).round() / 10.0)
    }
}

fn compare_by_distance(a: &CityWithDistance, b: &CityWithDistance) -> Ordering {
    a.distance_miles
        .total_cmp(&b.distance_miles)
        .then_with(|| a.city.name.cmp(&b.city.name))
}
