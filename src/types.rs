//! Core data structures for city and coordinate information.
//!
//! This module defines the fundamental types used throughout the library:
//!
//! - [`City`] - A catalog entry identified by `(name, state)`
//! - [`Coordinates`] - Simple coordinate pair with distance calculations
//! - [`CityWithDistance`] - A catalog entry annotated with its distance to a search center
//! - [`BoundingBox`] - Axis-aligned lat/lng rectangle around a set of points
//! - [`CityRecord`] - One raw row of the static dataset
//! - [`CompactCity`] / [`CatalogSnapshot`] - Compressed binary storage format

use serde::{Deserialize, Serialize};

use crate::distance::distance_miles;

/// A coordinate pair with distance calculation capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in decimal degrees (-180 to 180)
    pub lng: f64,
}

impl Coordinates {
    /// Constructs a new coordinate pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use nearcity::Coordinates;
    ///
    /// let houston = Coordinates::new(29.76328, -95.36327);
    /// assert_eq!(houston.lat, 29.76328);
    /// assert_eq!(houston.lng, -95.36327);
    /// ```
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the valid degree ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Calculates the great-circle distance to another point using the haversine formula.
    ///
    /// Returns the distance in miles, assuming a spherical Earth of radius 3959 miles.
    ///
    /// # Examples
    ///
    /// ```
    /// use nearcity::Coordinates;
    ///
    /// let memphis = Coordinates::new(35.14953, -90.04898);
    /// let bartlett = Coordinates::new(35.20453, -89.87398);
    ///
    /// let miles = memphis.distance_to(&bartlett);
    /// assert!(miles > 10.0 && miles < 11.0);
    /// ```
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        distance_miles(self.lat, self.lng, other.lat, other.lng)
    }
}

/// One catalog entry. Names are not unique across states, so every lookup is
/// scoped by `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    /// Display name as it appears in the dataset (e.g. "Sugar Land")
    pub name: String,
    /// Upper-case two-letter state code (e.g. "TX")
    pub state: String,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lng: f64,
}

impl City {
    /// The entry's position as a [`Coordinates`] value.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }

    /// Case-insensitive name comparison, see [`same_city_name`](crate::names::same_city_name).
    pub fn is_named(&self, name: &str) -> bool {
        crate::names::same_city_name(&self.name, name)
    }
}

/// A catalog entry together with its distance to the search center.
///
/// Produced only by [`RadiusResolver`](crate::RadiusResolver); never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CityWithDistance {
    /// The matched catalog entry
    pub city: City,
    /// Great-circle distance from the search center, in miles
    pub distance_miles: f64,
}

/// Minimal axis-aligned rectangle containing a set of points.
///
/// Always satisfies `min_lat <= max_lat` and `min_lng <= max_lng`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge
    pub min_lat: f64,
    /// Northern edge
    pub max_lat: f64,
    /// Western edge
    pub min_lng: f64,
    /// Eastern edge
    pub max_lng: f64,
}

impl BoundingBox {
    /// A degenerate box around a single point.
    pub fn around(point: Coordinates) -> Self {
        Self {
            min_lat: point.lat,
            max_lat: point.lat,
            min_lng: point.lng,
            max_lng: point.lng,
        }
    }

    /// Builds the smallest box containing every point, or `None` for an empty input.
    ///
    /// # Examples
    ///
    /// ```
    /// use nearcity::{BoundingBox, Coordinates};
    ///
    /// let bbox = BoundingBox::from_points([
    ///     Coordinates::new(29.76, -95.36),
    ///     Coordinates::new(29.61, -95.63),
    /// ])
    /// .unwrap();
    /// assert_eq!(bbox.min_lat, 29.61);
    /// assert_eq!(bbox.max_lng, -95.36);
    /// ```
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinates>,
    {
        let mut points = points.into_iter();
        let mut bbox = Self::around(points.next()?);
        for point in points {
            bbox.extend(point);
        }
        Some(bbox)
    }

    /// Grows the box so that it contains `point`.
    pub fn extend(&mut self, point: Coordinates) {
        self.min_lat = self.min_lat.min(point.lat);
        self.max_lat = self.max_lat.max(point.lat);
        self.min_lng = self.min_lng.min(point.lng);
        self.max_lng = self.max_lng.max(point.lng);
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

/// One raw row of the static dataset (the `cities.json` shape).
///
/// Every field is kept as a string exactly as the dataset ships it; validation
/// and normalization happen when the catalog is built. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Place name
    #[serde(default)]
    pub name: String,
    /// ISO 3166-1 alpha-2 country code; only `"US"` rows are retained
    #[serde(default)]
    pub country: String,
    /// First-level administrative code, the two-letter state code for US rows
    #[serde(default)]
    pub admin1: String,
    /// Latitude as text
    #[serde(default)]
    pub lat: String,
    /// Longitude as text
    #[serde(default)]
    pub lng: String,
}

/// Compressed storage format using string table indices and fixed-point coordinates.
///
/// Coordinates are stored as `i32` values of degrees multiplied by 100,000
/// (about 1.1 m of resolution), names and states as `u32` indices into the
/// snapshot's shared string table.
#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct CompactCity {
    /// Index into the string table for the city name
    pub name: u32,
    /// Index into the string table for the state code
    pub state: u32,
    /// Latitude as fixed-point integer
    pub lat: i32,
    /// Longitude as fixed-point integer
    pub lng: i32,
}

impl CompactCity {
    /// Converts the fixed-point coordinates back to decimal degrees.
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            lat: self.lat as f64 / 100000.0,
            lng: self.lng as f64 / 100000.0,
        }
    }
}

/// The serialized catalog: a deduplicated string table plus compact entries.
///
/// State names repeat tens of thousands of times in the dataset, so interning
/// keeps the snapshot small.
#[derive(Debug, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct CatalogSnapshot {
    /// Format version, checked on decode
    pub version: u16,
    /// Deduplicated string table
    pub strings: Vec<String>,
    /// All catalog entries in load order
    pub cities: Vec<CompactCity>,
}
