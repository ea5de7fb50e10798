//! Nearby-city resolution and pre-computed location filters.
//!
//! `nearcity` answers "which cities are within N miles of this one?" for US
//! locations and turns the answer into a small, cacheable artifact that a buyer
//! or property record can store. The radius search runs once per location
//! change instead of on every read.
//!
//! # Features
//!
//! - **State-partitioned search** - linear haversine scans over one state's entries
//! - **Fallback chain** - name lookup, known coordinates, external geocoding, wider radius
//! - **Cacheable filters** - nearby names, bounding box, geohash and a staleness policy
//! - **Thread-Safe** - the catalog is immutable after load and shared through `Arc`
//! - **Compact snapshots** - bincode encoding with string interning for fast startup
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use nearcity::{CityCatalog, FilterCache, NearbyCityPipeline, PipelineConfig, RadiusResolver, StalenessPolicy};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = nearcity::catalog::init_global(CityCatalog::load("data/cities.json")?);
//! let resolver = RadiusResolver::new(Arc::clone(&catalog));
//!
//! // Direct radius search
//! for found in resolver.by_name("Houston", "TX", 30.0) {
//!     println!("{} ({:.1} mi)", found.city.name, found.distance_miles);
//! }
//!
//! // Pre-computed filter for a buyer profile
//! let pipeline = NearbyCityPipeline::new(resolver, PipelineConfig::default());
//! let cache = FilterCache::new(pipeline, StalenessPolicy::default());
//! let filter = cache.generate("Houston", "TX", 30.0).await;
//! println!("{}", nearcity::filter::stats(Some(&filter)));
//!
//! assert!(!cache.should_regenerate("Houston", "TX", Some(&filter)));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ## Catalog
//!
//! [`CityCatalog`] holds the static US city dataset (~30K entries), keeps only
//! valid US rows, and partitions them by state. It is loaded once at startup;
//! a failed load is fatal because every other operation depends on it.
//!
//! ## Resolution Chain
//!
//! [`NearbyCityPipeline`] tries, in order:
//!
//! 1. Catalog coordinates of the named city (with fuzzy name matching)
//! 2. Coordinates the caller already knows
//! 3. An external [`Geocoder`], bounded by a timeout
//! 4. All of the above at an escalated radius (45 miles by default)
//!
//! and stops at the first strategy that finds anything. Failures are never
//! errors; the outcome simply carries an empty list and a `failed` source.
//!
//! ## Filters
//!
//! [`FilterCache`] packs the result into a [`Filter`] and decides when a stored
//! filter is stale: no filter, the user's city is not in it, or it is older
//! than 30 days.
//!
//! # Modules
//!
//! - [`catalog`] - dataset loading, snapshots, fuzzy lookup
//! - [`resolver`] - radius search
//! - [`pipeline`] - the fallback chain
//! - [`filter`] - buyer filters and staleness
//! - [`property`] - property enrichment results
//! - [`backfill`] - chunked batch enrichment
//! - [`geocode`] - external geocoding providers
//! - [`config`] - environment settings

#![warn(missing_docs)]

pub mod backfill;
pub mod catalog;
pub mod config;
pub mod distance;
pub mod error;
pub mod filter;
pub mod geocode;
pub mod geohash;
pub mod names;
pub mod pipeline;
pub mod property;
pub mod resolver;
pub mod types;

#[cfg(feature = "builder")]
pub mod builder;

pub use catalog::CityCatalog;
pub use distance::distance_miles;
pub use error::{CatalogError, ConfigError, GeocodeError};
pub use filter::{Filter, FilterCache, StalenessPolicy};
pub use geocode::Geocoder;
pub use pipeline::{LocationQuery, NearbyCityPipeline, PipelineConfig, PipelineOutcome, SourceStrategy, Strategy};
pub use property::{PropertyEnricher, PropertyLocation, PropertyNearbyResult};
pub use resolver::RadiusResolver;
pub use types::{BoundingBox, City, CityRecord, CityWithDistance, Coordinates};
