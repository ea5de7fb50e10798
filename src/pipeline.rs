//! The nearby-city fallback chain.
//!
//! Resolution runs an explicit, ordered list of strategies and stops at the
//! first one that finds at least one city:
//!
//! 1. [`Strategy::NameLookup`] - the query city's catalog coordinates
//! 2. [`Strategy::CoordinateLookup`] - caller-supplied coordinates, if any
//! 3. [`Strategy::GeocodeLookup`] - coordinates from the external [`Geocoder`]
//! 4. [`Strategy::RadiusEscalation`] - steps 1-3 again at each wider radius
//!
//! If nothing is found the outcome is an explicit failure with an empty city
//! list. Resolution never returns an error; provider failures and timeouts are
//! logged and treated as "not found".

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::geocode::Geocoder;
use crate::resolver::RadiusResolver;
use crate::types::{City, CityWithDistance, Coordinates};

/// Radius used by buyer filters and property enrichment when none is given.
pub const DEFAULT_RADIUS_MILES: f64 = 30.0;

/// Tunables for [`NearbyCityPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Wider radii tried, in order, when the requested radius finds nothing.
    /// Values not larger than the requested radius are skipped.
    pub escalation_radii: Vec<f64>,
    /// Upper bound on one geocoding call.
    pub geocode_timeout: Duration,
    /// Whether the name step may fall back to fuzzy catalog matching.
    pub fuzzy_names: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            escalation_radii: vec![45.0],
            geocode_timeout: Duration::from_secs(10),
            fuzzy_names: true,
        }
    }
}

/// The location to resolve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationQuery {
    /// City name as the user or listing gave it
    pub city: String,
    /// Two-letter state code
    pub state: String,
    /// Full street address, preferred over `"city, state"` for geocoding
    pub address: Option<String>,
    /// Coordinates already known for this location
    pub coordinates: Option<Coordinates>,
    /// Per-query override of [`PipelineConfig::geocode_timeout`]
    pub geocode_timeout: Option<Duration>,
}

impl LocationQuery {
    /// A query for `city, state` with no address, coordinates or timeout override.
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
            ..Self::default()
        }
    }

    /// Sets the street address sent to the geocoder.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Supplies coordinates already known for the location.
    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    /// Overrides the pipeline's geocode timeout for this query.
    pub fn with_geocode_timeout(mut self, timeout: Duration) -> Self {
        self.geocode_timeout = Some(timeout);
        self
    }

    /// Text sent to the geocoder: the address if present, else `"city, state, USA"`.
    pub fn geocode_text(&self) -> String {
        match self.address.as_deref().map(str::trim) {
            Some(address) if !address.is_empty() => address.to_string(),
            _ => format!("{}, {}, USA", self.city.trim(), self.state.trim()),
        }
    }
}

/// One link of the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Exact catalog entry for the query city, or a fuzzy match when no
    /// coordinates were supplied
    NameLookup,
    /// Coordinates supplied with the query
    CoordinateLookup,
    /// Coordinates from the external geocoder
    GeocodeLookup,
    /// Marks the start of a pass at a wider radius
    RadiusEscalation,
}

impl Strategy {
    /// Stable name for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NameLookup => "name_lookup",
            Strategy::CoordinateLookup => "coordinate_lookup",
            Strategy::GeocodeLookup => "geocode_lookup",
            Strategy::RadiusEscalation => "radius_escalation",
        }
    }
}

const BASE_CHAIN: [Strategy; 3] = [
    Strategy::NameLookup,
    Strategy::CoordinateLookup,
    Strategy::GeocodeLookup,
];

/// Where a persisted result's cities came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceStrategy {
    /// Centered on the catalog entry for the city name
    CityName,
    /// Centered on coordinates the record already had
    ExistingCoords,
    /// Centered on newly geocoded coordinates
    Geocoded,
    /// Nothing resolved
    Failed,
}

/// A strategy's answer: cities around a center, or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// At least one city was found
    Found(Resolution),
    /// The strategy applied but found nothing
    NotFound,
}

/// A non-empty radius search result and the center it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Matches sorted by ascending distance
    pub cities: Vec<CityWithDistance>,
    /// Point the distances were measured from
    pub center: Coordinates,
}

/// What happened at one step, for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// The step found this many cities
    Found(usize),
    /// The step ran and found nothing
    NotFound,
    /// The step did not apply (no coordinates supplied, no geocoder configured)
    Skipped,
}

/// One executed step of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Which strategy ran
    pub strategy: Strategy,
    /// Radius of the pass the step belonged to
    pub radius_miles: f64,
    /// What it produced
    pub result: StepResult,
}

/// Final answer of [`NearbyCityPipeline::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// Cities sorted by ascending distance; empty on failure
    pub cities: Vec<CityWithDistance>,
    /// The base strategy that produced `cities`, `None` on failure
    pub resolved_by: Option<Strategy>,
    /// Whether a wider radius than requested was needed
    pub escalated: bool,
    /// Radius that produced the result (the last one tried on failure)
    pub radius_miles: f64,
    /// Center of the successful search
    pub center: Option<Coordinates>,
    /// Coordinates obtained from the geocoder during this resolution
    pub geocoded: Option<Coordinates>,
    /// Every step executed, in order
    pub steps: Vec<Step>,
}

impl PipelineOutcome {
    /// Whether no strategy found anything.
    pub fn is_failed(&self) -> bool {
        self.resolved_by.is_none()
    }

    /// The persisted source tag for this outcome.
    pub fn source(&self) -> SourceStrategy {
        match self.resolved_by {
            Some(Strategy::NameLookup) => SourceStrategy::CityName,
            Some(Strategy::CoordinateLookup) => SourceStrategy::ExistingCoords,
            Some(Strategy::GeocodeLookup) => SourceStrategy::Geocoded,
            Some(Strategy::RadiusEscalation) | None => SourceStrategy::Failed,
        }
    }
}

type Exclude<'a> = dyn Fn(&City) -> bool + Send + Sync + 'a;

fn valid_coordinates(query: &LocationQuery) -> Option<Coordinates> {
    query.coordinates.filter(Coordinates::is_valid)
}

// Per-resolution scratch state; the geocoder is asked at most once.
#[derive(Default)]
struct Attempt {
    steps: Vec<Step>,
    geocoded: Option<Option<Coordinates>>,
}

/// Orchestrates the strategy chain over a [`RadiusResolver`] and an optional
/// [`Geocoder`].
#[derive(Clone)]
pub struct NearbyCityPipeline {
    resolver: RadiusResolver,
    geocoder: Option<Arc<dyn Geocoder>>,
    config: PipelineConfig,
}

impl NearbyCityPipeline {
    /// A pipeline without a geocoder; the geocode step is skipped.
    pub fn new(resolver: RadiusResolver, config: PipelineConfig) -> Self {
        Self {
            resolver,
            geocoder: None,
            config,
        }
    }

    /// Attaches the external geocoding collaborator.
    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// The underlying radius resolver.
    pub fn resolver(&self) -> &RadiusResolver {
        &self.resolver
    }

    /// The tunables this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolves nearby cities for `query`, escalating as configured.
    ///
    /// Dropping the returned future cancels an in-flight geocoding request.
    pub async fn resolve(&self, query: &LocationQuery, radius_miles: f64) -> PipelineOutcome {
        self.resolve_excluding(query, radius_miles, |_| false).await
    }

    /// Same as [`resolve`](Self::resolve), but entries matching `exclude` are
    /// dropped before a strategy's result is judged.
    ///
    /// A step whose only matches are excluded counts as "not found", so the
    /// chain moves on and escalates instead of settling for an empty list.
    pub async fn resolve_excluding<F>(
        &self,
        query: &LocationQuery,
        radius_miles: f64,
        exclude: F,
    ) -> PipelineOutcome
    where
        F: Fn(&City) -> bool + Send + Sync,
    {
        let exclude: &Exclude<'_> = &exclude;
        let mut attempt = Attempt::default();

        if query.state.trim().is_empty() {
            warn!(city = %query.city, "no state given; nothing to scan");
            return Self::failed(attempt, radius_miles);
        }

        if let Some(found) = self.run_chain(query, radius_miles, exclude, &mut attempt).await {
            return Self::resolved(found, attempt, radius_miles, false);
        }

        let mut last_radius = radius_miles;
        for radius in self
            .config
            .escalation_radii
            .iter()
            .copied()
            .filter(|r| *r > radius_miles)
        {
            last_radius = radius;
            let marker = attempt.steps.len();
            attempt.steps.push(Step {
                strategy: Strategy::RadiusEscalation,
                radius_miles: radius,
                result: StepResult::NotFound,
            });
            debug!(city = %query.city, state = %query.state, radius, "escalating radius");

            if let Some(found) = self.run_chain(query, radius, exclude, &mut attempt).await {
                attempt.steps[marker].result = StepResult::Found(found.1.cities.len());
                return Self::resolved(found, attempt, radius, true);
            }
        }

        warn!(
            city = %query.city,
            state = %query.state,
            radius = last_radius,
            "no nearby cities found by any strategy"
        );
        Self::failed(attempt, last_radius)
    }

    async fn run_chain(
        &self,
        query: &LocationQuery,
        radius: f64,
        exclude: &Exclude<'_>,
        attempt: &mut Attempt,
    ) -> Option<(Strategy, Resolution)> {
        for strategy in BASE_CHAIN {
            let lookup = match strategy {
                Strategy::NameLookup => self.name_lookup(query, radius, exclude),
                Strategy::CoordinateLookup => self.coordinate_lookup(query, radius, exclude),
                Strategy::GeocodeLookup => {
                    self.geocode_lookup(query, radius, exclude, attempt).await
                }
                Strategy::RadiusEscalation => None,
            };

            let result = match &lookup {
                Some(Lookup::Found(resolution)) => StepResult::Found(resolution.cities.len()),
                Some(Lookup::NotFound) => StepResult::NotFound,
                None => StepResult::Skipped,
            };
            debug!(
                strategy = strategy.as_str(),
                radius,
                ?result,
                city = %query.city,
                state = %query.state,
                "pipeline step"
            );
            attempt.steps.push(Step {
                strategy,
                radius_miles: radius,
                result,
            });

            if let Some(Lookup::Found(resolution)) = lookup {
                return Some((strategy, resolution));
            }
        }
        None
    }

    fn name_lookup(&self, query: &LocationQuery, radius: f64, exclude: &Exclude<'_>) -> Option<Lookup> {
        if query.city.trim().is_empty() {
            return None;
        }

        let catalog = self.resolver.catalog();
        if let Some(center) = catalog.coordinates_of(&query.city, &query.state) {
            return Some(self.search(center, &query.state, radius, exclude));
        }

        // A guessed name must not shadow coordinates the caller already has.
        if !self.config.fuzzy_names || valid_coordinates(query).is_some() {
            return Some(Lookup::NotFound);
        }

        Some(match catalog.find_fuzzy(&query.city, &query.state) {
            Some(city) => self.search(city.coordinates(), &query.state, radius, exclude),
            None => Lookup::NotFound,
        })
    }

    fn coordinate_lookup(&self, query: &LocationQuery, radius: f64, exclude: &Exclude<'_>) -> Option<Lookup> {
        let center = valid_coordinates(query)?;
        Some(self.search(center, &query.state, radius, exclude))
    }

    async fn geocode_lookup(
        &self,
        query: &LocationQuery,
        radius: f64,
        exclude: &Exclude<'_>,
        attempt: &mut Attempt,
    ) -> Option<Lookup> {
        let geocoder = self.geocoder.as_deref()?;

        let coordinates = match attempt.geocoded {
            Some(cached) => cached,
            None => {
                let located = self.geocode(geocoder, query).await;
                attempt.geocoded = Some(located);
                located
            }
        };

        Some(match coordinates {
            Some(center) => self.search(center, &query.state, radius, exclude),
            None => Lookup::NotFound,
        })
    }

    async fn geocode(&self, geocoder: &dyn Geocoder, query: &LocationQuery) -> Option<Coordinates> {
        let text = query.geocode_text();
        let timeout = query.geocode_timeout.unwrap_or(self.config.geocode_timeout);
        let provider = geocoder.provider_name();

        match tokio::time::timeout(timeout, geocoder.locate(&text)).await {
            Ok(Ok(Some(coordinates))) if coordinates.is_valid() => {
                info!(provider, query = %text, lat = coordinates.lat, lng = coordinates.lng, "geocoded location");
                Some(coordinates)
            }
            Ok(Ok(Some(coordinates))) => {
                warn!(provider, query = %text, ?coordinates, "geocoder returned out-of-range coordinates");
                None
            }
            Ok(Ok(None)) => {
                warn!(provider, query = %text, "geocoder found no match");
                None
            }
            Ok(Err(error)) => {
                warn!(provider, query = %text, %error, "geocoding failed");
                None
            }
            Err(_) => {
                warn!(provider, query = %text, timeout_ms = timeout.as_millis() as u64, "geocoding timed out");
                None
            }
        }
    }

    fn search(&self, center: Coordinates, state: &str, radius: f64, exclude: &Exclude<'_>) -> Lookup {
        let mut cities = self.resolver.around(center, state, radius);
        cities.retain(|found| !exclude(&found.city));
        if cities.is_empty() {
            Lookup::NotFound
        } else {
            Lookup::Found(Resolution { cities, center })
        }
    }

    fn resolved(
        (strategy, resolution): (Strategy, Resolution),
        attempt: Attempt,
        radius_miles: f64,
        escalated: bool,
    ) -> PipelineOutcome {
        debug!(
            strategy = strategy.as_str(),
            cities = resolution.cities.len(),
            radius_miles,
            escalated,
            "nearby cities resolved"
        );
        PipelineOutcome {
            cities: resolution.cities,
            resolved_by: Some(strategy),
            escalated,
            radius_miles,
            center: Some(resolution.center),
            geocoded: attempt.geocoded.flatten(),
            steps: attempt.steps,
        }
    }

    fn failed(attempt: Attempt, radius_miles: f64) -> PipelineOutcome {
        PipelineOutcome {
            cities: Vec::new(),
            resolved_by: None,
            escalated: false,
            radius_miles,
            center: None,
            geocoded: attempt.geocoded.flatten(),
            steps: attempt.steps,
        }
    }
}
