//! The in-memory city catalog.
//!
//! The catalog is loaded once per process, validated, partitioned by state and
//! never mutated afterwards. Components receive it as an `Arc<CityCatalog>`;
//! a process-wide handle is available through [`init_global`] / [`global`].

use std::path::Path;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::error::CatalogError;
use crate::names;
use crate::types::{CatalogSnapshot, City, CityRecord, CompactCity, Coordinates};

static CATALOG: OnceLock<Arc<CityCatalog>> = OnceLock::new();

/// Current [`CatalogSnapshot`] format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Installs `catalog` as the process-wide catalog and returns the shared handle.
///
/// Initialization happens once; if a catalog is already installed the new one
/// is dropped and the existing handle is returned.
pub fn init_global(catalog: CityCatalog) -> Arc<CityCatalog> {
    let mut fresh = Some(catalog);
    let installed = CATALOG.get_or_init(|| Arc::new(fresh.take().unwrap_or_default()));
    if fresh.is_some() {
        warn!("city catalog already initialized; ignoring second load");
    }
    Arc::clone(installed)
}

/// The process-wide catalog, if [`init_global`] has run.
pub fn global() -> Option<Arc<CityCatalog>> {
    CATALOG.get().cloned()
}

/// Summary counts for monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStats {
    /// Number of entries in the catalog
    pub total_cities: usize,
    /// Entry count per state code
    pub cities_by_state: FxHashMap<String, usize>,
    /// The ten largest state partitions, largest first
    pub largest_states: Vec<(String, usize)>,
}

/// Validated, state-partitioned US city entries.
#[derive(Debug, Default)]
pub struct CityCatalog {
    cities: Vec<City>,
    by_state: FxHashMap<String, Vec<u32>>,
    by_name: FxHashMap<(String, String), u32>,
}

impl CityCatalog {
    /// Builds a catalog from raw dataset rows.
    ///
    /// Keeps only `country == "US"` rows with a non-empty state code and
    /// finite, in-range coordinates; everything else is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Empty`] if no row survives validation.
    pub fn from_records<I>(records: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = CityRecord>,
    {
        let mut discarded = 0usize;
        let cities: Vec<City> = records
            .into_iter()
            .filter_map(|record| {
                let city = normalize_record(&record);
                if city.is_none() {
                    discarded += 1;
                }
                city
            })
            .collect();

        if cities.is_empty() {
            return Err(CatalogError::Empty);
        }

        let catalog = Self::from_cities(cities);
        info!(
            cities = catalog.len(),
            states = catalog.by_state.len(),
            discarded,
            "city catalog loaded"
        );
        Ok(catalog)
    }

    /// Parses a JSON array of [`CityRecord`]s.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] on malformed input or
    /// [`CatalogError::Empty`] if nothing usable remains.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let records: Vec<CityRecord> = serde_json::from_str(json)?;
        Self::from_records(records)
    }

    /// Reads and parses a `cities.json` style file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Decodes a snapshot produced by [`to_snapshot_bytes`](Self::to_snapshot_bytes).
    ///
    /// # Errors
    ///
    /// Returns a decode, version or corruption error, or
    /// [`CatalogError::Empty`] for a snapshot without entries.
    pub fn from_snapshot_bytes(bytes: &[u8]) -> Result<Self, CatalogError> {
        let (snapshot, _): (CatalogSnapshot, _) =
            bincode::decode_from_slice(bytes, bincode::config::standard())?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CatalogError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let string = |idx: u32| {
            snapshot
                .strings
                .get(idx as usize)
                .cloned()
                .ok_or(CatalogError::CorruptSnapshot(idx))
        };

        let cities = snapshot
            .cities
            .iter()
            .map(|compact| -> Result<City, CatalogError> {
                let coords = compact.coordinates();
                Ok(City {
                    name: string(compact.name)?,
                    state: string(compact.state)?,
                    lat: coords.lat,
                    lng: coords.lng,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if cities.is_empty() {
            return Err(CatalogError::Empty);
        }

        let catalog = Self::from_cities(cities);
        info!(cities = catalog.len(), "city catalog loaded from snapshot");
        Ok(catalog)
    }

    /// Loads a dataset file, choosing the snapshot decoder for `.bin` files
    /// and the JSON parser otherwise.
    ///
    /// # Errors
    ///
    /// See [`from_json_path`](Self::from_json_path) and
    /// [`from_snapshot_bytes`](Self::from_snapshot_bytes).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if path.extension().is_some_and(|ext| ext == "bin") {
            let bytes = std::fs::read(path).map_err(|source| CatalogError::Io {
                path: path.display().to_string(),
                source,
            })?;
            Self::from_snapshot_bytes(&bytes)
        } else {
            Self::from_json_path(path)
        }
    }

    /// Encodes the catalog into the compact binary snapshot format.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::SnapshotEncode`] if bincode fails.
    pub fn to_snapshot_bytes(&self) -> Result<Vec<u8>, CatalogError> {
        let mut string_map: FxHashMap<String, u32> = FxHashMap::default();
        let mut strings = Vec::new();
        let mut intern = |s: &str| intern_string(s, &mut string_map, &mut strings);

        let cities = self
            .cities
            .iter()
            .map(|city| CompactCity {
                name: intern(&city.name),
                state: intern(&city.state),
                lat: (city.lat * 100000.0).round() as i32,
                lng: (city.lng * 100000.0).round() as i32,
            })
            .collect();

        let snapshot = CatalogSnapshot {
            version: SNAPSHOT_VERSION,
            strings,
            cities,
        };
        Ok(bincode::encode_to_vec(&snapshot, bincode::config::standard())?)
    }

    fn from_cities(cities: Vec<City>) -> Self {
        let mut by_state: FxHashMap<String, Vec<u32>> = FxHashMap::default();
        let mut by_name: FxHashMap<(String, String), u32> = FxHashMap::default();

        for (idx, city) in cities.iter().enumerate() {
            let idx = idx as u32;
            by_state.entry(city.state.clone()).or_default().push(idx);
            by_name
                .entry((city.state.clone(), city.name.to_lowercase()))
                .or_insert(idx);
        }

        Self {
            cities,
            by_state,
            by_name,
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    /// Whether the catalog holds no entries.
    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// State codes present in the catalog, sorted.
    pub fn states(&self) -> Vec<&str> {
        let mut states: Vec<&str> = self.by_state.keys().map(String::as_str).collect();
        states.sort_unstable();
        states
    }

    /// Exact case-insensitive lookup of a `(name, state)` entry.
    ///
    /// When a state holds several entries with the same name, the first one
    /// loaded wins.
    pub fn find(&self, name: &str, state: &str) -> Option<&City> {
        let key = (normalize_state(state), name.trim().to_lowercase());
        self.by_name
            .get(&key)
            .map(|&idx| &self.cities[idx as usize])
    }

    /// Coordinates of the exact `(name, state)` entry, if any.
    pub fn coordinates_of(&self, name: &str, state: &str) -> Option<Coordinates> {
        self.find(name, state).map(City::coordinates)
    }

    /// All entries of one state partition, in load order.
    ///
    /// An empty or unknown state yields nothing.
    pub fn entries_in_state<'a>(
        &'a self,
        state: &str,
    ) -> impl Iterator<Item = &'a City> + Clone + 'a {
        let indices: &'a [u32] = self
            .by_state
            .get(&normalize_state(state))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        indices.iter().map(move |&idx| &self.cities[idx as usize])
    }

    /// Tolerant lookup that folds abbreviations and optional suffixes.
    ///
    /// See [`names::find_fuzzy`] for the matching rules.
    pub fn find_fuzzy(&self, name: &str, state: &str) -> Option<&City> {
        let found = names::find_fuzzy(name, self.entries_in_state(state));
        if let Some(city) = found {
            if !city.is_named(name) {
                debug!(query = name, matched = %city.name, state, "fuzzy city match");
            }
        }
        found
    }

    /// Name search for autocomplete: exact matches first, then prefix matches,
    /// then substring matches. Queries shorter than two characters return nothing.
    pub fn search(&self, query: &str, state: Option<&str>, limit: usize) -> Vec<&City> {
        let query = query.trim().to_lowercase();
        if query.chars().count() < 2 {
            return Vec::new();
        }

        let pool: Vec<&City> = match state {
            Some(state) => self.entries_in_state(state).collect(),
            None => self.cities.iter().collect(),
        };

        let mut exact = Vec::new();
        let mut prefix = Vec::new();
        let mut contains = Vec::new();
        for city in pool {
            let name = city.name.to_lowercase();
            if name == query {
                exact.push(city);
            } else if name.starts_with(&query) {
                prefix.push(city);
            } else if name.contains(&query) {
                contains.push(city);
            }
        }

        exact
            .into_iter()
            .chain(prefix)
            .chain(contains)
            .take(limit)
            .collect()
    }

    /// Entry counts overall and per state.
    pub fn stats(&self) -> CatalogStats {
        let cities_by_state: FxHashMap<String, usize> = self
            .by_state
            .iter()
            .map(|(state, idx)| (state.clone(), idx.len()))
            .collect();

        let mut largest_states: Vec<(String, usize)> = cities_by_state
            .iter()
            .map(|(state, count)| (state.clone(), *count))
            .collect();
        largest_states.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        largest_states.truncate(10);

        CatalogStats {
            total_cities: self.cities.len(),
            cities_by_state,
            largest_states,
        }
    }
}

fn normalize_state(state: &str) -> String {
    state.trim().to_ascii_uppercase()
}

fn normalize_record(record: &CityRecord) -> Option<City> {
    if !record.country.trim().eq_ignore_ascii_case("US") {
        return None;
    }

    let name = record.name.trim();
    let state = normalize_state(&record.admin1);
    if name.is_empty() || state.is_empty() {
        return None;
    }

    let lat = record.lat.trim().parse::<f64>().ok()?;
    let lng = record.lng.trim().parse::<f64>().ok()?;
    if !Coordinates::new(lat, lng).is_valid() {
        return None;
    }

    Some(City {
        name: name.to_string(),
        state,
        lat,
        lng,
    })
}

fn intern_string(s: &str, map: &mut FxHashMap<String, u32>, strings: &mut Vec<String>) -> u32 {
    *map.entry(s.to_string()).or_insert_with(|| {
        let idx = strings.len() as u32;
        strings.push(s.to_string());
        idx
    })
}
