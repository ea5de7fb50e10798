//! Environment-driven settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, GeocodeError};
use crate::geocode::{Geocoder, GoogleGeocoder, NominatimGeocoder};
use crate::pipeline::PipelineConfig;

/// Which external geocoder the pipeline falls back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocoderKind {
    /// Google Maps Geocoding API
    Google {
        /// `GOOGLE_MAPS_API_KEY`
        api_key: String,
    },
    /// OpenStreetMap Nominatim
    Nominatim,
    /// No geocode step
    Disabled,
}

/// Runtime settings for the nearby-city core.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `CITY_DATASET_PATH`: `.json` records or a `.bin` snapshot
    pub dataset_path: PathBuf,
    /// `GEOCODER`, defaulting to Google when an API key is present
    pub geocoder: GeocoderKind,
    /// Overrides the provider's default endpoint (self-hosted Nominatim, test servers)
    pub geocoder_base_url: Option<String>,
    /// `GEOCODE_TIMEOUT_SECS`
    pub geocode_timeout: Duration,
    /// `NEARBY_RADIUS_MILES`
    pub default_radius_miles: f64,
    /// `NEARBY_ESCALATION_RADII`, comma separated
    pub escalation_radii: Vec<f64>,
    /// `FILTER_MAX_AGE_DAYS`
    pub filter_max_age_days: i64,
    /// `PROPERTY_MAX_NEARBY`
    pub property_max_cities: usize,
    /// `BACKFILL_CHUNK_SIZE`
    pub backfill_chunk_size: usize,
    /// `FUZZY_CITY_NAMES`
    pub fuzzy_names: bool,
}

impl Settings {
    /// Loads `.env` (if present) and reads settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key))
    }

    /// Reads settings through `lookup` instead of the process environment,
    /// so callers can overlay values (command-line flags) without mutating it.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        build_settings(lookup)
    }

    /// The pipeline tunables these settings describe.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            escalation_radii: self.escalation_radii.clone(),
            geocode_timeout: self.geocode_timeout,
            fuzzy_names: self.fuzzy_names,
        }
    }

    /// Builds the configured geocoder, or `None` when geocoding is disabled.
    ///
    /// # Errors
    ///
    /// Returns `GeocodeError` if the HTTP client or base URL is invalid.
    pub fn build_geocoder(&self) -> Result<Option<Arc<dyn Geocoder>>, GeocodeError> {
        let base_url = self.geocoder_base_url.as_deref();
        let geocoder: Arc<dyn Geocoder> = match &self.geocoder {
            GeocoderKind::Disabled => return Ok(None),
            GeocoderKind::Google { api_key } => Arc::new(match base_url {
                Some(url) => GoogleGeocoder::with_base_url(api_key, self.geocode_timeout, url)?,
                None => GoogleGeocoder::new(api_key, self.geocode_timeout)?,
            }),
            GeocoderKind::Nominatim => Arc::new(match base_url {
                Some(url) => NominatimGeocoder::with_base_url(self.geocode_timeout, url)?,
                None => NominatimGeocoder::new(self.geocode_timeout)?,
            }),
        };
        Ok(Some(geocoder))
    }
}

/// Core parsing/validation, decoupled from the process environment so it can
/// be tested with a plain map lookup.
fn build_settings<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_f64 = |var: &str, default: f64| -> Result<f64, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
                Ok(v) => Err(invalid(var, format!("{v} is not a non-negative distance"))),
                Err(e) => Err(invalid(var, e.to_string())),
            },
        }
    };

    let parse_u64 = |var: &str, default: u64| -> Result<u64, ConfigError> {
        optional(var).map_or(Ok(default), |raw| {
            raw.parse::<u64>().map_err(|e| invalid(var, e.to_string()))
        })
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var).map(|v| v.to_ascii_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => Err(invalid(var, format!("'{other}' is not a boolean"))),
        }
    };

    let dataset_path = PathBuf::from(require("CITY_DATASET_PATH")?);

    let api_key = optional("GOOGLE_MAPS_API_KEY");
    let geocoder = match optional("GEOCODER").map(|v| v.to_ascii_lowercase()).as_deref() {
        None => match api_key {
            Some(api_key) => GeocoderKind::Google { api_key },
            None => GeocoderKind::Disabled,
        },
        Some("google") => GeocoderKind::Google {
            api_key: require("GOOGLE_MAPS_API_KEY")?,
        },
        Some("nominatim") => GeocoderKind::Nominatim,
        Some("none") => GeocoderKind::Disabled,
        Some(other) => {
            return Err(invalid(
                "GEOCODER",
                format!("unknown provider '{other}' (expected google, nominatim or none)"),
            ))
        }
    };

    let escalation_radii = match optional("NEARBY_ESCALATION_RADII") {
        None => vec![45.0],
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v > 0.0)
                    .ok_or_else(|| invalid("NEARBY_ESCALATION_RADII", format!("bad radius '{s}'")))
            })
            .collect::<Result<Vec<_>, _>>()?,
    };

    let filter_max_age_days = i64::try_from(parse_u64("FILTER_MAX_AGE_DAYS", 30)?)
        .map_err(|e| invalid("FILTER_MAX_AGE_DAYS", e.to_string()))?;

    Ok(Settings {
        dataset_path,
        geocoder,
        geocoder_base_url: optional("GEOCODER_BASE_URL"),
        geocode_timeout: Duration::from_secs(parse_u64("GEOCODE_TIMEOUT_SECS", 10)?),
        default_radius_miles: parse_f64("NEARBY_RADIUS_MILES", 30.0)?,
        escalation_radii,
        filter_max_age_days,
        property_max_cities: parse_u64("PROPERTY_MAX_NEARBY", 100)? as usize,
        backfill_chunk_size: parse_u64("BACKFILL_CHUNK_SIZE", 400)? as usize,
        fuzzy_names: parse_bool("FUZZY_CITY_NAMES", true)?,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn minimal_env<'a>() -> HashMap<&'a str, &'a str> {
        let mut m = HashMap::new();
        m.insert("CITY_DATASET_PATH", "data/cities.json");
        m
    }

    #[test]
    fn fails_without_dataset_path() {
        let map: HashMap<&str, &str> = HashMap::new();
        let result = build_settings(lookup_from_map(&map));
        assert!(
            matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "CITY_DATASET_PATH"),
            "expected MissingEnvVar(CITY_DATASET_PATH), got: {result:?}"
        );
    }

    #[test]
    fn defaults_apply() {
        let map = minimal_env();
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert_eq!(settings.dataset_path, PathBuf::from("data/cities.json"));
        assert_eq!(settings.geocoder, GeocoderKind::Disabled);
        assert_eq!(settings.default_radius_miles, 30.0);
        assert_eq!(settings.escalation_radii, vec![45.0]);
        assert_eq!(settings.filter_max_age_days, 30);
        assert_eq!(settings.geocode_timeout, Duration::from_secs(10));
        assert_eq!(settings.property_max_cities, 100);
        assert_eq!(settings.backfill_chunk_size, 400);
        assert!(settings.fuzzy_names);
    }

    #[test]
    fn api_key_enables_google_by_default() {
        let mut map = minimal_env();
        map.insert("GOOGLE_MAPS_API_KEY", "abc123");
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert_eq!(
            settings.geocoder,
            GeocoderKind::Google {
                api_key: "abc123".into()
            }
        );
    }

    #[test]
    fn google_requires_key() {
        let mut map = minimal_env();
        map.insert("GEOCODER", "google");
        let result = build_settings(lookup_from_map(&map));
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "GOOGLE_MAPS_API_KEY"));
    }

    #[test]
    fn parses_overrides() {
        let mut map = minimal_env();
        map.insert("GEOCODER", "Nominatim");
        map.insert("NEARBY_RADIUS_MILES", "25");
        map.insert("NEARBY_ESCALATION_RADII", "45, 60,120");
        map.insert("FUZZY_CITY_NAMES", "off");
        map.insert("GEOCODE_TIMEOUT_SECS", "3");
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert_eq!(settings.geocoder, GeocoderKind::Nominatim);
        assert_eq!(settings.default_radius_miles, 25.0);
        assert_eq!(settings.escalation_radii, vec![45.0, 60.0, 120.0]);
        assert!(!settings.fuzzy_names);
        assert_eq!(settings.pipeline_config().geocode_timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_values() {
        let mut map = minimal_env();
        map.insert("NEARBY_ESCALATION_RADII", "45,wide");
        assert!(matches!(
            build_settings(lookup_from_map(&map)),
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "NEARBY_ESCALATION_RADII"
        ));

        let mut map = minimal_env();
        map.insert("GEOCODER", "bing");
        assert!(matches!(
            build_settings(lookup_from_map(&map)),
            Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "GEOCODER"
        ));

        let mut map = minimal_env();
        map.insert("NEARBY_RADIUS_MILES", "-5");
        assert!(build_settings(lookup_from_map(&map)).is_err());
    }

    #[test]
    fn lookup_overlay_takes_precedence() {
        let map = minimal_env();
        let base = lookup_from_map(&map);
        let settings = Settings::from_lookup(|key| match key {
            "CITY_DATASET_PATH" => Ok("/srv/cities.bin".to_string()),
            _ => base(key),
        })
        .unwrap();
        assert_eq!(settings.dataset_path, PathBuf::from("/srv/cities.bin"));
        assert_eq!(settings.default_radius_miles, 30.0);
    }

    #[test]
    fn disabled_geocoder_builds_nothing() {
        let map = minimal_env();
        let settings = build_settings(lookup_from_map(&map)).unwrap();
        assert!(settings.build_geocoder().unwrap().is_none());
    }
}
