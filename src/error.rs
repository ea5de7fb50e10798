//! Error types for catalog loading, geocoding and configuration.

use thiserror::Error;

/// Errors raised while loading or serializing the city catalog.
///
/// Any of these at startup is fatal: every resolver operation depends on the
/// catalog being present.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The dataset file could not be read.
    #[error("failed to read dataset {path}: {source}")]
    Io {
        /// Path as given by the caller
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The dataset is not a JSON array of city records.
    #[error("dataset is not valid city JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The binary snapshot could not be decoded.
    #[error("failed to decode catalog snapshot: {0}")]
    SnapshotDecode(#[from] bincode::error::DecodeError),

    /// The catalog could not be encoded into a snapshot.
    #[error("failed to encode catalog snapshot: {0}")]
    SnapshotEncode(#[from] bincode::error::EncodeError),

    /// The snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshotVersion {
        /// Version stored in the snapshot
        found: u16,
        /// Version this build reads
        expected: u16,
    },

    /// The snapshot references a string index outside its table.
    #[error("snapshot string index {0} out of range")]
    CorruptSnapshot(u32),

    /// No usable US records survived validation.
    #[error("dataset contained no usable US city records")]
    Empty,
}

/// Errors from an external geocoding provider.
///
/// The nearby-city pipeline treats every variant as "no coordinates found".
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx HTTP status.
    #[error("provider returned HTTP {0}")]
    Status(u16),

    /// The provider answered 2xx but reported an error status in its body.
    #[error("provider reported status {0}")]
    Api(String),

    /// The response body did not have the expected shape.
    #[error("malformed geocoding response: {0}")]
    Malformed(String),

    /// The configured base URL could not be parsed.
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl {
        /// The rejected URL
        url: String,
        /// Parser message
        reason: String,
    },
}

/// Errors raised while reading settings from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is unset or blank.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// A variable is set but does not parse.
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar {
        /// Variable name
        var: String,
        /// What was wrong with it
        reason: String,
    },
}
