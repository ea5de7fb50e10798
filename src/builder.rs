//! Dataset builder: GeoNames dump to a catalog file.
//!
//! Downloads the GeoNames `cities1000` dump (every populated place with at
//! least 1,000 inhabitants), converts its rows to [`CityRecord`]s and writes
//! either a `cities.json` dataset or a binary catalog snapshot.

use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::catalog::CityCatalog;
use crate::types::CityRecord;

const DUMP_URL: &str = "https://download.geonames.org/export/dump/cities1000.zip";
const DUMP_FILE: &str = "cities1000.txt";

const FEATURE_CODES: &[&str] = &[
    "PPL", "PPLA", "PPLA2", "PPLA3", "PPLA4", "PPLC", "PPLG", "PPLS",
];

/// Downloads the GeoNames dump and writes a dataset file.
pub struct Builder {
    url: String,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    /// A builder using the official GeoNames download.
    pub fn new() -> Self {
        Self {
            url: DUMP_URL.to_string(),
        }
    }

    /// Downloads from a mirror instead of geonames.org.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Downloads, converts and writes the dataset to `output_path`.
    ///
    /// A `.bin` extension produces a snapshot; anything else produces JSON.
    pub fn build(&self, output_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        info!(url = %self.url, "downloading GeoNames dump");
        let content = self.download()?;

        let records = parse_geonames(&content);
        info!(records = records.len(), "parsed GeoNames rows");

        let encoded = if output_path.extension().is_some_and(|ext| ext == "bin") {
            CityCatalog::from_records(records)?.to_snapshot_bytes()?
        } else {
            serde_json::to_vec(&records)?
        };

        std::fs::write(output_path, &encoded)?;
        info!(
            path = %output_path.display(),
            size_kb = encoded.len() / 1_000,
            "dataset written"
        );
        Ok(())
    }

    fn download(&self) -> Result<String, Box<dyn std::error::Error>> {
        let bytes = reqwest::blocking::get(&self.url)?.error_for_status()?.bytes()?;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
        let mut content = String::new();
        archive.by_name(DUMP_FILE)?.read_to_string(&mut content)?;
        Ok(content)
    }
}

/// Converts tab-separated GeoNames rows into dataset records.
///
/// Columns: 1 name, 4 latitude, 5 longitude, 7 feature code, 8 country code,
/// 10 admin1 code. Rows that are not populated places are dropped; country and
/// coordinate validation is left to the catalog.
pub fn parse_geonames(content: &str) -> Vec<CityRecord> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split('\t').collect();
            if parts.len() < 11 || !FEATURE_CODES.contains(&parts[7]) {
                return None;
            }

            Some(CityRecord {
                name: parts[1].to_string(),
                country: parts[8].to_string(),
                admin1: parts[10].to_string(),
                lat: parts[4].to_string(),
                lng: parts[5].to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_populated_places_only() {
        let dump = [
            "4699066\tHouston\tHouston\t\t29.76328\t-95.36327\tP\tPPLA2\tUS\t\tTX\t201\t\t\t2304580\t15\t14\tAmerica/Chicago\t2024-01-01",
            "1\tSome Lake\tSome Lake\t\t30.0\t-95.0\tH\tLK\tUS\t\tTX\t\t\t\t0\t\t\tAmerica/Chicago\t2024-01-01",
            "short\trow",
        ]
        .join("\n");

        let records = parse_geonames(&dump);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Houston");
        assert_eq!(records[0].admin1, "TX");
        assert_eq!(records[0].country, "US");
        assert_eq!(records[0].lat, "29.76328");
    }
}
