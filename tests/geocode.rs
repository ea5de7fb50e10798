//! HTTP-level tests for the geocoding clients against a local `wiremock` server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use nearcity::geocode::{GoogleGeocoder, NominatimGeocoder};
use nearcity::{
    CityCatalog, Coordinates, GeocodeError, Geocoder, LocationQuery, NearbyCityPipeline,
    PipelineConfig, RadiusResolver, Strategy,
};

fn google(server: &MockServer) -> GoogleGeocoder {
    GoogleGeocoder::with_base_url("test-key", Duration::from_secs(5), &server.uri())
        .expect("failed to build test GoogleGeocoder")
}

fn nominatim(server: &MockServer) -> NominatimGeocoder {
    NominatimGeocoder::with_base_url(Duration::from_secs(5), &server.uri())
        .expect("failed to build test NominatimGeocoder")
}

fn google_ok(lat: f64, lng: f64) -> serde_json::Value {
    json!({
        "status": "OK",
        "results": [{
            "formatted_address": "Houston, TX, USA",
            "geometry": { "location": { "lat": lat, "lng": lng } }
        }]
    })
}

// ---------------------------------------------------------------------------
// Google
// ---------------------------------------------------------------------------

#[tokio::test]
async fn google_returns_first_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .and(query_param("address", "Houston, TX, USA"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_ok(29.7604, -95.3698)))
        .expect(1)
        .mount(&server)
        .await;

    let found = google(&server).locate("Houston, TX, USA").await.unwrap();
    assert_eq!(found, Some(Coordinates::new(29.7604, -95.3698)));
}

#[tokio::test]
async fn google_zero_results_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "ZERO_RESULTS", "results": []})),
        )
        .mount(&server)
        .await;

    assert_eq!(google(&server).locate("Atlantis, TX, USA").await.unwrap(), None);
}

#[tokio::test]
async fn google_denied_is_an_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}),
        ))
        .mount(&server)
        .await;

    let err = google(&server).locate("Houston, TX, USA").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Api(ref s) if s == "REQUEST_DENIED"), "got {err:?}");
}

#[tokio::test]
async fn google_server_error_is_a_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = google(&server).locate("Houston, TX, USA").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Status(500)), "got {err:?}");
}

#[tokio::test]
async fn google_malformed_body_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = google(&server).locate("Houston, TX, USA").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Malformed(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Nominatim
// ---------------------------------------------------------------------------

#[tokio::test]
async fn nominatim_parses_string_coordinates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Bartlett, TN, USA"))
        .and(query_param("countrycodes", "us"))
        .and(header("user-agent", "nearcity/0.1 (nearby-city-filters)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"lat": "35.2045328", "lon": "-89.8739753", "display_name": "Bartlett, Shelby County, Tennessee"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let found = nominatim(&server).locate("Bartlett, TN, USA").await.unwrap();
    assert_eq!(found, Some(Coordinates::new(35.2045328, -89.8739753)));
}

#[tokio::test]
async fn nominatim_empty_array_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(nominatim(&server).locate("Atlantis, TX, USA").await.unwrap(), None);
}

#[tokio::test]
async fn nominatim_bad_coordinate_text_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"lat": "north", "lon": "-89.8"}])))
        .mount(&server)
        .await;

    let err = nominatim(&server).locate("Bartlett, TN, USA").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Malformed(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Pipeline over HTTP
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pipeline_geocodes_through_google() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .and(query_param("address", "Westfield Ranch, TX, USA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(google_ok(29.9, -95.4)))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = CityCatalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/cities.json"))
        .expect("fixture loads");
    let pipeline = NearbyCityPipeline::new(RadiusResolver::new(Arc::new(catalog)), PipelineConfig::default())
        .with_geocoder(Arc::new(google(&server)));

    let outcome = pipeline
        .resolve(&LocationQuery::new("Westfield Ranch", "TX"), 30.0)
        .await;

    assert_eq!(outcome.resolved_by, Some(Strategy::GeocodeLookup));
    assert_eq!(outcome.cities[0].city.name, "Houston");
}
