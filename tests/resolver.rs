use std::sync::Arc;

use nearcity::{CityCatalog, RadiusResolver};

fn resolver() -> RadiusResolver {
    let catalog = CityCatalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/cities.json"))
        .expect("fixture loads");
    RadiusResolver::new(Arc::new(catalog))
}

fn names(found: &[nearcity::CityWithDistance]) -> Vec<&str> {
    found.iter().map(|f| f.city.name.as_str()).collect()
}

#[test]
fn houston_thirty_miles() {
    let resolver = resolver();
    let found = resolver.by_name("Houston", "TX", 30.0);

    assert_eq!(
        names(&found),
        vec![
            "Houston",
            "Pasadena",
            "Pearland",
            "Humble",
            "Sugar Land",
            "Spring",
            "Baytown",
            "League City",
            "Katy",
            "The Woodlands",
        ]
    );
    assert_eq!(found[0].distance_miles, 0.0);

    let sugar_land = found.iter().find(|f| f.city.name == "Sugar Land").unwrap();
    assert!((sugar_land.distance_miles - 19.09).abs() < 0.05);
}

#[test]
fn every_result_is_inside_the_radius_and_sorted() {
    let resolver = resolver();
    for radius in [5.0, 15.0, 30.0, 50.0, 250.0] {
        let found = resolver.by_name("Houston", "TX", radius);
        assert!(found.iter().all(|f| f.distance_miles <= radius));
        assert!(found.windows(2).all(|w| w[0].distance_miles <= w[1].distance_miles));
        assert!(found.iter().all(|f| f.city.state == "TX"));
    }

    assert_eq!(resolver.by_name("Houston", "TX", 250.0).len(), 14);
}

#[test]
fn memphis_stays_in_tennessee() {
    let resolver = resolver();
    let found = resolver.by_name("Memphis", "TN", 30.0);

    assert_eq!(
        names(&found),
        vec!["Memphis", "Bartlett", "Germantown", "Millington", "Collierville"]
    );
    let bartlett = &found[1];
    assert!((bartlett.distance_miles - 10.59).abs() < 1.0);
    assert!(found.iter().all(|f| f.city.name != "Southaven"));
}

#[test]
fn same_name_in_another_state_uses_that_state() {
    let resolver = resolver();

    let found = resolver.by_name("Memphis", "TX", 30.0);
    assert_eq!(names(&found), vec!["Memphis"]);

    let found = resolver.by_name("Houston", "MS", 30.0);
    assert_eq!(names(&found), vec!["Houston"]);
}

#[test]
fn unknown_city_or_state_is_empty() {
    let resolver = resolver();
    assert!(resolver.by_name("UnknownCityXYZ123", "TX", 30.0).is_empty());
    assert!(resolver.by_name("Houston", "", 30.0).is_empty());
    assert!(resolver.by_name("Houston", "ZZ", 30.0).is_empty());
}

#[test]
fn coordinates_search_matches_name_search() {
    let resolver = resolver();
    let by_name = resolver.by_name("Houston", "TX", 30.0);
    let by_coords = resolver.by_coordinates(29.76328, -95.36327, "TX", 30.0);
    assert_eq!(by_name, by_coords);
}

#[test]
fn repeated_searches_are_identical() {
    let resolver = resolver();
    let first = resolver.by_name("Memphis", "TN", 45.0);
    for _ in 0..5 {
        assert_eq!(resolver.by_name("Memphis", "TN", 45.0), first);
    }
}

#[test]
fn distance_between_catalog_cities() {
    let resolver = resolver();
    assert_eq!(
        resolver.distance_between("Memphis", "TN", "Bartlett", "TN"),
        Some(10.6)
    );
    assert_eq!(
        resolver.distance_between("Houston", "TX", "Nowhere", "TX"),
        None
    );
}
