use chrono::NaiveDate;

use immoscope_core::search::{search, SearchQuery};
use immoscope_core::{PropertyRecord, PropertyTable};

fn located(id: &str, postal: &str, lat: f64, lon: f64, price: f64, surface: f64) -> PropertyRecord {
    PropertyRecord {
        id_mutation: Some(id.to_string()),
        date_mutation: NaiveDate::from_ymd_opt(2023, 4, 12).expect("valid date"),
        nature_mutation: Some("Vente".to_string()),
        type_local: "Appartement".to_string(),
        valeur_fonciere: price,
        surface_reelle_bati: surface,
        nombre_pieces_principales: Some(3),
        latitude: Some(lat),
        longitude: Some(lon),
        nom_commune: Some("Montpellier".to_string()),
        code_commune: Some("34172".to_string()),
        code_postal: Some(postal.to_string()),
        code_departement: Some("34".to_string()),
        adresse_numero: None,
        adresse_nom_voie: None,
        source_department: Some("34".to_string()),
        price_per_sqm: price / surface,
    }
}

/// Two sales in 34000 at the same spot, one in 34170 roughly 2.9 km away, one in Nîmes.
fn montpellier() -> PropertyTable {
    PropertyTable::new(vec![
        located("center-1", "34000", 43.6100, 3.8770, 200_000.0, 50.0),
        located("center-2", "34000", 43.6100, 3.8770, 400_000.0, 120.0),
        located("nearby", "34170", 43.6300, 3.9000, 250_000.0, 70.0),
        located("nimes", "30000", 43.8370, 4.3600, 180_000.0, 60.0),
    ])
}

fn ids(records: &[PropertyRecord]) -> Vec<&str> {
    records
        .iter()
        .filter_map(|record| record.id_mutation.as_deref())
        .collect()
}

#[test]
fn postal_code_only_search_returns_exact_matches() {
    let result = search(&montpellier(), &SearchQuery::postal_code("34000"));

    assert_eq!(ids(&result.matches), vec!["center-1", "center-2"]);
    let (lat, lon) = result.center.expect("center");
    assert!((lat - 43.61).abs() < 1e-9);
    assert!((lon - 3.877).abs() < 1e-9);
}

#[test]
fn radius_includes_neighbouring_postal_codes() {
    let table = montpellier();

    let wide = search(&table, &SearchQuery::postal_code("34000").with_radius_km(5.0));
    assert_eq!(ids(&wide.matches), vec!["center-1", "center-2", "nearby"]);

    let narrow = search(&table, &SearchQuery::postal_code("34000").with_radius_km(1.0));
    assert_eq!(ids(&narrow.matches), vec!["center-1", "center-2"]);
}

#[test]
fn price_and_surface_bounds_apply_after_the_radius() {
    let table = montpellier();

    let capped = search(
        &table,
        &SearchQuery::postal_code("34000")
            .with_radius_km(5.0)
            .with_price_range(0.0, 300_000.0),
    );
    assert_eq!(ids(&capped.matches), vec!["center-1", "nearby"]);

    let large = search(
        &table,
        &SearchQuery::postal_code("34000")
            .with_radius_km(5.0)
            .with_surface_range(60.0, 0.0),
    );
    assert_eq!(ids(&large.matches), vec!["center-2", "nearby"]);
}

#[test]
fn unknown_postal_code_finds_nothing() {
    let result = search(&montpellier(), &SearchQuery::postal_code("75001").with_radius_km(50.0));

    assert!(result.is_empty());
    assert_eq!(result.center, None);
}

#[test]
fn records_without_coordinates_are_not_candidates() {
    let mut unlocated = located("unlocated", "34000", 0.0, 0.0, 100_000.0, 40.0);
    unlocated.latitude = None;
    let table = PropertyTable::new(vec![
        unlocated,
        located("center-1", "34000", 43.6100, 3.8770, 200_000.0, 50.0),
    ]);

    let result = search(&table, &SearchQuery::postal_code("34000"));

    assert_eq!(ids(&result.matches), vec!["center-1"]);
}

#[test]
fn equator_point_is_about_one_kilometre_east() {
    let table = PropertyTable::new(vec![
        located("origin", "00000", 0.0, 0.0, 100_000.0, 50.0),
        located("east", "00001", 0.0, 0.01, 100_000.0, 50.0),
    ]);

    let within_five = search(&table, &SearchQuery::postal_code("00000").with_radius_km(5.0));
    assert_eq!(ids(&within_five.matches), vec!["origin", "east"]);

    let within_one = search(&table, &SearchQuery::postal_code("00000").with_radius_km(1.0));
    assert_eq!(ids(&within_one.matches), vec!["origin"]);
}
