use chrono::NaiveDate;

use immoscope_core::config::ViewsConfig;
use immoscope_core::views::{
    commune_activity, commune_choropleth, commune_price_stats, geo_listing, market_trends,
    monthly_type_prices, monthly_type_volume, property_features, property_type_stats,
    top_types_per_commune, type_price_medians,
};
use immoscope_core::{PropertyRecord, PropertyTable, ViewKind};

fn sale(commune: &str, postal: &str, type_local: &str, price: f64, surface: f64) -> PropertyRecord {
    PropertyRecord {
        id_mutation: None,
        date_mutation: NaiveDate::from_ymd_opt(2023, 6, 1).expect("valid date"),
        nature_mutation: Some("Vente".to_string()),
        type_local: type_local.to_string(),
        valeur_fonciere: price,
        surface_reelle_bati: surface,
        nombre_pieces_principales: None,
        latitude: Some(43.61),
        longitude: Some(3.87),
        nom_commune: Some(commune.to_string()),
        code_commune: None,
        code_postal: Some(postal.to_string()),
        code_departement: Some("34".to_string()),
        adresse_numero: None,
        adresse_nom_voie: None,
        source_department: Some("34".to_string()),
        price_per_sqm: price / surface,
    }
}

fn on(mut record: PropertyRecord, year: i32, month: u32) -> PropertyRecord {
    record.date_mutation = NaiveDate::from_ymd_opt(year, month, 10).expect("valid date");
    record
}

#[test]
fn commune_prices_group_sales_by_commune() {
    let mut exchange = sale("A", "34000", "Maison", 500.0, 1.0);
    exchange.nature_mutation = Some("Echange".to_string());
    let table = PropertyTable::new(vec![
        sale("A", "34000", "Maison", 100.0, 1.0),
        sale("A", "34000", "Maison", 200.0, 1.0),
        sale("B", "34100", "Maison", 50.0, 1.0),
        exchange,
    ]);

    let stats = commune_price_stats(&table, "Vente");

    assert_eq!(stats.len(), 2);
    let a = &stats[0];
    assert_eq!(a.nom_commune.as_deref(), Some("A"));
    assert_eq!(a.avg_price_per_sqm, 150.0);
    assert_eq!(a.median_price_per_sqm, 150.0);
    assert_eq!(a.transaction_count, 2);
    assert_eq!(a.avg_total_price, 150.0);

    let b = &stats[1];
    assert_eq!(b.nom_commune.as_deref(), Some("B"));
    assert_eq!(b.avg_price_per_sqm, 50.0);
    assert_eq!(b.median_price_per_sqm, 50.0);
    assert_eq!(b.transaction_count, 1);
}

#[test]
fn property_types_report_known_rooms_only() {
    let mut three_rooms = sale("A", "34000", "Appartement", 150_000.0, 50.0);
    three_rooms.nombre_pieces_principales = Some(3);
    let table = PropertyTable::new(vec![
        three_rooms,
        sale("A", "34000", "Appartement", 90_000.0, 30.0),
        sale("A", "34000", "Maison", 300_000.0, 100.0),
    ]);

    let stats = property_type_stats(&table);

    assert_eq!(stats[0].type_local, "Appartement");
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[0].avg_surface, 40.0);
    assert_eq!(stats[0].median_price, 120_000.0);
    assert_eq!(stats[0].avg_rooms, Some(3.0));
    assert_eq!(stats[1].type_local, "Maison");
    assert_eq!(stats[1].avg_rooms, None);
}

#[test]
fn market_trends_run_oldest_month_first() {
    let table = PropertyTable::new(vec![
        on(sale("A", "34000", "Maison", 300.0, 1.0), 2023, 3),
        on(sale("A", "34000", "Maison", 100.0, 1.0), 2023, 1),
        on(sale("A", "34000", "Maison", 200.0, 1.0), 2022, 12),
        on(sale("A", "34000", "Maison", 400.0, 1.0), 2023, 3),
    ]);

    let trends = market_trends(&table);

    let months: Vec<(i32, u32)> = trends.iter().map(|row| (row.year, row.month)).collect();
    assert_eq!(months, vec![(2022, 12), (2023, 1), (2023, 3)]);
    assert_eq!(trends[2].transaction_count, 2);
    assert_eq!(trends[2].median_price_per_sqm, 350.0);
}

#[test]
fn commune_activity_counts_distinct_streets() {
    let street = |name: Option<&str>| {
        let mut record = sale("A", "34000", "Maison", 100.0, 1.0);
        record.adresse_nom_voie = name.map(str::to_string);
        record
    };
    let table = PropertyTable::new(vec![
        sale("B", "34100", "Maison", 100.0, 1.0),
        street(Some("Rue Foch")),
        street(Some("Rue Foch")),
        street(Some("Rue de la Loge")),
        street(None),
    ]);

    let activity = commune_activity(&table);

    assert_eq!(activity[0].nom_commune.as_deref(), Some("A"));
    assert_eq!(activity[0].transaction_count, 4);
    assert_eq!(activity[0].unique_streets, 2);
    assert_eq!(activity[1].unique_streets, 0);
}

#[test]
fn property_features_round_averages_and_default_to_zero() {
    let rooms = |count: i64, surface: f64| {
        let mut record = sale("A", "34000", "Appartement", 100_000.0, surface);
        record.nombre_pieces_principales = Some(count);
        record
    };
    let table = PropertyTable::new(vec![
        sale("A", "34000", "Maison", 200_000.0, 90.0),
        rooms(2, 40.0),
        rooms(3, 55.0),
        rooms(3, 62.0),
    ]);

    let features = property_features(&table);

    assert_eq!(features[0].type_local, "Appartement");
    assert_eq!(features[0].transaction_count, 3);
    assert_eq!(features[0].avg_rooms, 2.7);
    assert_eq!(features[0].median_rooms, 3.0);
    assert_eq!(features[0].avg_surface, 52.3);
    assert_eq!(features[0].median_surface, 55.0);
    assert_eq!(features[1].type_local, "Maison");
    assert_eq!(features[1].avg_rooms, 0.0);
    assert_eq!(features[1].median_rooms, 0.0);
}

#[test]
fn choropleth_keeps_communes_with_enough_sales() {
    let in_commune = |code: &str| {
        let mut record = sale("Montpellier", "34000", "Maison", 3000.0, 1.0);
        record.code_commune = Some(code.to_string());
        record
    };
    let mut records: Vec<PropertyRecord> = (0..5).map(|_| in_commune("34172")).collect();
    records.extend((0..4).map(|_| in_commune("30189")));
    let mut unlocated = in_commune("30189");
    unlocated.latitude = None;
    records.push(unlocated);

    let points = commune_choropleth(&PropertyTable::new(records), 5);

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].code_commune, "34172");
    assert_eq!(points[0].transaction_count, 5);
    assert_eq!(points[0].median_price_per_sqm, 3000.0);
}

#[test]
fn monthly_volume_splits_by_type() {
    let table = PropertyTable::new(vec![
        on(sale("A", "34000", "Maison", 100.0, 1.0), 2023, 1),
        on(sale("A", "34000", "Appartement", 100.0, 1.0), 2023, 1),
        on(sale("A", "34000", "Maison", 100.0, 1.0), 2023, 1),
    ]);

    let volume = monthly_type_volume(&table);

    assert_eq!(volume.len(), 2);
    assert_eq!(volume[0].type_local, "Appartement");
    assert_eq!(volume[1].type_local, "Maison");
    assert_eq!(volume[1].transaction_count, 2);
}

#[test]
fn top_types_are_ranked_per_commune() {
    let mut records = Vec::new();
    for (type_local, count) in [
        ("Appartement", 3),
        ("Maison", 2),
        ("Local industriel", 1),
        ("Dépendance", 1),
    ] {
        records.extend((0..count).map(|_| sale("A", "34000", type_local, 100.0, 1.0)));
    }
    let mut unnamed = sale("A", "34000", "Maison", 100.0, 1.0);
    unnamed.nom_commune = None;
    records.push(unnamed);

    let top = top_types_per_commune(&PropertyTable::new(records), 3);

    let ranked: Vec<(usize, &str, usize)> = top
        .iter()
        .map(|row| (row.rank, row.type_local.as_str(), row.transaction_count))
        .collect();
    assert_eq!(
        ranked,
        vec![(1, "Appartement", 3), (2, "Maison", 2), (3, "Dépendance", 1)]
    );
}

#[test]
fn views_on_an_empty_table_have_no_rows() {
    let table = PropertyTable::empty();
    let config = ViewsConfig::default();

    for kind in ViewKind::ALL {
        assert!(kind.compute(&table, &config).is_empty(), "{kind} should be empty");
    }
}

#[test]
fn view_names_parse_with_dashes_or_underscores() {
    assert_eq!("market-trends".parse::<ViewKind>(), Ok(ViewKind::MarketTrends));
    assert_eq!("commune_prices".parse::<ViewKind>(), Ok(ViewKind::CommunePrices));
    assert!("heatmap".parse::<ViewKind>().is_err());
}

#[test]
fn geo_listing_skips_records_without_coordinates() {
    let mut no_latitude = sale("A", "34000", "Maison", 100.0, 1.0);
    no_latitude.latitude = None;
    let mut no_longitude = sale("A", "34000", "Maison", 100.0, 1.0);
    no_longitude.longitude = None;
    let mut located = sale("A", "34000", "Appartement", 200_000.0, 50.0);
    located.id_mutation = Some("2023-7".to_string());

    let listing = geo_listing(&PropertyTable::new(vec![no_latitude, located, no_longitude]));

    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id_mutation.as_deref(), Some("2023-7"));
    assert_eq!(listing[0].latitude, 43.61);
    assert_eq!(listing[0].price_per_sqm, 4000.0);
}

#[test]
fn monthly_prices_are_ordered_by_month_then_type() {
    let table = PropertyTable::new(vec![
        on(sale("A", "34000", "Maison", 3000.0, 1.0), 2023, 2),
        on(sale("A", "34000", "Maison", 2000.0, 1.0), 2023, 1),
        on(sale("A", "34000", "Appartement", 4000.0, 1.0), 2023, 2),
        on(sale("A", "34000", "Maison", 2500.0, 1.0), 2023, 1),
        on(sale("A", "34000", "Maison", 1000.0, 1.0), 2022, 11),
    ]);

    let prices = monthly_type_prices(&table);

    let keys: Vec<(i32, u32, &str, f64, usize)> = prices
        .iter()
        .map(|row| {
            (
                row.year,
                row.month,
                row.type_local.as_str(),
                row.median_price_per_sqm,
                row.transaction_count,
            )
        })
        .collect();
    assert_eq!(
        keys,
        vec![
            (2022, 11, "Maison", 1000.0, 1),
            (2023, 1, "Maison", 2250.0, 2),
            (2023, 2, "Appartement", 4000.0, 1),
            (2023, 2, "Maison", 3000.0, 1),
        ]
    );
}

#[test]
fn type_price_medians_put_the_most_traded_type_first() {
    let table = PropertyTable::new(vec![
        sale("A", "34000", "Appartement", 3000.0, 1.0),
        sale("A", "34000", "Maison", 2000.0, 1.0),
        sale("A", "34000", "Maison", 2600.0, 1.0),
        sale("A", "34000", "Maison", 9000.0, 1.0),
    ]);

    let medians = type_price_medians(&table);

    assert_eq!(medians[0].type_local, "Maison");
    assert_eq!(medians[0].median_price_per_sqm, 2600.0);
    assert_eq!(medians[0].transaction_count, 3);
    assert_eq!(medians[1].type_local, "Appartement");
    assert_eq!(medians[1].median_price_per_sqm, 3000.0);
}
