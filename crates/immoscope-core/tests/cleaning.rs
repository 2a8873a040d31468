use polars::prelude::*;

use immoscope_core::cleaning::{clean, missing_columns, CleaningOptions, CleaningStage};
use immoscope_core::LoadError;

fn frame(type_local: &[Option<&str>], surfaces: &[f64]) -> PolarsResult<DataFrame> {
    let len = surfaces.len();
    df!(
        "date_mutation" => vec!["2023-05-02"; len],
        "type_local" => type_local,
        "valeur_fonciere" => vec![120_000.0; len],
        "surface_reelle_bati" => surfaces,
        "nombre_pieces_principales" => vec![3i64; len],
        "latitude" => vec![43.6; len],
        "longitude" => vec![3.9; len],
    )
}

#[test]
fn cleaning_stops_at_the_stage_that_empties_the_table() -> PolarsResult<()> {
    let df = frame(&[None, None], &[50.0, 60.0])?;

    let outcome = clean(df, &CleaningOptions::default()).expect("clean");

    assert_eq!(outcome.frame.height(), 0);
    assert_eq!(outcome.emptied_at, Some(CleaningStage::TypeLocalPresent));
    assert_eq!(outcome.stages.len(), 1);
    Ok(())
}

#[test]
fn zero_surfaces_empty_the_table_before_prices_are_derived() -> PolarsResult<()> {
    let df = frame(&[Some("Maison"), Some("Appartement")], &[0.0, -5.0])?;

    let outcome = clean(df, &CleaningOptions::default()).expect("clean");

    assert_eq!(outcome.emptied_at, Some(CleaningStage::PositiveSurface));
    let ran: Vec<CleaningStage> = outcome.stages.iter().map(|count| count.stage).collect();
    assert_eq!(ran, CleaningStage::SEQUENCE[..4].to_vec());
    assert!(outcome.frame.column("price_per_sqm").is_err());
    Ok(())
}

#[test]
fn price_cutoff_is_inclusive() -> PolarsResult<()> {
    // 120000 / 40 = 3000 and 120000 / 30 = 4000
    let df = frame(&[Some("Maison"), Some("Maison")], &[40.0, 30.0])?;

    let outcome = clean(
        df,
        &CleaningOptions {
            max_price_per_sqm: 3000.0,
        },
    )
    .expect("clean");

    assert_eq!(outcome.frame.height(), 1);
    let prices = outcome.frame.column("price_per_sqm")?.f64()?;
    assert_eq!(prices.get(0), Some(3000.0));
    assert_eq!(outcome.emptied_at, None);
    Ok(())
}

#[test]
fn missing_columns_abort_before_any_stage() -> PolarsResult<()> {
    let df = frame(&[Some("Maison")], &[40.0])?
        .drop("latitude")?
        .drop("longitude")?;

    assert_eq!(missing_columns(&df), vec!["latitude", "longitude"]);
    match clean(df, &CleaningOptions::default()) {
        Err(LoadError::MissingColumns(columns)) => {
            assert_eq!(columns, vec!["latitude", "longitude"])
        }
        other => panic!("expected missing columns, got {other:?}"),
    }
    Ok(())
}

#[test]
fn non_finite_prices_are_removed() -> PolarsResult<()> {
    let df = df!(
        "date_mutation" => &["2023-05-02"; 3],
        "type_local" => &["Maison"; 3],
        "valeur_fonciere" => &["-inf", "NaN", "150000"],
        "surface_reelle_bati" => &[10.0, 10.0, 50.0],
        "nombre_pieces_principales" => &[3i64; 3],
        "latitude" => &[43.6; 3],
        "longitude" => &[3.9; 3],
    )?;

    let outcome = clean(df, &CleaningOptions::default()).expect("clean");

    let rows_after = |stage: CleaningStage| {
        outcome
            .stages
            .iter()
            .find(|count| count.stage == stage)
            .map(|count| count.rows)
    };
    // -inf passes the upper cutoff and must be dropped by the finite check.
    assert!(rows_after(CleaningStage::PriceCutoff) >= Some(2));
    assert_eq!(rows_after(CleaningStage::FinitePrice), Some(1));

    let prices = outcome.frame.column("price_per_sqm")?.f64()?;
    assert_eq!(prices.len(), 1);
    assert_eq!(prices.get(0), Some(3000.0));
    Ok(())
}
