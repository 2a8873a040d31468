//! Read-only aggregations over a cleaned [`PropertyTable`].
//!
//! Every view takes the table explicitly and returns new rows; none touch shared state.
//! Grouped output is ordered by group key unless a view states another order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::error;

use crate::config::ViewsConfig;
use crate::record::{PropertyRecord, PropertyTable};
use crate::stats::{mean, median, round1};
use crate::tabular::{to_rows, Row};

type CommuneKey = (Option<String>, Option<String>);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunePriceStats {
    pub nom_commune: Option<String>,
    pub code_postal: Option<String>,
    pub avg_price_per_sqm: f64,
    pub median_price_per_sqm: f64,
    pub transaction_count: usize,
    pub avg_total_price: f64,
    pub median_total_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyTypeStats {
    pub type_local: String,
    pub count: usize,
    pub avg_surface: f64,
    pub avg_price_per_sqm: f64,
    pub median_price: f64,
    pub avg_rooms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypePricePoint {
    pub type_local: String,
    pub median_price_per_sqm: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketTrend {
    pub year: i32,
    pub month: u32,
    pub transaction_count: usize,
    pub avg_price_per_sqm: f64,
    pub median_price_per_sqm: f64,
    pub avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuneActivity {
    pub nom_commune: Option<String>,
    pub code_postal: Option<String>,
    pub transaction_count: usize,
    pub unique_streets: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyFeatures {
    pub type_local: String,
    pub avg_rooms: f64,
    pub median_rooms: f64,
    pub avg_surface: f64,
    pub median_surface: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoListing {
    pub id_mutation: Option<String>,
    pub type_local: String,
    pub valeur_fonciere: f64,
    pub surface_reelle_bati: f64,
    pub nombre_pieces_principales: Option<i64>,
    pub nom_commune: Option<String>,
    pub code_postal: Option<String>,
    pub adresse_nom_voie: Option<String>,
    pub adresse_numero: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub price_per_sqm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunePricePoint {
    pub code_commune: String,
    pub nom_commune: Option<String>,
    pub median_price_per_sqm: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTypeVolume {
    pub year: i32,
    pub month: u32,
    pub type_local: String,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTypePrice {
    pub year: i32,
    pub month: u32,
    pub type_local: String,
    pub median_price_per_sqm: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommuneTopType {
    pub nom_commune: String,
    pub rank: usize,
    pub type_local: String,
    pub transaction_count: usize,
}

/// Price statistics per (commune, postal code), restricted to `sale_nature` mutations.
pub fn commune_price_stats(table: &PropertyTable, sale_nature: &str) -> Vec<CommunePriceStats> {
    let mut groups: BTreeMap<CommuneKey, Vec<&PropertyRecord>> = BTreeMap::new();
    for record in table
        .iter()
        .filter(|record| record.nature_mutation.as_deref() == Some(sale_nature))
    {
        groups
            .entry((record.nom_commune.clone(), record.code_postal.clone()))
            .or_default()
            .push(record);
    }

    groups
        .into_iter()
        .map(|((nom_commune, code_postal), records)| {
            let per_sqm = collect(&records, |record| record.price_per_sqm);
            let totals = collect(&records, |record| record.valeur_fonciere);
            CommunePriceStats {
                nom_commune,
                code_postal,
                avg_price_per_sqm: mean(&per_sqm).unwrap_or_default(),
                median_price_per_sqm: median(&per_sqm).unwrap_or_default(),
                transaction_count: records.len(),
                avg_total_price: mean(&totals).unwrap_or_default(),
                median_total_price: median(&totals).unwrap_or_default(),
            }
        })
        .collect()
}

pub fn property_type_stats(table: &PropertyTable) -> Vec<PropertyTypeStats> {
    group_by_type(table)
        .into_iter()
        .map(|(type_local, records)| {
            let surfaces = collect(&records, |record| record.surface_reelle_bati);
            let per_sqm = collect(&records, |record| record.price_per_sqm);
            let totals = collect(&records, |record| record.valeur_fonciere);
            PropertyTypeStats {
                type_local,
                count: records.len(),
                avg_surface: mean(&surfaces).unwrap_or_default(),
                avg_price_per_sqm: mean(&per_sqm).unwrap_or_default(),
                median_price: median(&totals).unwrap_or_default(),
                avg_rooms: mean(&known_rooms(&records)),
            }
        })
        .collect()
}

/// Median price per square metre of each property type, most traded first.
pub fn type_price_medians(table: &PropertyTable) -> Vec<TypePricePoint> {
    let mut rows: Vec<TypePricePoint> = group_by_type(table)
        .into_iter()
        .map(|(type_local, records)| TypePricePoint {
            type_local,
            median_price_per_sqm: median(&collect(&records, |record| record.price_per_sqm))
                .unwrap_or_default(),
            transaction_count: records.len(),
        })
        .collect();
    rows.sort_by(|a, b| b.transaction_count.cmp(&a.transaction_count));
    rows
}

/// Monthly activity, oldest month first.
pub fn market_trends(table: &PropertyTable) -> Vec<MarketTrend> {
    let mut groups: BTreeMap<(i32, u32), Vec<&PropertyRecord>> = BTreeMap::new();
    for record in table {
        groups.entry(record.year_month()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|((year, month), records)| {
            let per_sqm = collect(&records, |record| record.price_per_sqm);
            let totals = collect(&records, |record| record.valeur_fonciere);
            MarketTrend {
                year,
                month,
                transaction_count: records.len(),
                avg_price_per_sqm: mean(&per_sqm).unwrap_or_default(),
                median_price_per_sqm: median(&per_sqm).unwrap_or_default(),
                avg_price: mean(&totals).unwrap_or_default(),
            }
        })
        .collect()
}

/// Transaction volume and street diversity per commune, busiest first.
pub fn commune_activity(table: &PropertyTable) -> Vec<CommuneActivity> {
    let mut groups: BTreeMap<CommuneKey, (usize, BTreeSet<&str>)> = BTreeMap::new();
    for record in table {
        let entry = groups
            .entry((record.nom_commune.clone(), record.code_postal.clone()))
            .or_default();
        entry.0 += 1;
        if let Some(street) = record.adresse_nom_voie.as_deref() {
            entry.1.insert(street);
        }
    }

    let mut rows: Vec<CommuneActivity> = groups
        .into_iter()
        .map(|((nom_commune, code_postal), (count, streets))| CommuneActivity {
            nom_commune,
            code_postal,
            transaction_count: count,
            unique_streets: streets.len(),
        })
        .collect();
    rows.sort_by(|a, b| b.transaction_count.cmp(&a.transaction_count));
    rows
}

/// Room and surface profile per property type, most traded first. Missing statistics read as 0.
pub fn property_features(table: &PropertyTable) -> Vec<PropertyFeatures> {
    let mut rows: Vec<PropertyFeatures> = group_by_type(table)
        .into_iter()
        .map(|(type_local, records)| {
            let rooms = known_rooms(&records);
            let surfaces = collect(&records, |record| record.surface_reelle_bati);
            PropertyFeatures {
                type_local,
                avg_rooms: round1(mean(&rooms).unwrap_or(0.0)),
                median_rooms: median(&rooms).unwrap_or(0.0),
                avg_surface: round1(mean(&surfaces).unwrap_or(0.0)),
                median_surface: median(&surfaces).unwrap_or(0.0),
                transaction_count: records.len(),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.transaction_count.cmp(&a.transaction_count));
    rows
}

/// Every located property, in table order.
pub fn geo_listing(table: &PropertyTable) -> Vec<GeoListing> {
    table
        .iter()
        .filter_map(|record| {
            let (latitude, longitude) = record.coordinates()?;
            Some(GeoListing {
                id_mutation: record.id_mutation.clone(),
                type_local: record.type_local.clone(),
                valeur_fonciere: record.valeur_fonciere,
                surface_reelle_bati: record.surface_reelle_bati,
                nombre_pieces_principales: record.nombre_pieces_principales,
                nom_commune: record.nom_commune.clone(),
                code_postal: record.code_postal.clone(),
                adresse_nom_voie: record.adresse_nom_voie.clone(),
                adresse_numero: record.adresse_numero.clone(),
                latitude,
                longitude,
                price_per_sqm: record.price_per_sqm,
            })
        })
        .collect()
}

/// Median price per commune code for choropleth maps, keeping communes with at least
/// `min_transactions` located sales.
pub fn commune_choropleth(table: &PropertyTable, min_transactions: usize) -> Vec<CommunePricePoint> {
    let mut groups: BTreeMap<&str, Vec<&PropertyRecord>> = BTreeMap::new();
    for record in table {
        let Some(code) = record.code_commune.as_deref() else {
            continue;
        };
        if record.coordinates().is_none() {
            continue;
        }
        groups.entry(code).or_default().push(record);
    }

    groups
        .into_iter()
        .filter(|(_, records)| records.len() >= min_transactions)
        .map(|(code, records)| {
            let per_sqm = collect(&records, |record| record.price_per_sqm);
            CommunePricePoint {
                code_commune: code.to_string(),
                nom_commune: records
                    .iter()
                    .find_map(|record| record.nom_commune.clone()),
                median_price_per_sqm: median(&per_sqm).unwrap_or_default(),
                transaction_count: records.len(),
            }
        })
        .collect()
}

pub fn monthly_type_volume(table: &PropertyTable) -> Vec<MonthlyTypeVolume> {
    group_by_month_and_type(table)
        .into_iter()
        .map(|((year, month, type_local), records)| MonthlyTypeVolume {
            year,
            month,
            type_local,
            transaction_count: records.len(),
        })
        .collect()
}

pub fn monthly_type_prices(table: &PropertyTable) -> Vec<MonthlyTypePrice> {
    group_by_month_and_type(table)
        .into_iter()
        .map(|((year, month, type_local), records)| {
            let per_sqm = collect(&records, |record| record.price_per_sqm);
            MonthlyTypePrice {
                year,
                month,
                type_local,
                median_price_per_sqm: median(&per_sqm).unwrap_or_default(),
                transaction_count: records.len(),
            }
        })
        .collect()
}

/// The `limit` most traded property types of each named commune.
pub fn top_types_per_commune(table: &PropertyTable, limit: usize) -> Vec<CommuneTopType> {
    let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();
    for record in table {
        let Some(commune) = record.nom_commune.as_deref() else {
            continue;
        };
        *counts
            .entry(commune)
            .or_default()
            .entry(record.type_local.as_str())
            .or_default() += 1;
    }

    let mut rows = Vec::new();
    for (commune, by_type) in counts {
        let mut ranked: Vec<(&str, usize)> = by_type.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        for (rank, (type_local, count)) in ranked.into_iter().take(limit).enumerate() {
            rows.push(CommuneTopType {
                nom_commune: commune.to_string(),
                rank: rank + 1,
                type_local: type_local.to_string(),
                transaction_count: count,
            });
        }
    }
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    CommunePrices,
    PropertyTypes,
    TypePriceMedians,
    MarketTrends,
    Demographics,
    PropertyFeatures,
    GeoListing,
    CommuneChoropleth,
    MonthlyTypeVolume,
    MonthlyTypePrices,
    TopTypesPerCommune,
}

impl ViewKind {
    pub const ALL: [ViewKind; 11] = [
        ViewKind::CommunePrices,
        ViewKind::PropertyTypes,
        ViewKind::TypePriceMedians,
        ViewKind::MarketTrends,
        ViewKind::Demographics,
        ViewKind::PropertyFeatures,
        ViewKind::GeoListing,
        ViewKind::CommuneChoropleth,
        ViewKind::MonthlyTypeVolume,
        ViewKind::MonthlyTypePrices,
        ViewKind::TopTypesPerCommune,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::CommunePrices => "commune_prices",
            ViewKind::PropertyTypes => "property_types",
            ViewKind::TypePriceMedians => "type_price_medians",
            ViewKind::MarketTrends => "market_trends",
            ViewKind::Demographics => "demographics",
            ViewKind::PropertyFeatures => "property_features",
            ViewKind::GeoListing => "geo_listing",
            ViewKind::CommuneChoropleth => "commune_choropleth",
            ViewKind::MonthlyTypeVolume => "monthly_type_volume",
            ViewKind::MonthlyTypePrices => "monthly_type_prices",
            ViewKind::TopTypesPerCommune => "top_types_per_commune",
        }
    }

    /// Runs the view and converts it to rows. A failing view is logged and yields no rows.
    pub fn compute(&self, table: &PropertyTable, config: &ViewsConfig) -> Vec<Row> {
        let rows = match self {
            ViewKind::CommunePrices => to_rows(&commune_price_stats(table, &config.sale_nature)),
            ViewKind::PropertyTypes => to_rows(&property_type_stats(table)),
            ViewKind::TypePriceMedians => to_rows(&type_price_medians(table)),
            ViewKind::MarketTrends => to_rows(&market_trends(table)),
            ViewKind::Demographics => to_rows(&commune_activity(table)),
            ViewKind::PropertyFeatures => to_rows(&property_features(table)),
            ViewKind::GeoListing => to_rows(&geo_listing(table)),
            ViewKind::CommuneChoropleth => to_rows(&commune_choropleth(
                table,
                config.min_commune_transactions,
            )),
            ViewKind::MonthlyTypeVolume => to_rows(&monthly_type_volume(table)),
            ViewKind::MonthlyTypePrices => to_rows(&monthly_type_prices(table)),
            ViewKind::TopTypesPerCommune => {
                to_rows(&top_types_per_commune(table, config.top_types_per_commune))
            }
        };

        rows.unwrap_or_else(|err| {
            error!(view = self.as_str(), error = %err, "view computation failed");
            Vec::new()
        })
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().replace('-', "_");
        ViewKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown view '{value}'"))
    }
}

fn collect<F>(records: &[&PropertyRecord], field: F) -> Vec<f64>
where
    F: Fn(&PropertyRecord) -> f64,
{
    records.iter().map(|record| field(record)).collect()
}

fn known_rooms(records: &[&PropertyRecord]) -> Vec<f64> {
    records
        .iter()
        .filter_map(|record| record.nombre_pieces_principales)
        .map(|rooms| rooms as f64)
        .collect()
}

fn group_by_type(table: &PropertyTable) -> BTreeMap<String, Vec<&PropertyRecord>> {
    let mut groups: BTreeMap<String, Vec<&PropertyRecord>> = BTreeMap::new();
    for record in table {
        groups
            .entry(record.type_local.clone())
            .or_default()
            .push(record);
    }
    groups
}

fn group_by_month_and_type(
    table: &PropertyTable,
) -> BTreeMap<(i32, u32, String), Vec<&PropertyRecord>> {
    let mut groups: BTreeMap<(i32, u32, String), Vec<&PropertyRecord>> = BTreeMap::new();
    for record in table {
        let (year, month) = record.year_month();
        groups
            .entry((year, month, record.type_local.clone()))
            .or_default()
            .push(record);
    }
    groups
}
