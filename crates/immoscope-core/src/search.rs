use tracing::{info, warn};

use crate::geo::{centroid, haversine_km};
use crate::record::{PropertyRecord, PropertyTable};

/// Postal-code search, optionally widened to a radius around the postal code's centroid.
///
/// Bounds set to 0 are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub postal_code: String,
    pub radius_km: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub min_surface: f64,
    pub max_surface: f64,
}

impl SearchQuery {
    pub fn postal_code(code: impl Into<String>) -> Self {
        Self {
            postal_code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_radius_km(mut self, radius_km: f64) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_price_range(mut self, min: f64, max: f64) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_surface_range(mut self, min: f64, max: f64) -> Self {
        self.min_surface = min;
        self.max_surface = max;
        self
    }

    fn accepts_bounds(&self, record: &PropertyRecord) -> bool {
        within(record.valeur_fonciere, self.min_price, self.max_price)
            && within(record.surface_reelle_bati, self.min_surface, self.max_surface)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    /// Centroid of the postal-code matches.
    pub center: Option<(f64, f64)>,
    pub matches: Vec<PropertyRecord>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Linear scan over every located record; there is no spatial index.
pub fn search(table: &PropertyTable, query: &SearchQuery) -> SearchResult {
    let postal_code = query.postal_code.trim();
    if postal_code.is_empty() {
        warn!("search requested without a postal code");
        return SearchResult::default();
    }

    let candidates: Vec<(&PropertyRecord, (f64, f64))> = table
        .iter()
        .filter(|record| record.code_postal.is_some())
        .filter_map(|record| record.coordinates().map(|point| (record, point)))
        .collect();

    let postal_matches: Vec<&(&PropertyRecord, (f64, f64))> = candidates
        .iter()
        .filter(|(record, _)| record.code_postal.as_deref() == Some(postal_code))
        .collect();

    if postal_matches.is_empty() {
        info!(postal_code, "no properties found for postal code");
        return SearchResult::default();
    }

    let center = centroid(postal_matches.iter().map(|(_, point)| *point));

    let selected: Vec<&PropertyRecord> = match center {
        Some((center_lat, center_lon)) if query.radius_km > 0.0 => candidates
            .iter()
            .filter(|(_, (lat, lon))| {
                haversine_km(center_lat, center_lon, *lat, *lon) <= query.radius_km
            })
            .map(|(record, _)| *record)
            .collect(),
        _ => postal_matches.iter().map(|(record, _)| *record).collect(),
    };

    let matches: Vec<PropertyRecord> = selected
        .into_iter()
        .filter(|record| query.accepts_bounds(record))
        .cloned()
        .collect();

    info!(
        postal_code,
        radius_km = query.radius_km,
        matches = matches.len(),
        "property search complete"
    );

    SearchResult { center, matches }
}

fn within(value: f64, min: f64, max: f64) -> bool {
    (min <= 0.0 || value >= min) && (max <= 0.0 || value <= max)
}
