//! Sale counts merged into commune boundary GeoJSON for choropleth maps.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use geojson::{FeatureCollection, GeoJson};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::record::PropertyTable;

pub const CODE_PROPERTY: &str = "code";
pub const PROPERTIES_SOLD: &str = "properties_sold";
const CODE_COMMUNE_COLUMN: &str = "code_commune";

#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not valid GeoJSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },
    #[error("{} must contain a GeoJSON FeatureCollection", path.display())]
    NotFeatureCollection { path: PathBuf },
    #[error("sales CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("sales CSV {} has no 'code_commune' column", path.display())]
    MissingCodeColumn { path: PathBuf },
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnnotationSummary {
    pub features: usize,
    pub matched: usize,
    pub properties_sold: u64,
}

/// Sales per commune code from a cleaned table.
pub fn sales_by_commune(table: &PropertyTable) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for record in table {
        if let Some(code) = record.code_commune.as_deref() {
            *counts.entry(code.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Sales per commune code from a raw sales CSV, one row per sale.
pub fn sales_by_commune_csv(path: &Path) -> Result<HashMap<String, u64>, GeoJsonError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let code_idx = reader
        .headers()?
        .iter()
        .position(|name| name.trim() == CODE_COMMUNE_COLUMN)
        .ok_or_else(|| GeoJsonError::MissingCodeColumn {
            path: path.to_path_buf(),
        })?;

    let mut counts = HashMap::new();
    for record in reader.records() {
        let record = record?;
        if let Some(code) = record.get(code_idx).and_then(normalize_code) {
            *counts.entry(code).or_insert(0) += 1;
        }
    }

    info!(path = %path.display(), communes = counts.len(), "counted sales per commune");
    Ok(counts)
}

/// Sets `properties_sold` on every feature; features without a matching `code` get 0.
pub fn annotate_properties_sold(
    collection: &mut FeatureCollection,
    counts: &HashMap<String, u64>,
) -> AnnotationSummary {
    let mut summary = AnnotationSummary {
        features: collection.features.len(),
        ..Default::default()
    };

    for feature in &mut collection.features {
        let properties = feature.properties.get_or_insert_with(Default::default);
        let sold = properties
            .get(CODE_PROPERTY)
            .and_then(code_from_value)
            .and_then(|code| counts.get(&code).copied())
            .unwrap_or(0);
        if sold > 0 {
            summary.matched += 1;
            summary.properties_sold += sold;
        }
        properties.insert(PROPERTIES_SOLD.to_string(), json!(sold));
    }

    if summary.matched == 0 && !counts.is_empty() {
        warn!("no boundary feature matched any commune code");
    }
    summary
}

pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection, GeoJsonError> {
    let text = fs::read_to_string(path).map_err(|source| GeoJsonError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match text.parse::<GeoJson>() {
        Ok(GeoJson::FeatureCollection(collection)) => Ok(collection),
        Ok(_) => Err(GeoJsonError::NotFeatureCollection {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(GeoJsonError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        }),
    }
}

/// Pretty-printed with four-space indentation; the parent directory is created if needed.
pub fn write_feature_collection(
    path: &Path,
    collection: &FeatureCollection,
) -> Result<(), GeoJsonError> {
    let io_err = |source| GeoJsonError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    collection.serialize(&mut serializer)?;
    fs::write(path, buffer).map_err(io_err)?;

    info!(path = %path.display(), features = collection.features.len(), "wrote GeoJSON");
    Ok(())
}

fn code_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => normalize_code(text),
        Value::Number(number) => normalize_code(&number.to_string()),
        _ => None,
    }
}

/// Trims, drops empty/NaN markers, and turns `34172.0` into `34172`.
fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    if code.is_empty() || code.eq_ignore_ascii_case("nan") {
        return None;
    }
    let code = match code.strip_suffix(".0") {
        Some(integer) if integer.chars().all(|c| c.is_ascii_digit()) => integer,
        _ => code,
    };
    Some(code.to_string())
}
