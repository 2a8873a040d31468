use polars::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{LoadError, Result};

pub const VALEUR_FONCIERE: &str = "valeur_fonciere";
pub const SURFACE_REELLE_BATI: &str = "surface_reelle_bati";
pub const TYPE_LOCAL: &str = "type_local";
pub const DATE_MUTATION: &str = "date_mutation";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";
pub const NOMBRE_PIECES_PRINCIPALES: &str = "nombre_pieces_principales";
pub const PRICE_PER_SQM: &str = "price_per_sqm";

pub const REQUIRED_COLUMNS: [&str; 7] = [
    VALEUR_FONCIERE,
    SURFACE_REELLE_BATI,
    TYPE_LOCAL,
    DATE_MUTATION,
    LATITUDE,
    LONGITUDE,
    NOMBRE_PIECES_PRINCIPALES,
];

pub const DEFAULT_MAX_PRICE_PER_SQM: f64 = 9000.0;
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct CleaningOptions {
    /// Rows priced above this per square metre are treated as outliers.
    pub max_price_per_sqm: f64,
}

impl Default for CleaningOptions {
    fn default() -> Self {
        Self {
            max_price_per_sqm: DEFAULT_MAX_PRICE_PER_SQM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    TypeLocalPresent,
    Cast,
    CriticalFieldsPresent,
    PositiveSurface,
    PricePerSqm,
    PriceCutoff,
    FinitePrice,
}

impl CleaningStage {
    pub const SEQUENCE: [CleaningStage; 7] = [
        CleaningStage::TypeLocalPresent,
        CleaningStage::Cast,
        CleaningStage::CriticalFieldsPresent,
        CleaningStage::PositiveSurface,
        CleaningStage::PricePerSqm,
        CleaningStage::PriceCutoff,
        CleaningStage::FinitePrice,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningStage::TypeLocalPresent => "type_local_present",
            CleaningStage::Cast => "cast",
            CleaningStage::CriticalFieldsPresent => "critical_fields_present",
            CleaningStage::PositiveSurface => "positive_surface",
            CleaningStage::PricePerSqm => "price_per_sqm",
            CleaningStage::PriceCutoff => "price_cutoff",
            CleaningStage::FinitePrice => "finite_price",
        }
    }

    fn apply(self, df: DataFrame, options: &CleaningOptions) -> PolarsResult<DataFrame> {
        let lf = df.lazy();
        let lf = match self {
            CleaningStage::TypeLocalPresent => lf.filter(col(TYPE_LOCAL).is_not_null()),
            CleaningStage::Cast => lf.with_columns(cast_expressions()),
            CleaningStage::CriticalFieldsPresent => lf.filter(
                col(DATE_MUTATION)
                    .is_not_null()
                    .and(col(VALEUR_FONCIERE).is_not_null())
                    .and(col(SURFACE_REELLE_BATI).is_not_null()),
            ),
            CleaningStage::PositiveSurface => lf.filter(col(SURFACE_REELLE_BATI).gt(lit(0.0))),
            CleaningStage::PricePerSqm => lf.with_column(
                (col(VALEUR_FONCIERE) / col(SURFACE_REELLE_BATI)).alias(PRICE_PER_SQM),
            ),
            CleaningStage::PriceCutoff => {
                lf.filter(col(PRICE_PER_SQM).lt_eq(lit(options.max_price_per_sqm)))
            }
            CleaningStage::FinitePrice => lf.filter(
                col(PRICE_PER_SQM)
                    .is_not_null()
                    .and(col(PRICE_PER_SQM).is_finite()),
            ),
        };
        lf.collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCount {
    pub stage: CleaningStage,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub frame: DataFrame,
    pub stages: Vec<StageCount>,
    /// Stage that emptied the table, when one did.
    pub emptied_at: Option<CleaningStage>,
}

pub fn missing_columns(df: &DataFrame) -> Vec<String> {
    let present = df.get_column_names();
    REQUIRED_COLUMNS
        .iter()
        .filter(|required| !present.iter().any(|name| name.as_str() == **required))
        .map(|name| name.to_string())
        .collect()
}

/// Runs the cleaning stages in order over the concatenated table.
///
/// A stage that leaves zero rows ends the run; the empty frame is returned as a success.
pub fn clean(df: DataFrame, options: &CleaningOptions) -> Result<CleaningOutcome> {
    let missing = missing_columns(&df);
    if !missing.is_empty() {
        error!(missing = ?missing, "missing critical columns, aborting processing");
        return Err(LoadError::MissingColumns(missing));
    }

    info!(rows = df.height(), "starting data cleaning");

    let mut frame = df;
    let mut stages = Vec::with_capacity(CleaningStage::SEQUENCE.len());
    let mut emptied_at = None;

    for stage in CleaningStage::SEQUENCE {
        frame = stage.apply(frame, options)?;
        let rows = frame.height();
        info!(stage = stage.as_str(), rows, "cleaning stage complete");
        stages.push(StageCount { stage, rows });

        if rows == 0 {
            warn!(stage = stage.as_str(), "data empty after cleaning stage");
            emptied_at = Some(stage);
            break;
        }
    }

    Ok(CleaningOutcome {
        frame,
        stages,
        emptied_at,
    })
}

fn cast_expressions() -> Vec<Expr> {
    vec![
        col(DATE_MUTATION)
            .cast(DataType::String)
            .str()
            .to_date(StrptimeOptions {
                format: Some(DATE_FORMAT.into()),
                strict: false,
                exact: true,
                cache: true,
            }),
        grouped_number(VALEUR_FONCIERE),
        grouped_number(SURFACE_REELLE_BATI),
        col(NOMBRE_PIECES_PRINCIPALES)
            .cast(DataType::Float64)
            .cast(DataType::Int64),
        col(LATITUDE).cast(DataType::Float64),
        col(LONGITUDE).cast(DataType::Float64),
        col(TYPE_LOCAL).cast(DataType::String),
    ]
}

/// `"1,250,000"` -> `1250000.0`; anything unparseable becomes null.
fn grouped_number(name: &str) -> Expr {
    col(name)
        .cast(DataType::String)
        .str()
        .replace_all(lit(","), lit(""), true)
        .cast(DataType::Float64)
}
