use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

use crate::cleaning::{
    DATE_MUTATION, LATITUDE, LONGITUDE, NOMBRE_PIECES_PRINCIPALES, PRICE_PER_SQM,
    SURFACE_REELLE_BATI, TYPE_LOCAL, VALEUR_FONCIERE,
};
use crate::ingestion::SOURCE_DEPARTMENT_COLUMN;

/// Days between 0001-01-01 and 1970-01-01, for Polars `Date` (days since the Unix epoch).
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One cleaned transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyRecord {
    pub id_mutation: Option<String>,
    pub date_mutation: NaiveDate,
    pub nature_mutation: Option<String>,
    pub type_local: String,
    pub valeur_fonciere: f64,
    pub surface_reelle_bati: f64,
    pub nombre_pieces_principales: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub nom_commune: Option<String>,
    pub code_commune: Option<String>,
    pub code_postal: Option<String>,
    pub code_departement: Option<String>,
    pub adresse_numero: Option<String>,
    pub adresse_nom_voie: Option<String>,
    pub source_department: Option<String>,
    pub price_per_sqm: f64,
}

impl PropertyRecord {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    pub fn year_month(&self) -> (i32, u32) {
        (self.date_mutation.year(), self.date_mutation.month())
    }

    /// `code_departement` when present, otherwise the filename tag.
    pub fn department(&self) -> Option<&str> {
        self.code_departement
            .as_deref()
            .or(self.source_department.as_deref())
    }
}

/// Immutable cleaned table shared with every view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyTable {
    records: Vec<PropertyRecord>,
}

impl PropertyTable {
    pub fn new(records: Vec<PropertyRecord>) -> Self {
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[PropertyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PropertyRecord> {
        self.records.iter()
    }

    /// New table holding the records matching `predicate`.
    pub fn filtered<F>(&self, mut predicate: F) -> PropertyTable
    where
        F: FnMut(&PropertyRecord) -> bool,
    {
        PropertyTable::new(
            self.records
                .iter()
                .filter(|record| predicate(record))
                .cloned()
                .collect(),
        )
    }

    /// Builds typed records from a frame that went through every cleaning stage.
    ///
    /// Rows that still lack a required value are dropped; optional text columns absent
    /// from the frame come back as `None`.
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Self> {
        let len = df.height();
        if len == 0 {
            return Ok(Self::empty());
        }

        let dates = df.column(DATE_MUTATION)?.cast(&DataType::Int32)?;
        let dates = dates.i32()?;
        let prices = df.column(VALEUR_FONCIERE)?.f64()?;
        let surfaces = df.column(SURFACE_REELLE_BATI)?.f64()?;
        let per_sqm = df.column(PRICE_PER_SQM)?.f64()?;
        let types = df.column(TYPE_LOCAL)?.str()?;
        let rooms = df.column(NOMBRE_PIECES_PRINCIPALES)?.i64()?;
        let latitudes = df.column(LATITUDE)?.f64()?;
        let longitudes = df.column(LONGITUDE)?.f64()?;

        let id_mutation = text_column(df, "id_mutation")?;
        let nature_mutation = text_column(df, "nature_mutation")?;
        let nom_commune = text_column(df, "nom_commune")?;
        let code_commune = text_column(df, "code_commune")?;
        let code_postal = text_column(df, "code_postal")?;
        let code_departement = text_column(df, "code_departement")?;
        let adresse_numero = text_column(df, "adresse_numero")?;
        let adresse_nom_voie = text_column(df, "adresse_nom_voie")?;
        let source_department = text_column(df, SOURCE_DEPARTMENT_COLUMN)?;

        let mut records = Vec::with_capacity(len);
        for idx in 0..len {
            let (Some(days), Some(type_local), Some(price), Some(surface), Some(ppsqm)) = (
                dates.get(idx),
                types.get(idx),
                prices.get(idx),
                surfaces.get(idx),
                per_sqm.get(idx),
            ) else {
                continue;
            };
            let Some(date_mutation) =
                NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
            else {
                continue;
            };

            records.push(PropertyRecord {
                id_mutation: text_at(&id_mutation, idx),
                date_mutation,
                nature_mutation: text_at(&nature_mutation, idx),
                type_local: type_local.to_string(),
                valeur_fonciere: price,
                surface_reelle_bati: surface,
                nombre_pieces_principales: rooms.get(idx),
                latitude: latitudes.get(idx),
                longitude: longitudes.get(idx),
                nom_commune: text_at(&nom_commune, idx),
                code_commune: text_at(&code_commune, idx),
                code_postal: text_at(&code_postal, idx),
                code_departement: text_at(&code_departement, idx),
                adresse_numero: text_at(&adresse_numero, idx),
                adresse_nom_voie: text_at(&adresse_nom_voie, idx),
                source_department: text_at(&source_department, idx),
                price_per_sqm: ppsqm,
            });
        }

        Ok(Self::new(records))
    }
}

impl<'a> IntoIterator for &'a PropertyTable {
    type Item = &'a PropertyRecord;
    type IntoIter = std::slice::Iter<'a, PropertyRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Reads an optional column as text. Codes stored as floats (`34000.0`) come back as `34000`.
fn text_column(df: &DataFrame, name: &str) -> PolarsResult<Option<StringChunked>> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let as_text = match column.dtype() {
        DataType::Float32 | DataType::Float64 => column
            .cast(&DataType::Int64)?
            .cast(&DataType::String)?,
        _ => column.cast(&DataType::String)?,
    };
    Ok(Some(as_text.str()?.clone()))
}

fn text_at(column: &Option<StringChunked>, idx: usize) -> Option<String> {
    column
        .as_ref()
        .and_then(|values| values.get(idx))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
