use std::collections::BTreeSet;

use serde::Serialize;

use crate::record::PropertyTable;
use crate::stats::mean;

/// Department and property-type selection. An empty list selects everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionFilter {
    pub departments: Vec<String>,
    pub property_types: Vec<String>,
}

impl SelectionFilter {
    pub fn is_unrestricted(&self) -> bool {
        self.departments.is_empty() && self.property_types.is_empty()
    }

    pub fn apply(&self, table: &PropertyTable) -> PropertyTable {
        if self.is_unrestricted() {
            return table.clone();
        }
        table.filtered(|record| {
            let department_ok = self.departments.is_empty()
                || record
                    .department()
                    .is_some_and(|department| self.departments.iter().any(|d| d == department));
            let type_ok = self.property_types.is_empty()
                || self.property_types.iter().any(|t| *t == record.type_local);
            department_ok && type_ok
        })
    }
}

pub fn available_departments(table: &PropertyTable) -> Vec<String> {
    table
        .iter()
        .filter_map(|record| record.department())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn available_property_types(table: &PropertyTable) -> Vec<String> {
    table
        .iter()
        .map(|record| record.type_local.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketSummary {
    pub transaction_count: usize,
    pub avg_price: Option<f64>,
    pub avg_price_per_sqm: Option<f64>,
}

pub fn market_summary(table: &PropertyTable) -> MarketSummary {
    let prices: Vec<f64> = table.iter().map(|record| record.valeur_fonciere).collect();
    let per_sqm: Vec<f64> = table.iter().map(|record| record.price_per_sqm).collect();
    MarketSummary {
        transaction_count: table.len(),
        avg_price: mean(&prices),
        avg_price_per_sqm: mean(&per_sqm),
    }
}
