use serde::Serialize;
use serde_json::{Map, Value};

/// One row keyed by column name, in field order.
pub type Row = Map<String, Value>;

/// Row-oriented form of any view, as consumed by chart and table renderers.
pub fn to_rows<T: Serialize>(items: &[T]) -> Result<Vec<Row>, serde_json::Error> {
    items
        .iter()
        .map(|item| match serde_json::to_value(item)? {
            Value::Object(map) => Ok(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Ok(map)
            }
        })
        .collect()
}

/// Column names in first-seen order across all rows.
pub fn column_names(rows: &[Row]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !names.iter().any(|name| name == key) {
                names.push(key.clone());
            }
        }
    }
    names
}

/// Display form of a cell: empty for null, bare text for strings, two decimals for floats.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) if number.is_f64() => number
            .as_f64()
            .map(|float| format!("{float:.2}"))
            .unwrap_or_default(),
        other => other.to_string(),
    }
}
