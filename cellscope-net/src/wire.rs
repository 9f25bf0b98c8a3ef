use cellscope_base::{err_kind, Error, ErrorKind, Result};
use cellscope_lang::Column;
use serde_json::{Map, Value};

// The shapes a column body can take on the wire. Decided once, when the body
// arrives; nothing downstream looks at JSON shapes again.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    // A plain array, one entry per row.
    Dense(Vec<Value>),
    // `{index: [...], value: [...]}`: rows not listed are zero.
    Sparse { index: Vec<i64>, value: Vec<f64> },
    // `{categories: [...], codes: [...]}`: code -1 is a missing value.
    Dict { categories: Vec<Value>, codes: Vec<i64> },
    // Anything else, kept as-is (eg. `{x: [...], y: [...]}` coordinates).
    Object(Map<String, Value>),
}

fn decode_err(e: serde_json::Error) -> Error {
    Error::new(ErrorKind::Decode, e)
}

fn take_field<T: serde::de::DeserializeOwned>(map: &mut Map<String, Value>, name: &str) -> Result<T> {
    let v = map
        .remove(name)
        .ok_or_else(|| err_kind(ErrorKind::Decode, format!("payload has no '{}' field", name)))?;
    serde_json::from_value(v).map_err(decode_err)
}

impl Payload {
    pub fn from_slice(bytes: &[u8]) -> Result<Payload> {
        let v: Value = serde_json::from_slice(bytes).map_err(decode_err)?;
        Payload::classify(v)
    }

    pub fn classify(v: Value) -> Result<Payload> {
        match v {
            Value::Array(items) => Ok(Payload::Dense(items)),
            Value::Object(mut map) if map.contains_key("index") => {
                let index = take_field(&mut map, "index")?;
                let value = take_field(&mut map, "value")?;
                Ok(Payload::Sparse { index, value })
            }
            Value::Object(mut map) if map.contains_key("categories") && map.contains_key("codes") => {
                let categories = take_field(&mut map, "categories")?;
                let codes = take_field(&mut map, "codes")?;
                Ok(Payload::Dict { categories, codes })
            }
            Value::Object(map) => Ok(Payload::Object(map)),
            other => Err(err_kind(
                ErrorKind::Decode,
                format!("column payload is neither array nor object: {}", other),
            )),
        }
    }

    // Row-aligned payloads must have exactly `rows` entries.
    pub fn into_column(self, rows: usize) -> Result<Column> {
        match self {
            Payload::Dense(items) => {
                check_rows("dense", items.len(), rows)?;
                Ok(dense_column(items))
            }
            Payload::Sparse { index, value } => sparse_column(&index, &value, rows),
            Payload::Dict { categories, codes } => {
                check_rows("dictionary", codes.len(), rows)?;
                if let Some(bad) = codes
                    .iter()
                    .find(|c| **c < -1 || **c >= categories.len() as i64)
                {
                    return Err(err_kind(
                        ErrorKind::Decode,
                        format!("dictionary code {} outside {} categories", bad, categories.len()),
                    ));
                }
                Ok(Column::Categories { categories, codes })
            }
            Payload::Object(map) => Ok(Column::Object(map)),
        }
    }
}

fn check_rows(what: &str, len: usize, rows: usize) -> Result<()> {
    if len != rows {
        return Err(err_kind(
            ErrorKind::Decode,
            format!("{} column has {} rows, dataset has {}", what, len, rows),
        ));
    }
    Ok(())
}

fn sparse_column(index: &[i64], value: &[f64], rows: usize) -> Result<Column> {
    if index.len() != value.len() {
        return Err(err_kind(
            ErrorKind::Decode,
            format!("sparse column has {} indices but {} values", index.len(), value.len()),
        ));
    }
    let mut dense = vec![0.0; rows];
    for (i, v) in index.iter().zip(value.iter()) {
        match usize::try_from(*i).ok().filter(|i| *i < rows) {
            Some(i) => dense[i] = *v,
            None => {
                return Err(err_kind(
                    ErrorKind::Decode,
                    format!("sparse index {} outside 0..{}", i, rows),
                ))
            }
        }
    }
    Ok(Column::Numbers(dense))
}

fn numeric_tuple(v: &Value) -> Option<Vec<f64>> {
    v.as_array()?.iter().map(Value::as_f64).collect()
}

fn dense_column(items: Vec<Value>) -> Column {
    if items.iter().all(|v| v.is_number() || v.is_null()) {
        let nums = items
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect();
        return Column::Numbers(nums);
    }
    if items.iter().all(Value::is_string) {
        let strs = items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();
        return Column::Strings(strs);
    }
    let tuples: Option<Vec<Vec<f64>>> = items.iter().map(numeric_tuple).collect();
    match tuples {
        Some(points) => Column::Points(points),
        None => Column::Values(items),
    }
}
