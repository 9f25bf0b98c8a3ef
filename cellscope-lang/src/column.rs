use rapidhash::RapidHashMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::Arc;

// The synthetic all-ones column. It is never fetched; it is materialized
// on demand at the dataset's row count.
pub const COUNT_KEY: &str = "__count";

// The column holding each row's external identifier.
pub const INDEX_KEY: &str = "index";

pub type ColumnMap = RapidHashMap<String, Arc<Column>>;

// A column as it sits in the cache. Every wire representation (dense array,
// sparse index/value pairs, dictionary codes, arbitrary object) is decoded into
// exactly one of these when it arrives, and never changes afterwards.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    Numbers(Vec<f64>),
    Strings(Vec<String>),
    Categories { categories: Vec<Value>, codes: Vec<i64> },
    Points(Vec<Vec<f64>>),
    Values(Vec<Value>),
    Object(Map<String, Value>),
}

// A borrowed view of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Datum<'a> {
    Num(f64),
    Str(&'a str),
    Point(&'a [f64]),
    // A coordinate assembled from per-axis arrays, so not borrowable as a slice.
    Coord(Point),
    Json(&'a Value),
    Missing,
}

impl<'a> Datum<'a> {
    pub fn from_json(v: &'a Value) -> Datum<'a> {
        match v {
            Value::Null => Datum::Missing,
            Value::Number(n) => n.as_f64().map_or(Datum::Missing, Datum::Num),
            Value::String(s) => Datum::Str(s),
            other => Datum::Json(other),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Num(x) if !x.is_nan() => Some(*x),
            _ => None,
        }
    }

    // Equality against a literal from a filter. Numbers compare numerically,
    // so a category stored as 3 matches a literal 3.0.
    pub fn matches(&self, lit: &Value) -> bool {
        match (self, lit) {
            (Datum::Num(x), Value::Number(n)) => n.as_f64() == Some(*x),
            (Datum::Str(s), Value::String(t)) => *s == t.as_str(),
            (Datum::Missing, Value::Null) => true,
            (Datum::Json(v), lit) => *v == lit,
            (Datum::Point(p), Value::Array(items)) => {
                p.len() == items.len()
                    && p.iter().zip(items).all(|(a, b)| b.as_f64() == Some(*a))
            }
            (Datum::Coord(p), Value::Array(items)) => {
                let coords: Vec<f64> = p.coords().collect();
                coords.len() == items.len()
                    && coords.iter().zip(items).all(|(a, b)| b.as_f64() == Some(*a))
            }
            _ => false,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Datum::Num(x) => serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number),
            Datum::Str(s) => Value::String((*s).to_string()),
            Datum::Point(p) => Value::Array(
                p.iter()
                    .map(|x| serde_json::Number::from_f64(*x).map_or(Value::Null, Value::Number))
                    .collect(),
            ),
            Datum::Coord(p) => p.to_value(),
            Datum::Json(v) => (*v).clone(),
            Datum::Missing => Value::Null,
        }
    }

    // Label used when a datum becomes a category name in a summary.
    pub fn label(&self) -> String {
        match self {
            Datum::Num(x) => x.to_string(),
            Datum::Str(s) => (*s).to_string(),
            Datum::Missing => String::new(),
            other => other.to_value().to_string(),
        }
    }
}

// A 2D or 3D embedding coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Point {
    pub fn from_slice(s: &[f64]) -> Option<Point> {
        match s {
            [x, y] => Some(Point { x: *x, y: *y, z: None }),
            [x, y, z, ..] => Some(Point { x: *x, y: *y, z: Some(*z) }),
            _ => None,
        }
    }

    pub fn coords(&self) -> impl Iterator<Item = f64> {
        [Some(self.x), Some(self.y), self.z].into_iter().flatten()
    }

    pub fn to_value(&self) -> Value {
        Datum::Point(&self.coords().collect::<Vec<f64>>()).to_value()
    }

    pub fn coord(&self, axis: usize) -> Option<f64> {
        match axis {
            0 => Some(self.x),
            1 => Some(self.y),
            2 => self.z,
            _ => None,
        }
    }
}

impl Column {
    pub fn ones(rows: usize) -> Column {
        Column::Numbers(vec![1.0; rows])
    }

    pub fn len(&self) -> usize {
        match self {
            Column::Numbers(v) => v.len(),
            Column::Strings(v) => v.len(),
            Column::Categories { codes, .. } => codes.len(),
            Column::Points(v) => v.len(),
            Column::Values(v) => v.len(),
            Column::Object(m) => m
                .get("x")
                .and_then(Value::as_array)
                .map_or(0, |a| a.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn datum(&self, row: usize) -> Datum<'_> {
        match self {
            Column::Numbers(v) => match v.get(row) {
                Some(x) if !x.is_nan() => Datum::Num(*x),
                _ => Datum::Missing,
            },
            Column::Strings(v) => v.get(row).map_or(Datum::Missing, |s| Datum::Str(s)),
            Column::Categories { categories, codes } => codes
                .get(row)
                .and_then(|c| usize::try_from(*c).ok())
                .and_then(|c| categories.get(c))
                .map_or(Datum::Missing, Datum::from_json),
            Column::Points(v) => v.get(row).map_or(Datum::Missing, |p| Datum::Point(p)),
            Column::Values(v) => v.get(row).map_or(Datum::Missing, Datum::from_json),
            // Objects are row-addressable only as `x`/`y`[/`z`] coordinates.
            Column::Object(_) => self.point(row).map_or(Datum::Missing, Datum::Coord),
        }
    }

    pub fn number(&self, row: usize) -> Option<f64> {
        self.datum(row).as_f64()
    }

    pub fn point(&self, row: usize) -> Option<Point> {
        match self {
            Column::Points(v) => v.get(row).and_then(|p| Point::from_slice(p)),
            Column::Values(v) => {
                let coords = v
                    .get(row)?
                    .as_array()?
                    .iter()
                    .map(Value::as_f64)
                    .collect::<Option<Vec<f64>>>()?;
                Point::from_slice(&coords)
            }
            Column::Object(m) => {
                let axis = |name: &str| m.get(name)?.as_array()?.get(row)?.as_f64();
                Some(Point {
                    x: axis("x")?,
                    y: axis("y")?,
                    z: axis("z"),
                })
            }
            _ => None,
        }
    }
}

struct JsonF64(f64);
impl Serialize for JsonF64 {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        if self.0.is_finite() {
            s.serialize_f64(self.0)
        } else {
            s.serialize_none()
        }
    }
}

// Columns serialize back to the plain-array shape a caller would have
// fetched, whatever their wire encoding was.
impl Serialize for Column {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Column::Numbers(v) => {
                let mut seq = s.serialize_seq(Some(v.len()))?;
                for x in v {
                    seq.serialize_element(&JsonF64(*x))?;
                }
                seq.end()
            }
            Column::Strings(v) => v.serialize(s),
            Column::Categories { .. } => {
                let mut seq = s.serialize_seq(Some(self.len()))?;
                for row in 0..self.len() {
                    seq.serialize_element(&self.datum(row).to_value())?;
                }
                seq.end()
            }
            Column::Points(v) => {
                let mut seq = s.serialize_seq(Some(v.len()))?;
                for p in v {
                    let p: Vec<JsonF64> = p.iter().map(|x| JsonF64(*x)).collect();
                    seq.serialize_element(&p)?;
                }
                seq.end()
            }
            Column::Values(v) => v.serialize(s),
            Column::Object(m) => {
                let mut map = s.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
