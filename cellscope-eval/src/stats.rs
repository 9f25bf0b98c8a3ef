use cellscope_base::{err_kind, ErrorKind, Result};
use cellscope_lang::{Agg, Column, Datum, Point};
use ordered_float::OrderedFloat;
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

/// Assembled query values by key. Ordered, so everything derived from it
/// comes out in a stable order.
pub type Values = BTreeMap<String, Arc<Column>>;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub categories: Vec<String>,
    pub counts: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MeasureSummary {
    pub count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: f64,
    pub mean: Option<f64>,
    pub num_expressed: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Summary {
    pub dimensions: BTreeMap<String, DimensionSummary>,
    pub measures: BTreeMap<String, MeasureSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GroupMeasure {
    pub mean: Option<f64>,
    pub fraction_expressed: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Group {
    pub key: Vec<Value>,
    pub count: usize,
    pub measures: BTreeMap<String, GroupMeasure>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Bin {
    pub id: usize,
    pub count: usize,
    pub center: Vec<f64>,
    pub values: BTreeMap<String, Option<f64>>,
}

// One component of a group key. The derived order puts numbers first (by
// value), then strings, then missing.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum KeyPart {
    Num(OrderedFloat<f64>),
    Str(String),
    Missing,
}

impl KeyPart {
    fn of(d: Datum) -> KeyPart {
        match d {
            Datum::Num(x) => KeyPart::Num(OrderedFloat(x)),
            Datum::Str(s) => KeyPart::Str(s.to_string()),
            Datum::Missing => KeyPart::Missing,
            other => KeyPart::Str(other.label()),
        }
    }

    fn label(&self) -> String {
        match self {
            KeyPart::Num(x) => x.0.to_string(),
            KeyPart::Str(s) => s.clone(),
            KeyPart::Missing => String::new(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            KeyPart::Num(x) => Datum::Num(x.0).to_value(),
            KeyPart::Str(s) => Value::String(s.clone()),
            KeyPart::Missing => Value::Null,
        }
    }
}

// Either the given subset of rows, in order, or all of `0..len`.
fn row_iter(rows: Option<&[usize]>, len: usize) -> impl Iterator<Item = usize> + '_ {
    let (all, some) = match rows {
        Some(r) => (None, Some(r.iter().copied())),
        None => (Some(0..len), None),
    };
    all.into_iter().flatten().chain(some.into_iter().flatten())
}

fn lookup<'a>(values: &'a Values, key: &str) -> Option<&'a Column> {
    let col = values.get(key).map(|c| &**c);
    if col.is_none() {
        debug!(key, "no values for field, skipped");
    }
    col
}

fn summarize_dimension(col: &Column, rows: Option<&[usize]>) -> DimensionSummary {
    let mut counts: BTreeMap<KeyPart, usize> = BTreeMap::new();
    for row in row_iter(rows, col.len()) {
        match KeyPart::of(col.datum(row)) {
            KeyPart::Missing => {}
            k => *counts.entry(k).or_default() += 1,
        }
    }
    let mut out = DimensionSummary::default();
    for (k, n) in counts {
        out.categories.push(k.label());
        out.counts.push(n);
    }
    out
}

fn summarize_measure(col: &Column, rows: Option<&[usize]>) -> MeasureSummary {
    let mut out = MeasureSummary::default();
    for x in row_iter(rows, col.len()).filter_map(|row| col.number(row)) {
        out.count += 1;
        out.sum += x;
        out.min = Some(out.min.map_or(x, |m| m.min(x)));
        out.max = Some(out.max.map_or(x, |m| m.max(x)));
        if x > 0.0 {
            out.num_expressed += 1;
        }
    }
    if out.count > 0 {
        out.mean = Some(out.sum / out.count as f64);
    }
    out
}

/// Per-field summaries over `rows` (all rows when `None`). Dimensions, and
/// measures that `is_categorical` says are categorical, are counted by
/// category; everything else gets numeric statistics. Fields with no entry
/// in `values` are left out.
pub fn summarize(
    values: &Values,
    rows: Option<&[usize]>,
    dimensions: &[String],
    measures: &[String],
    is_categorical: impl Fn(&str) -> bool,
) -> Summary {
    let mut summary = Summary::default();
    for name in dimensions {
        if let Some(col) = lookup(values, name) {
            summary
                .dimensions
                .insert(name.clone(), summarize_dimension(col, rows));
        }
    }
    for name in measures {
        let Some(col) = lookup(values, name) else {
            continue;
        };
        if is_categorical(name) {
            summary
                .dimensions
                .insert(name.clone(), summarize_dimension(col, rows));
        } else {
            summary
                .measures
                .insert(name.clone(), summarize_measure(col, rows));
        }
    }
    summary
}

#[derive(Default)]
struct MeasureAcc {
    n: usize,
    sum: f64,
    expressed: usize,
}

/// Rows grouped by the tuple of their `dimensions` values, ascending by key,
/// with each measure's mean and the fraction of the group's rows where it is
/// positive. `rows` picks a subset of `0..row_count`. With no dimensions there
/// is a single group holding every row, unless there are no rows at all.
pub fn grouped_stats(
    values: &Values,
    row_count: usize,
    rows: Option<&[usize]>,
    dimensions: &[String],
    measures: &[String],
) -> Vec<Group> {
    let dims: Vec<&Column> = dimensions.iter().filter_map(|d| lookup(values, d)).collect();
    let meas: Vec<(&String, &Column)> = measures
        .iter()
        .filter_map(|m| lookup(values, m).map(|c| (m, c)))
        .collect();

    let mut groups: BTreeMap<Vec<KeyPart>, (usize, Vec<MeasureAcc>)> = BTreeMap::new();
    for row in row_iter(rows, row_count) {
        let key: Vec<KeyPart> = dims.iter().map(|c| KeyPart::of(c.datum(row))).collect();
        let (count, accs) = groups
            .entry(key)
            .or_insert_with(|| (0, meas.iter().map(|_| MeasureAcc::default()).collect()));
        *count += 1;
        for ((_, col), acc) in meas.iter().zip(accs.iter_mut()) {
            if let Some(x) = col.number(row) {
                acc.n += 1;
                acc.sum += x;
                if x > 0.0 {
                    acc.expressed += 1;
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|(key, (count, accs))| Group {
            key: key.iter().map(KeyPart::to_value).collect(),
            count,
            measures: meas
                .iter()
                .zip(accs)
                .map(|((name, _), acc)| {
                    let gm = GroupMeasure {
                        mean: (acc.n > 0).then(|| acc.sum / acc.n as f64),
                        fraction_expressed: acc.expressed as f64 / count as f64,
                    };
                    ((*name).clone(), gm)
                })
                .collect(),
        })
        .collect()
}

struct Grid {
    lo: Vec<f64>,
    width: Vec<f64>,
    nbins: usize,
}

impl Grid {
    // Spans the bounding box of `points`; the upper edge belongs to the last bin.
    fn spanning(points: &[(usize, Point)], axes: usize, nbins: usize) -> Grid {
        let mut lo = vec![f64::INFINITY; axes];
        let mut hi = vec![f64::NEG_INFINITY; axes];
        for (_, p) in points {
            for axis in 0..axes {
                let c = p.coord(axis).unwrap_or(0.0);
                lo[axis] = lo[axis].min(c);
                hi[axis] = hi[axis].max(c);
            }
        }
        let width = lo
            .iter()
            .zip(hi.iter())
            .map(|(l, h)| (h - l) / nbins as f64)
            .collect();
        Grid { lo, width, nbins }
    }

    fn cell(&self, axis: usize, c: f64) -> usize {
        if self.width[axis] <= 0.0 {
            return 0;
        }
        let i = ((c - self.lo[axis]) / self.width[axis]).floor();
        (i.max(0.0) as usize).min(self.nbins - 1)
    }

    fn bin_of(&self, p: &Point) -> usize {
        let mut id = 0;
        let mut stride = 1;
        for axis in 0..self.lo.len() {
            id += self.cell(axis, p.coord(axis).unwrap_or(0.0)) * stride;
            stride *= self.nbins;
        }
        id
    }

    fn center(&self, id: usize) -> Vec<f64> {
        let mut rest = id;
        let mut out = Vec::with_capacity(self.lo.len());
        for axis in 0..self.lo.len() {
            let i = rest % self.nbins;
            rest /= self.nbins;
            out.push(self.lo[axis] + (i as f64 + 0.5) * self.width[axis]);
        }
        out
    }
}

fn aggregate(agg: Agg, xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return match agg {
            Agg::Count | Agg::Sum => Some(0.0),
            _ => None,
        };
    }
    Some(match agg {
        Agg::Max => xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Agg::Min => xs.iter().copied().fold(f64::INFINITY, f64::min),
        Agg::Sum => xs.iter().sum(),
        Agg::Mean => xs.iter().sum::<f64>() / xs.len() as f64,
        Agg::Count => xs.len() as f64,
    })
}

/// Bins the embedding `points` on an `nbins`-per-axis grid over their
/// bounding box and aggregates each measure within each bin with `agg`.
/// The grid is 3D when every point has a `z`. Only occupied bins are
/// returned, ordered by id (x varies fastest). Fails when bin ids for
/// `nbins` per axis would not fit in a `usize`.
pub fn bin_embedding(
    points: &Column,
    nbins: u32,
    agg: Agg,
    values: &Values,
    measures: &[String],
    rows: Option<&[usize]>,
) -> Result<Vec<Bin>> {
    let nbins = nbins as usize;
    let located: Vec<(usize, Point)> = row_iter(rows, points.len())
        .filter_map(|row| points.point(row).map(|p| (row, p)))
        .collect();
    if nbins == 0 || located.is_empty() {
        return Ok(Vec::new());
    }
    let axes: usize = if located.iter().all(|(_, p)| p.z.is_some()) { 3 } else { 2 };
    if nbins.checked_pow(axes as u32).is_none() {
        return Err(err_kind(
            ErrorKind::Query,
            format!("{} bins per axis is too many for a {}D embedding", nbins, axes),
        ));
    }
    let grid = Grid::spanning(&located, axes, nbins);
    let meas: Vec<(&String, &Column)> = measures
        .iter()
        .filter_map(|m| lookup(values, m).map(|c| (m, c)))
        .collect();

    let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, p) in &located {
        members.entry(grid.bin_of(p)).or_default().push(*row);
    }
    let bins = members
        .into_iter()
        .map(|(id, in_bin)| {
            let aggregated = meas
                .iter()
                .map(|(name, col)| {
                    let xs: Vec<f64> = in_bin.iter().filter_map(|r| col.number(*r)).collect();
                    ((*name).clone(), aggregate(agg, &xs))
                })
                .collect();
            Bin {
                id,
                count: in_bin.len(),
                center: grid.center(id),
                values: aggregated,
            }
        })
        .collect();
    Ok(bins)
}
