use crate::basis::Basis;
use crate::column::Point;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

// A selection predicate. Leaves test one column each; `obs` leaves test
// categorical metadata, `X` leaves test continuous measures, and `basis`
// leaves test whether a row's embedding coordinate falls in a region.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFilter", into = "RawFilter")]
pub enum Filter {
    Obs(ObsLeaf),
    Value(ValueLeaf),
    Basis(BasisLeaf),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ObsOp {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in", alias = "!in")]
    NotIn,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "between")]
    Between,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Scalar(f64),
    Range([f64; 2]),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObsLeaf {
    pub key: String,
    pub op: ObsOp,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueLeaf {
    pub key: String,
    pub op: CmpOp,
    pub value: Operand,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BasisLeaf {
    pub basis: Basis,
    pub region: Region,
}

// Regions include their boundary: a point on a rectangle face, on the
// sphere/circle surface, or on a polygon edge or vertex is inside.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    // Axis-aligned box, 2 or 3 bounds per corner.
    Rect { min: Vec<f64>, max: Vec<f64> },
    // Tested against the (x, y) projection of the point.
    Polygon(Vec<[f64; 2]>),
    Radius { center: Vec<f64>, r: f64 },
}

impl Region {
    /// A rect needs matching 2 or 3 bounds per corner, a radius a 2 or 3
    /// coordinate center and a non-negative radius.
    pub fn validate(&self) -> Result<(), String> {
        let axes_ok = |n: usize| (2..=3).contains(&n);
        match self {
            Region::Rect { min, max } if min.len() != max.len() || !axes_ok(min.len()) => Err(
                format!("rect bounds need 2 or 3 axes each, got {} and {}", min.len(), max.len()),
            ),
            Region::Radius { center, .. } if !axes_ok(center.len()) => Err(format!(
                "radius center needs 2 or 3 axes, got {}",
                center.len()
            )),
            Region::Radius { r, .. } if r.is_nan() || *r < 0.0 => {
                Err(format!("radius must be non-negative, got {}", r))
            }
            _ => Ok(()),
        }
    }

    // A malformed region contains nothing.
    pub fn contains(&self, p: &Point) -> bool {
        if self.validate().is_err() {
            return false;
        }
        match self {
            Region::Rect { min, max } => min
                .iter()
                .zip(max.iter())
                .enumerate()
                .all(|(axis, (lo, hi))| match p.coord(axis) {
                    Some(c) => *lo <= c && c <= *hi,
                    None => false,
                }),
            Region::Radius { center, r } => {
                let mut d2 = 0.0;
                for (axis, c) in center.iter().enumerate() {
                    match p.coord(axis) {
                        Some(v) => d2 += (v - c) * (v - c),
                        None => return false,
                    }
                }
                d2 <= r * r
            }
            Region::Polygon(vertices) => polygon_contains(vertices, p.x, p.y),
        }
    }
}

fn on_segment(a: [f64; 2], b: [f64; 2], x: f64, y: f64) -> bool {
    let cross = (b[0] - a[0]) * (y - a[1]) - (b[1] - a[1]) * (x - a[0]);
    if cross.abs() > 1e-12 * (1.0 + a[0].abs() + a[1].abs() + b[0].abs() + b[1].abs()) {
        return false;
    }
    a[0].min(b[0]) <= x && x <= a[0].max(b[0]) && a[1].min(b[1]) <= y && y <= a[1].max(b[1])
}

fn polygon_contains(vertices: &[[f64; 2]], x: f64, y: f64) -> bool {
    let n = vertices.len();
    if n < 3 {
        return false;
    }
    // Boundary first, so the even-odd rule below never has to decide it.
    for i in 0..n {
        if on_segment(vertices[i], vertices[(i + 1) % n], x, y) {
            return true;
        }
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = (vertices[i][0], vertices[i][1]);
        let (xj, yj) = (vertices[j][0], vertices[j][1]);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Column keys a filter dereferences, by operand kind.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SplitKeys {
    pub basis: BTreeSet<String>,
    pub x: BTreeSet<String>,
    pub obs: BTreeSet<String>,
}

impl SplitKeys {
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.basis.iter().chain(self.x.iter()).chain(self.obs.iter())
    }
}

// Every key the filter will read must be fetched before it is evaluated, so
// the walk here has to agree exactly with the evaluator's.
pub fn split_data_filter(filter: &Filter) -> SplitKeys {
    let mut keys = SplitKeys::default();
    collect_keys(filter, &mut keys);
    keys
}

fn collect_keys(filter: &Filter, keys: &mut SplitKeys) {
    match filter {
        Filter::Obs(leaf) => {
            keys.obs.insert(leaf.key.clone());
        }
        Filter::Value(leaf) => {
            keys.x.insert(leaf.key.clone());
        }
        Filter::Basis(leaf) => {
            keys.basis.insert(leaf.basis.key());
        }
        Filter::And(children) | Filter::Or(children) => {
            for c in children {
                collect_keys(c, keys);
            }
        }
        Filter::Not(child) => collect_keys(child, keys),
    }
}

impl Filter {
    pub fn obs(key: impl Into<String>, op: ObsOp, value: Value) -> Filter {
        Filter::Obs(ObsLeaf {
            key: key.into(),
            op,
            value,
        })
    }

    pub fn x(key: impl Into<String>, op: CmpOp, value: Operand) -> Filter {
        Filter::Value(ValueLeaf {
            key: key.into(),
            op,
            value,
        })
    }

    pub fn basis(basis: Basis, region: Region) -> Filter {
        Filter::Basis(BasisLeaf { basis, region })
    }
}

// Wire shape: combinators are `{op, children}`, leaves are tagged by `type`.

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
enum GroupOp {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
    #[serde(rename = "NOT", alias = "not")]
    Not,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum Leaf {
    #[serde(rename = "obs")]
    Obs(ObsLeaf),
    #[serde(rename = "X")]
    Value(ValueLeaf),
    #[serde(rename = "basis")]
    Basis(BasisLeaf),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawFilter {
    Group { op: GroupOp, children: Vec<Filter> },
    Leaf(Leaf),
}

impl TryFrom<RawFilter> for Filter {
    type Error = String;
    fn try_from(raw: RawFilter) -> Result<Self, Self::Error> {
        match raw {
            RawFilter::Group { op: GroupOp::And, children } => Ok(Filter::And(children)),
            RawFilter::Group { op: GroupOp::Or, children } => Ok(Filter::Or(children)),
            RawFilter::Group { op: GroupOp::Not, mut children } => {
                if children.len() != 1 {
                    return Err(format!("NOT takes exactly one child, got {}", children.len()));
                }
                Ok(Filter::Not(Box::new(children.remove(0))))
            }
            RawFilter::Leaf(Leaf::Obs(leaf)) => {
                if matches!(leaf.op, ObsOp::In | ObsOp::NotIn) && !leaf.value.is_array() {
                    return Err(format!("'{}' membership test needs an array value", leaf.key));
                }
                Ok(Filter::Obs(leaf))
            }
            RawFilter::Leaf(Leaf::Value(leaf)) => {
                match (leaf.op, leaf.value) {
                    (CmpOp::Between, Operand::Scalar(_)) => {
                        return Err(format!("'{}' between needs a [lo, hi] value", leaf.key))
                    }
                    (op, Operand::Range(_)) if op != CmpOp::Between => {
                        return Err(format!("'{}' comparison needs a scalar value", leaf.key))
                    }
                    _ => {}
                }
                Ok(Filter::Value(leaf))
            }
            RawFilter::Leaf(Leaf::Basis(leaf)) => {
                leaf.region
                    .validate()
                    .map_err(|e| format!("'{}' region: {}", leaf.basis.name, e))?;
                Ok(Filter::Basis(leaf))
            }
        }
    }
}

impl From<Filter> for RawFilter {
    fn from(f: Filter) -> RawFilter {
        match f {
            Filter::Obs(leaf) => RawFilter::Leaf(Leaf::Obs(leaf)),
            Filter::Value(leaf) => RawFilter::Leaf(Leaf::Value(leaf)),
            Filter::Basis(leaf) => RawFilter::Leaf(Leaf::Basis(leaf)),
            Filter::And(children) => RawFilter::Group {
                op: GroupOp::And,
                children,
            },
            Filter::Or(children) => RawFilter::Group {
                op: GroupOp::Or,
                children,
            },
            Filter::Not(child) => RawFilter::Group {
                op: GroupOp::Not,
                children: vec![*child],
            },
        }
    }
}
