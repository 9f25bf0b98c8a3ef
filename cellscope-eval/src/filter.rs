use cellscope_base::RowSet;
use cellscope_lang::{
    BasisLeaf, CmpOp, Column, ColumnMap, Datum, Filter, ObsLeaf, ObsOp, Operand, ValueLeaf,
};
use serde_json::Value;

/// Rows of `0..rows` for which `filter` holds, ascending.
///
/// Every column the filter names (see `split_data_filter`) must already be in
/// `columns`; a missing one is a bug in the caller and panics.
pub fn passing_indices(columns: &ColumnMap, rows: usize, filter: &Filter) -> Vec<usize> {
    passing_rows(columns, rows, filter).to_indices()
}

pub fn passing_rows(columns: &ColumnMap, rows: usize, filter: &Filter) -> RowSet {
    match filter {
        Filter::And(children) => {
            let mut acc = RowSet::full(rows);
            for c in children {
                if acc.is_empty() {
                    break;
                }
                acc.intersect(&passing_rows(columns, rows, c));
            }
            acc
        }
        Filter::Or(children) => {
            let mut acc = RowSet::new(rows);
            for c in children {
                acc.union(&passing_rows(columns, rows, c));
            }
            acc
        }
        Filter::Not(child) => {
            let mut acc = passing_rows(columns, rows, child);
            acc.complement();
            acc
        }
        Filter::Obs(leaf) => {
            let col = resident(columns, &leaf.key);
            select(rows, |row| obs_passes(leaf, col.datum(row)))
        }
        Filter::Value(leaf) => {
            let col = resident(columns, &leaf.key);
            select(rows, |row| col.number(row).is_some_and(|x| value_passes(leaf, x)))
        }
        Filter::Basis(leaf) => basis_rows(columns, rows, leaf),
    }
}

fn resident<'a>(columns: &'a ColumnMap, key: &str) -> &'a Column {
    match columns.get(key) {
        Some(col) => &**col,
        None => panic!("filter reads column '{}' but it was never fetched", key),
    }
}

fn select(rows: usize, pred: impl Fn(usize) -> bool) -> RowSet {
    let mut set = RowSet::new(rows);
    for row in 0..rows {
        if pred(row) {
            set.set(row, true);
        }
    }
    set
}

fn member(d: &Datum, set: &Value) -> bool {
    match set {
        Value::Array(items) => items.iter().any(|v| d.matches(v)),
        single => d.matches(single),
    }
}

fn obs_passes(leaf: &ObsLeaf, d: Datum) -> bool {
    match leaf.op {
        ObsOp::Eq => d.matches(&leaf.value),
        ObsOp::Ne => !d.matches(&leaf.value),
        ObsOp::In => member(&d, &leaf.value),
        ObsOp::NotIn => !member(&d, &leaf.value),
    }
}

fn value_passes(leaf: &ValueLeaf, x: f64) -> bool {
    match (leaf.op, leaf.value) {
        (CmpOp::Eq, Operand::Scalar(v)) => x == v,
        (CmpOp::Ne, Operand::Scalar(v)) => x != v,
        (CmpOp::Gt, Operand::Scalar(v)) => x > v,
        (CmpOp::Ge, Operand::Scalar(v)) => x >= v,
        (CmpOp::Lt, Operand::Scalar(v)) => x < v,
        (CmpOp::Le, Operand::Scalar(v)) => x <= v,
        (CmpOp::Between, Operand::Range([lo, hi])) => lo <= x && x <= hi,
        // Rejected when the filter is parsed; only reachable for hand-built trees.
        _ => false,
    }
}

fn basis_rows(columns: &ColumnMap, rows: usize, leaf: &BasisLeaf) -> RowSet {
    let key = leaf.basis.key();
    let col = resident(columns, &key);
    select(rows, |row| {
        col.point(row).is_some_and(|p| leaf.region.contains(&p))
    })
}
