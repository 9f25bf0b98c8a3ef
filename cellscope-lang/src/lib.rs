mod basis;
mod column;
mod filter;
mod query;
mod schema;
mod vector;

#[cfg(test)]
mod test;

pub use basis::{Agg, Basis};
pub use column::{Column, ColumnMap, Datum, Point, COUNT_KEY, INDEX_KEY};
pub use filter::{
    split_data_filter, BasisLeaf, CmpOp, Filter, ObsLeaf, ObsOp, Operand, Region, SplitKeys,
    ValueLeaf,
};
pub use query::{EmbeddingRequest, Fields, Query, SelectionRequest};
pub use schema::{BasisInfo, Feature, FeatureKind, Format, PrecomputedBins, Schema};
pub use vector::{BoxedView, ColumnView, SlicedVector, Vector};
