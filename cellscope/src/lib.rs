// A dataset session: one schema, one column cache, and the query surface
// over them.
//
// A query names embeddings, raw values, a selection filter and the
// statistics wanted; the session works out every column the query will
// touch, fetches whatever isn't cached yet, and only then evaluates and
// aggregates, synchronously, over resident columns.

mod dataset;


pub use dataset::{
    Dataset, EmbeddingResult, QueryResult, ResultValues, SelectedIds, SelectionResult,
};

pub use cellscope_base::{Error, ErrorKind, Result};
pub use cellscope_coldb::FetchReport;
pub use cellscope_eval::{Bin, DimensionSummary, Group, GroupMeasure, MeasureSummary, Summary};
pub use cellscope_lang::{
    Agg, Basis, ColumnView, EmbeddingRequest, Fields, Filter, Query, Schema, SelectionRequest,
    COUNT_KEY, INDEX_KEY,
};
pub use cellscope_net::{FileTransport, HttpConfig, HttpTransport, MemTransport, Transport};
