// Eval is responsible for everything computed from columns that are
// already resident: which rows pass a filter, and the summaries drawn over
// them.
//
// Nothing here performs I/O or suspends. Callers fetch first, then evaluate.

mod filter;
mod stats;


pub use filter::{passing_indices, passing_rows};
pub use stats::{
    bin_embedding, grouped_stats, summarize, Bin, DimensionSummary, Group, GroupMeasure,
    MeasureSummary, Summary, Values,
};
