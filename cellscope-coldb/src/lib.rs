// The session's store: one schema, loaded once, and a write-once cache of
// columns fetched on demand.
//
// Columns are keyed by string and never change once cached, so readers can
// hold an `Arc<Column>` across any later fetch. The only mutation is
// insertion, and each key is read from the source at most once: concurrent
// requests for a key that is already in flight wait on the same read.

mod cache;
mod schema;
mod source;

#[cfg(test)]
mod test;

pub use cache::{ColumnCache, FetchReport};
pub use schema::SchemaStore;
pub use source::ColumnSource;
