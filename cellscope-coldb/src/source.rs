use cellscope_base::{err_kind, ErrorKind, Result};
use cellscope_lang::Column;
use cellscope_net::{ByteRangeIndex, Layout, Payload, Transport};
use std::sync::Arc;
use tracing::debug;

// Turns a column key into exactly one physical read, and the bytes it
// returns into a decoded column.
pub struct ColumnSource<T: Transport> {
    transport: Arc<T>,
    layout: Layout,
    index: Option<Arc<ByteRangeIndex>>,
}

impl<T: Transport> ColumnSource<T> {
    pub fn new(transport: Arc<T>, layout: Layout, index: Option<Arc<ByteRangeIndex>>) -> Self {
        ColumnSource {
            transport,
            layout,
            index,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub async fn read(&self, key: &str) -> Result<Vec<u8>> {
        match (&self.layout, &self.index) {
            (Layout::Json { .. }, _) => {
                let url = self.layout.column_url(key);
                debug!(key, %url, "column read");
                self.transport.get(&url, None).await
            }
            (Layout::Jsonl { blob_url, .. }, Some(index)) => {
                let range = index.range(key)?;
                debug!(key, range = %range.header_value(), "column read");
                self.transport.get(blob_url, Some(range)).await
            }
            (Layout::Jsonl { index_url, .. }, None) => Err(err_kind(
                ErrorKind::Schema,
                format!("column '{}' read before byte-range index {} was loaded", key, index_url),
            )),
        }
    }

    pub async fn read_column(&self, key: &str, rows: usize) -> Result<Column> {
        let bytes = self.read(key).await?;
        Payload::from_slice(&bytes)?.into_column(rows)
    }
}
