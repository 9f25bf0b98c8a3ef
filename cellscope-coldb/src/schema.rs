use crate::source::ColumnSource;
use cellscope_base::{Error, ErrorKind, Result};
use cellscope_lang::Schema;
use cellscope_net::{ByteRangeIndex, Layout, Transport, SCHEMA_KEY};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

struct Loaded {
    schema: Arc<Schema>,
    // Present only for JSONL datasets.
    index: Option<Arc<ByteRangeIndex>>,
}

pub struct SchemaStore<T: Transport> {
    transport: Arc<T>,
    layout: Layout,
    loaded: OnceCell<Loaded>,
}

fn schema_err(e: Error) -> Error {
    e.with_kind(ErrorKind::Schema)
}

impl<T: Transport> SchemaStore<T> {
    pub fn new(transport: Arc<T>, url: &str) -> Self {
        SchemaStore {
            transport,
            layout: Layout::from_url(url),
            loaded: OnceCell::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // Fetches at most once on success. Concurrent callers share the one
    // in-flight load; a failed load caches nothing, so calling again retries.
    pub async fn load(&self) -> Result<Arc<Schema>> {
        Ok(self.loaded().await?.schema.clone())
    }

    pub fn schema(&self) -> Option<Arc<Schema>> {
        self.loaded.get().map(|l| l.schema.clone())
    }

    pub async fn column_source(&self) -> Result<ColumnSource<T>> {
        let loaded = self.loaded().await?;
        Ok(ColumnSource::new(
            self.transport.clone(),
            self.layout.clone(),
            loaded.index.clone(),
        ))
    }

    // Job and annotation metadata lives beside the dataset and is never cached.
    pub async fn fetch_job(&self, id: &str) -> Result<Value> {
        let bytes = self.transport.get(&self.layout.job_url(id), None).await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::new(ErrorKind::Decode, e))
    }

    async fn loaded(&self) -> Result<&Loaded> {
        self.loaded.get_or_try_init(|| self.fetch()).await
    }

    async fn fetch(&self) -> Result<Loaded> {
        let loaded = match &self.layout {
            Layout::Json { schema_url, .. } => {
                let bytes = self
                    .transport
                    .get(schema_url, None)
                    .await
                    .map_err(schema_err)?;
                Loaded {
                    schema: Arc::new(Schema::from_json_slice(&bytes)?),
                    index: None,
                }
            }
            Layout::Jsonl {
                blob_url,
                index_url,
                ..
            } => {
                // The schema is just another record in the blob, so the
                // index has to come first.
                let bytes = self
                    .transport
                    .get(index_url, None)
                    .await
                    .map_err(schema_err)?;
                let index = ByteRangeIndex::from_json_slice(&bytes)?;
                let range = index.range(SCHEMA_KEY).map_err(schema_err)?;
                let bytes = self
                    .transport
                    .get(blob_url, Some(range))
                    .await
                    .map_err(schema_err)?;
                Loaded {
                    schema: Arc::new(Schema::from_json_slice(&bytes)?),
                    index: Some(Arc::new(index)),
                }
            }
        };
        info!(
            base_url = self.layout.base_url(),
            format = ?self.layout.format(),
            rows = loaded.schema.rows(),
            features = loaded.schema.features.len(),
            "schema loaded"
        );
        Ok(loaded)
    }
}
