use crate::{index::ByteRange, transport::Transport};
use cellscope_base::{err_kind, ErrorKind, Result};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

// An in-memory object store standing in for a web server: serves datasets
// assembled in-process, and counts every read so callers can check how
// often each object was actually requested.
#[derive(Default)]
pub struct MemTransport {
    objects: Mutex<HashMap<String, Arc<[u8]>>>,
    reads: Mutex<Vec<(String, Option<ByteRange>)>>,
}

impl MemTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let bytes: Arc<[u8]> = Arc::from(bytes.into());
        self.objects.lock().insert(url.into(), bytes);
    }

    pub fn insert_json(&self, url: impl Into<String>, value: &serde_json::Value) {
        self.insert(url, value.to_string());
    }

    // Lay `records` out as one newline-separated blob at `blob_url`, with the
    // byte-range sidecar at `<blob_url>.idx.json`.
    pub fn insert_jsonl(&self, blob_url: &str, records: &[(&str, serde_json::Value)]) {
        let mut blob = Vec::new();
        let mut index = serde_json::Map::new();
        for (key, value) in records {
            let start = blob.len();
            blob.extend_from_slice(value.to_string().as_bytes());
            let end = blob.len() - 1;
            blob.push(b'\n');
            index.insert(key.to_string(), serde_json::json!([start, end]));
        }
        self.insert(blob_url, blob);
        self.insert_json(
            format!("{}.idx.json", blob_url),
            &serde_json::json!({ "index": index }),
        );
    }

    pub fn remove(&self, url: &str) {
        self.objects.lock().remove(url);
    }

    /// Number of reads issued against `url`, whether or not they succeeded.
    pub fn reads(&self, url: &str) -> usize {
        self.reads.lock().iter().filter(|(u, _)| u == url).count()
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().len()
    }

    pub fn read_log(&self) -> Vec<(String, Option<ByteRange>)> {
        self.reads.lock().clone()
    }
}

impl Transport for MemTransport {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        self.reads.lock().push((url.to_string(), range));
        // Give other tasks a turn, as a real round-trip would.
        tokio::task::yield_now().await;
        let object = self.objects.lock().get(url).cloned();
        let Some(bytes) = object else {
            return Err(err_kind(
                ErrorKind::Fetch,
                format!("GET {}: status 404 Not Found", url),
            ));
        };
        match range {
            Some(r) => Ok(r.slice(&bytes)?.to_vec()),
            None => Ok(bytes.to_vec()),
        }
    }
}
