use crate::source::ColumnSource;
use cellscope_base::{err_kind, Error, ErrorKind, Result};
use cellscope_lang::{BoxedView, Column, ColumnMap, Vector, COUNT_KEY};
use cellscope_net::Transport;
use futures::{
    future::{join_all, BoxFuture, Shared},
    FutureExt,
};
use parking_lot::Mutex;
use rapidhash::RapidHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

// Errors aren't Clone, so the shared read hands out an Arc'd one.
type SharedRead = Shared<BoxFuture<'static, std::result::Result<Arc<Column>, Arc<Error>>>>;

struct Pending {
    // Distinguishes this read from a later retry of the same key.
    id: u64,
    read: SharedRead,
}

#[derive(Default)]
struct State {
    columns: ColumnMap,
    pending: RapidHashMap<String, Pending>,
    next_id: u64,
}

/// Outcome of one fetch batch, per key. Keys that were already cached,
/// duplicates and the synthetic count key appear in neither list.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub loaded: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl FetchReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    // The batch fails with its first failure; successes stay cached either way.
    pub fn into_result(self) -> Result<()> {
        match self.failed.into_iter().next() {
            Some((_, e)) => Err(e),
            None => Ok(()),
        }
    }
}

pub struct ColumnCache<T: Transport> {
    source: Arc<ColumnSource<T>>,
    rows: usize,
    state: Mutex<State>,
}

impl<T: Transport> ColumnCache<T> {
    pub fn new(source: ColumnSource<T>, rows: usize) -> Self {
        ColumnCache {
            source: Arc::new(source),
            rows,
            state: Mutex::new(State::default()),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub async fn fetch_columns<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        self.fetch_columns_report(keys).await.into_result()
    }

    pub async fn fetch_columns_report<S: AsRef<str>>(&self, keys: &[S]) -> FetchReport {
        let reads = self.begin_reads(keys);
        let mut report = FetchReport::default();
        if reads.is_empty() {
            return report;
        }
        debug!(keys = reads.len(), "column fetch batch");
        let done = join_all(
            reads
                .into_iter()
                .map(|(key, id, read)| async move { (key, id, read.await) }),
        )
        .await;
        for (key, id, res) in done {
            match self.finish_read(&key, id, res) {
                Ok(()) => report.loaded.push(key),
                Err(e) => report.failed.push((key, e)),
            }
        }
        report
    }

    // Under one lock: everything not yet cached either joins the read already
    // in flight for its key or starts a new one. Nothing is awaited here.
    fn begin_reads<S: AsRef<str>>(&self, keys: &[S]) -> Vec<(String, u64, SharedRead)> {
        let mut state = self.state.lock();
        let mut reads: Vec<(String, u64, SharedRead)> = Vec::new();
        for key in keys.iter().map(AsRef::as_ref) {
            if key == COUNT_KEY
                || state.columns.contains_key(key)
                || reads.iter().any(|(k, _, _)| k == key)
            {
                continue;
            }
            if let Some(p) = state.pending.get(key) {
                reads.push((key.to_string(), p.id, p.read.clone()));
                continue;
            }
            let id = state.next_id;
            state.next_id += 1;
            let read = self.start_read(key);
            state.pending.insert(
                key.to_string(),
                Pending {
                    id,
                    read: read.clone(),
                },
            );
            reads.push((key.to_string(), id, read));
        }
        reads
    }

    fn start_read(&self, key: &str) -> SharedRead {
        let source = self.source.clone();
        let key = key.to_string();
        let rows = self.rows;
        async move {
            source
                .read_column(&key, rows)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        }
        .boxed()
        .shared()
    }

    // Every waiter on a read comes through here; the first one retires the
    // pending entry. A failure leaves nothing behind, so the key can be
    // requested again.
    fn finish_read(
        &self,
        key: &str,
        id: u64,
        res: std::result::Result<Arc<Column>, Arc<Error>>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.pending.get(key).is_some_and(|p| p.id == id) {
            state.pending.remove(key);
        }
        match res {
            Ok(col) => {
                state.columns.entry(key.to_string()).or_insert(col);
                Ok(())
            }
            Err(e) => {
                warn!(key, error = %e, "column read failed");
                Err(e.reraise())
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Column>> {
        if key == COUNT_KEY {
            return Some(Arc::new(Column::ones(self.rows)));
        }
        self.state.lock().columns.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        key == COUNT_KEY || self.state.lock().columns.contains_key(key)
    }

    // A point-in-time copy of the cache; later fetches don't show up in it.
    pub fn columns(&self) -> ColumnMap {
        self.state.lock().columns.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_vector(&self, key: &str, indices: Option<Vec<usize>>) -> Result<BoxedView> {
        let column = self.get(key).ok_or_else(|| {
            err_kind(ErrorKind::Query, format!("column '{}' has not been fetched", key))
        })?;
        let vector = Vector::new(key, column);
        Ok(match indices {
            Some(indices) => Box::new(vector.slice(indices)),
            None => Box::new(vector),
        })
    }
}
