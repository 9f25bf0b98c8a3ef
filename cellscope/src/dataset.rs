use cellscope_base::{err_kind, Error, ErrorKind, Result};
use cellscope_coldb::{ColumnCache, FetchReport, SchemaStore};
use cellscope_eval::{bin_embedding, grouped_stats, passing_indices, summarize, Bin, Group, Summary};
use cellscope_lang::{
    split_data_filter, BoxedView, Column, ColumnView, EmbeddingRequest, Filter, Query, Schema,
    Vector, INDEX_KEY,
};
use cellscope_net::{HttpConfig, HttpTransport, Transport};
use serde::Serialize;
use serde_json::Value;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::OnceCell;
use tracing::debug;

/// Values assembled by `get_data`, keyed by column key. Passed back in on
/// the next call so entries already present are not recomputed.
pub type ResultValues = cellscope_eval::Values;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EmbeddingResult {
    pub name: String,
    pub key: String,
    pub coordinates: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bins: Option<Vec<Bin>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectionResult {
    pub indices: Vec<usize>,
    pub count: usize,
    pub embeddings: Vec<EmbeddingResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub embedding: Vec<EmbeddingResult>,
    pub values: BTreeMap<String, Arc<Column>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouped_stats: Option<Vec<Group>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SelectedIds {
    pub indices: Vec<usize>,
    pub ids: Vec<Value>,
}

// Keys in first-seen order, without repeats.
#[derive(Default)]
struct KeyList(Vec<String>);

impl KeyList {
    fn push(&mut self, key: &str) {
        if !self.0.iter().any(|k| k == key) {
            self.0.push(key.to_string());
        }
    }

    fn extend<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>) {
        for k in keys {
            self.push(k);
        }
    }
}

pub struct Dataset<T: Transport> {
    id: String,
    store: SchemaStore<T>,
    cache: OnceCell<ColumnCache<T>>,
}

impl Dataset<HttpTransport> {
    /// A session over HTTP, configured from the environment.
    pub fn open(id: impl Into<String>, url: &str) -> Result<Self> {
        let transport = HttpTransport::new(&HttpConfig::from_env()?)?;
        Ok(Dataset::init(id, url, Arc::new(transport)))
    }
}

impl<T: Transport> Dataset<T> {
    // Nothing is fetched until the first call that needs the schema.
    pub fn init(id: impl Into<String>, url: &str, transport: Arc<T>) -> Self {
        Dataset {
            id: id.into(),
            store: SchemaStore::new(transport, url),
            cache: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn schema(&self) -> Result<Arc<Schema>> {
        self.store.load().await
    }

    async fn cache(&self) -> Result<&ColumnCache<T>> {
        self.cache.get_or_try_init(|| self.open_cache()).await
    }

    async fn open_cache(&self) -> Result<ColumnCache<T>> {
        let schema = self.store.load().await?;
        let source = self.store.column_source().await?;
        Ok(ColumnCache::new(source, schema.rows()))
    }

    pub async fn fetch_columns<S: AsRef<str>>(&self, keys: &[S]) -> Result<()> {
        self.cache().await?.fetch_columns(keys).await
    }

    pub async fn fetch_columns_report<S: AsRef<str>>(&self, keys: &[S]) -> Result<FetchReport> {
        Ok(self.cache().await?.fetch_columns_report(keys).await)
    }

    /// A view of a column that has already been fetched, restricted to
    /// `indices` when given.
    pub fn get_vector(&self, key: &str, indices: Option<Vec<usize>>) -> Result<BoxedView> {
        match self.cache.get() {
            Some(cache) => cache.get_vector(key, indices),
            None => Err(err_kind(
                ErrorKind::Query,
                format!("dataset {} has not loaded its schema", self.id),
            )),
        }
    }

    pub async fn fetch_job(&self, id: &str) -> Result<Value> {
        self.store.fetch_job(id).await
    }

    /// Rows passing `filter`, with their external identifiers from the
    /// `index` column.
    pub async fn get_selected_ids(&self, filter: &Filter) -> Result<SelectedIds> {
        let cache = self.cache().await?;
        let mut keys = KeyList::default();
        keys.extend(split_data_filter(filter).all());
        keys.push(INDEX_KEY);
        cache.fetch_columns(&keys.0).await?;

        let indices = passing_indices(&cache.columns(), cache.rows(), filter);
        let index = cache.get(INDEX_KEY).ok_or_else(|| {
            err_kind(ErrorKind::Query, format!("dataset {} has no index column", self.id))
        })?;
        let ids = indices.iter().map(|i| index.datum(*i).to_value()).collect();
        Ok(SelectedIds { indices, ids })
    }

    pub async fn get_data(&self, query: &Query, cached: &mut ResultValues) -> Result<QueryResult> {
        let schema = self.store.load().await?;
        let cache = self.cache().await?;

        let mut dimensions = KeyList::default();
        let mut measures = KeyList::default();
        for fields in [&query.stats, &query.grouped_stats].into_iter().flatten() {
            dimensions.extend(&fields.dimensions);
            measures.extend(&fields.measures);
        }
        for e in &query.embedding {
            dimensions.extend(&e.dimensions);
            measures.extend(&e.measures);
        }
        if let Some(sel) = &query.selection {
            dimensions.extend(&sel.dimensions);
            measures.extend(&sel.measures);
            for e in &sel.embeddings {
                dimensions.extend(&e.dimensions);
                measures.extend(&e.measures);
            }
        }
        if let Some(values) = &query.values {
            dimensions.extend(&values.dimensions);
            measures.extend(&values.measures);
        }

        // Measures declared categorical are obs metadata and get category
        // counts; anything else, undeclared included, is an X measure.
        let (obs, x): (Vec<&String>, Vec<&String>) =
            measures.0.iter().partition(|m| schema.is_categorical(m));
        let is_obs = |m: &str| obs.iter().any(|o| *o == m);

        // Fetched in first-seen order.
        let mut keys = KeyList::default();
        keys.extend(&dimensions.0);
        keys.extend(&measures.0);
        if let Some(sel) = &query.selection {
            if let Some(filter) = &sel.filter {
                keys.extend(split_data_filter(filter).all());
            }
            for e in &sel.embeddings {
                keys.push(&e.basis.key());
            }
        }
        for e in &query.embedding {
            keys.push(&e.basis.key());
        }
        debug!(
            dataset = %self.id,
            keys = keys.0.len(),
            obs = obs.len(),
            x = x.len(),
            "query fetch"
        );
        cache.fetch_columns(&keys.0).await?;

        // Everything is resident from here on.
        let rows = cache.rows();
        for key in dimensions.0.iter().chain(measures.0.iter()) {
            if !cached.contains_key(key) {
                if let Some(col) = cache.get(key) {
                    cached.insert(key.clone(), col);
                }
            }
        }

        let mut result = QueryResult::default();
        for e in &query.embedding {
            result
                .embedding
                .push(self.embedding_result(cache, e, cached, None)?);
        }
        if let Some(values) = &query.values {
            for key in values.dimensions.iter().chain(values.measures.iter()) {
                // `__count` comes back from the cache synthesized, like any other key.
                let col = cached.get(key).ok_or_else(|| missing(key))?;
                result.values.insert(key.clone(), col.clone());
            }
        }
        if let Some(sel) = &query.selection {
            let indices = match &sel.filter {
                Some(filter) => passing_indices(&cache.columns(), rows, filter),
                None => (0..rows).collect(),
            };
            let mut embeddings = Vec::with_capacity(sel.embeddings.len());
            for e in &sel.embeddings {
                embeddings.push(self.embedding_result(cache, e, cached, Some(&indices))?);
            }
            let summary = (!sel.dimensions.is_empty() || !sel.measures.is_empty()).then(|| {
                summarize(cached, Some(&indices), &sel.dimensions, &sel.measures, is_obs)
            });
            result.selection = Some(SelectionResult {
                count: indices.len(),
                indices,
                embeddings,
                summary,
            });
        }
        if let Some(stats) = &query.stats {
            result.summary = Some(summarize(
                cached,
                None,
                &stats.dimensions,
                &stats.measures,
                is_obs,
            ));
        }
        if let Some(gs) = &query.grouped_stats {
            result.grouped_stats = Some(grouped_stats(
                cached,
                rows,
                None,
                &gs.dimensions,
                &gs.measures,
            ));
        }
        Ok(result)
    }

    fn embedding_result(
        &self,
        cache: &ColumnCache<T>,
        request: &EmbeddingRequest,
        values: &ResultValues,
        indices: Option<&[usize]>,
    ) -> Result<EmbeddingResult> {
        let key = request.basis.key();
        let column = cache.get(&key).ok_or_else(|| missing(&key))?;
        let vector = Vector::new(key.clone(), column.clone());
        let coordinates = match indices {
            Some(indices) => vector.slice(indices.to_vec()).as_array(),
            None => vector.as_array(),
        };
        let bins = request
            .basis
            .client_bins()
            .map(|nbins| {
                bin_embedding(
                    &column,
                    nbins,
                    request.basis.agg,
                    values,
                    &request.measures,
                    indices,
                )
            })
            .transpose()?;
        Ok(EmbeddingResult {
            name: request.basis.name.clone(),
            key,
            coordinates,
            bins,
        })
    }
}

fn missing(key: &str) -> Error {
    err_kind(ErrorKind::Query, format!("column '{}' missing after fetch", key))
}
