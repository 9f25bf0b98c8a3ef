use crate::basis::Basis;
use crate::filter::Filter;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Fields {
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
}

impl Fields {
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty() && self.measures.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(flatten)]
    pub basis: Basis,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
}

impl EmbeddingRequest {
    pub fn new(basis: Basis) -> Self {
        EmbeddingRequest {
            basis,
            dimensions: Vec::new(),
            measures: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default)]
    pub embeddings: Vec<EmbeddingRequest>,
    #[serde(default)]
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub measures: Vec<String>,
}

// Everything one round of the UI wants from the dataset. Each part is
// optional and independently adds to the set of columns that must be loaded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub embedding: Vec<EmbeddingRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Fields>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped_stats: Option<Fields>,
}
