use crate::basis::Agg;
use cellscope_base::{err_kind, ErrorKind, Result};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Jsonl,
}

// Continuous features are "X" measures; categorical ones are "obs" metadata.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Continuous,
    Categorical,
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct PrecomputedBins {
    pub nbins: u32,
    #[serde(default)]
    pub agg: Agg,
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BasisInfo {
    pub name: String,
    #[serde(default = "two")]
    pub dimensions: u8,
    #[serde(default)]
    pub precomputed: Vec<PrecomputedBins>,
}

fn two() -> u8 {
    2
}

// Dataset-level metadata. Loaded once per session and never changed.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub shape: Vec<usize>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default, alias = "embeddings")]
    pub bases: Vec<BasisInfo>,
    #[serde(default)]
    pub format: Format,
}

impl Schema {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Schema> {
        let schema: Schema = serde_json::from_slice(bytes)
            .map_err(|e| cellscope_base::Error::new(ErrorKind::Schema, e))?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        if self.shape.is_empty() {
            return Err(err_kind(ErrorKind::Schema, "schema has an empty shape"));
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn feature_kind(&self, name: &str) -> Option<FeatureKind> {
        self.features.iter().find(|f| f.name == name).map(|f| f.kind)
    }

    // Names the schema does not know are treated as continuous measures.
    pub fn is_categorical(&self, name: &str) -> bool {
        self.feature_kind(name) == Some(FeatureKind::Categorical)
    }

    pub fn basis(&self, name: &str) -> Option<&BasisInfo> {
        self.bases.iter().find(|b| b.name == name)
    }
}
