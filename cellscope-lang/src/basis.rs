use serde::{Deserialize, Serialize};

// How values falling in the same embedding bin are combined.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agg {
    #[default]
    Max,
    Min,
    Mean,
    Sum,
    Count,
}

impl std::fmt::Display for Agg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Agg::Max => "max",
            Agg::Min => "min",
            Agg::Mean => "mean",
            Agg::Sum => "sum",
            Agg::Count => "count",
        };
        f.write_str(s)
    }
}

fn two() -> u8 {
    2
}

/// A request for one embedding of the rows, plus how it should be binned.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Basis {
    pub name: String,
    #[serde(default = "two")]
    pub ndim: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbins: Option<u32>,
    #[serde(default)]
    pub agg: Agg,
    #[serde(default)]
    pub precomputed: bool,
}

impl Basis {
    pub fn new(name: impl Into<String>) -> Self {
        Basis {
            name: name.into(),
            ndim: 2,
            nbins: None,
            agg: Agg::default(),
            precomputed: false,
        }
    }

    /// The column key holding this embedding's coordinates. Precomputed
    /// binnings are separate columns, one per bin count and aggregation.
    pub fn key(&self) -> String {
        match (self.precomputed, self.nbins) {
            (true, Some(nbins)) => format!("{}_{}_{}_{}", self.name, self.ndim, nbins, self.agg),
            _ => format!("{}_{}", self.name, self.ndim),
        }
    }

    /// Binning still to be done client-side, if any.
    pub fn client_bins(&self) -> Option<u32> {
        if self.precomputed {
            None
        } else {
            self.nbins.filter(|n| *n > 0)
        }
    }
}
