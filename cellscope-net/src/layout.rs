use cellscope_lang::Format;

// In a JSONL blob the schema is stored as an ordinary record under this key.
pub const SCHEMA_KEY: &str = "schema";

// Where a dataset's resources live, derived from the URL it was opened with.
//
// A `.jsonl` / `.jsonl.gz` URL names one combined blob plus a sidecar
// `<url>.idx.json` holding the byte range of every record in it. Anything
// else is a directory of `<key>.json` files next to a `schema.json`, unless
// the URL already names the schema file itself.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Layout {
    Json {
        base_url: String,
        schema_url: String,
    },
    Jsonl {
        base_url: String,
        blob_url: String,
        index_url: String,
    },
}

pub fn base_url_of(url: &str) -> String {
    match url.rfind('/') {
        Some(i) => url[..=i].to_string(),
        None => String::new(),
    }
}

impl Layout {
    pub fn from_url(url: &str) -> Layout {
        let base_url = base_url_of(url);
        if url.ends_with(".jsonl") || url.ends_with(".jsonl.gz") {
            Layout::Jsonl {
                base_url,
                blob_url: url.to_string(),
                index_url: format!("{}.idx.json", url),
            }
        } else if url.ends_with(".json") || url.ends_with(".json.gz") {
            Layout::Json {
                base_url,
                schema_url: url.to_string(),
            }
        } else {
            let schema_url = format!("{}schema.json", base_url);
            Layout::Json {
                base_url,
                schema_url,
            }
        }
    }

    pub fn format(&self) -> Format {
        match self {
            Layout::Json { .. } => Format::Json,
            Layout::Jsonl { .. } => Format::Jsonl,
        }
    }

    pub fn base_url(&self) -> &str {
        match self {
            Layout::Json { base_url, .. } | Layout::Jsonl { base_url, .. } => base_url,
        }
    }

    // Only meaningful in JSON mode; JSONL columns are ranges of the blob.
    pub fn column_url(&self, key: &str) -> String {
        format!("{}{}.json", self.base_url(), key)
    }

    pub fn job_url(&self, id: &str) -> String {
        format!("{}uns/{}.json", self.base_url(), id)
    }
}
