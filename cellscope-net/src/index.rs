use cellscope_base::{err_kind, Error, ErrorKind, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// An inclusive byte range, as in an HTTP `Range: bytes=<start>-<end>` header.
/// Never empty: `start <= end` always holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ByteRange {
    start: u64,
    end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if end < start {
            return Err(err_kind(
                ErrorKind::Fetch,
                format!("byte range {}-{} ends before it starts", start, end),
            ));
        }
        Ok(ByteRange { start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }

    // Cut this range out of a whole object, for servers (or files) that
    // hand back everything.
    pub fn slice<'a>(&self, bytes: &'a [u8]) -> Result<&'a [u8]> {
        let lo = usize::try_from(self.start)?;
        let hi = usize::try_from(self.end)?;
        bytes.get(lo..=hi).ok_or_else(|| {
            err_kind(
                ErrorKind::Fetch,
                format!("range {} not satisfiable for {} bytes", self.header_value(), bytes.len()),
            )
        })
    }
}

#[derive(Deserialize)]
struct IndexFile {
    index: HashMap<String, [u64; 2]>,
}

// The sidecar `<blob>.idx.json` of a JSONL dataset: `{index: {key: [start, end]}}`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ByteRangeIndex {
    ranges: HashMap<String, ByteRange>,
}

impl ByteRangeIndex {
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let file: IndexFile =
            serde_json::from_slice(bytes).map_err(|e| Error::new(ErrorKind::Schema, e))?;
        let mut ranges = HashMap::with_capacity(file.index.len());
        for (key, [start, end]) in file.index {
            let range = ByteRange::new(start, end).map_err(|e| {
                err_kind(ErrorKind::Schema, format!("index entry '{}': {}", key, e))
            })?;
            ranges.insert(key, range);
        }
        Ok(ByteRangeIndex { ranges })
    }

    pub fn range(&self, key: &str) -> Result<ByteRange> {
        self.ranges
            .get(key)
            .copied()
            .ok_or_else(|| err_kind(ErrorKind::Fetch, format!("key not found: {}", key)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ranges.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
