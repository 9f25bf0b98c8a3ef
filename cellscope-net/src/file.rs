use crate::{index::ByteRange, transport::Transport};
use cellscope_base::{Error, ErrorKind, Result};
use std::{io::SeekFrom, path::PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

// Serves a dataset from the local filesystem. URLs are either `file://`
// URLs or plain paths; relative paths resolve against `root` when set.
#[derive(Clone, Debug, Default)]
pub struct FileTransport {
    root: Option<PathBuf>,
}

impl FileTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        FileTransport {
            root: Some(root.into()),
        }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

fn fetch_err(e: std::io::Error) -> Error {
    Error::new(ErrorKind::Fetch, e)
}

impl Transport for FileTransport {
    async fn get(&self, url: &str, range: Option<ByteRange>) -> Result<Vec<u8>> {
        let path = self.path_for(url);
        let mut file = tokio::fs::File::open(&path).await.map_err(fetch_err)?;
        let mut buf = Vec::new();
        match range {
            None => {
                file.read_to_end(&mut buf).await.map_err(fetch_err)?;
            }
            Some(r) => {
                file.seek(SeekFrom::Start(r.start())).await.map_err(fetch_err)?;
                buf.resize(usize::try_from(r.len())?, 0);
                file.read_exact(&mut buf).await.map_err(fetch_err)?;
            }
        }
        Ok(buf)
    }
}
