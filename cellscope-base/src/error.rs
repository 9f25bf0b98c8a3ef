// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A coarse kind, so a caller can tell a dead dataset (schema) from one bad column

use std::borrow::Cow;
use backtrace_error::DynBacktraceError;
use tracing::error;

#[cfg(test)]
use test_log::test;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind {
    // Schema or byte-range index missing or malformed; the session is unusable.
    Schema,
    // A single read failed: network, HTTP status, or a key absent from the index.
    Fetch,
    // A payload arrived but does not decode into a column.
    Decode,
    // The query itself is malformed or names something that does not exist.
    Query,
    Other,
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(ErrorKind::Other, err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.msg)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(kind: ErrorKind, err: E) -> Error {
        error!(target: "cellscope", kind = ?kind, "{:?}", err);
        let msg = err.to_string();
        let inner = DynBacktraceError::from(err);
        Error { kind, msg, inner }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    // Reclassify an error picked up from a lower layer, eg. a fetch failure
    // that happened while loading the schema is a schema failure. The
    // original backtrace is kept.
    pub fn with_kind(mut self, kind: ErrorKind) -> Error {
        self.kind = kind;
        self
    }

    // Errors are not Clone (backtraces aren't), so a failure shared between
    // several waiters is re-raised as a fresh error with the same kind and text.
    pub fn reraise(&self) -> Error {
        err_kind(self.kind, self.msg.clone())
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    err_kind(ErrorKind::Other, msg)
}

pub fn err_kind(kind: ErrorKind, msg: impl Into<Cow<'static, str>>) -> Error {
    let err = SimpleErr(msg.into());
    Error::new(kind, err)
}

#[test]
fn test_error() {
    let _err = err("test error");
}

#[test]
fn test_error_kind_and_reraise() {
    let e = err_kind(ErrorKind::Fetch, "key not found: CD14");
    assert_eq!(e.kind(), ErrorKind::Fetch);
    assert_eq!(e.message(), "key not found: CD14");
    let again = e.reraise();
    assert_eq!(again.kind(), ErrorKind::Fetch);
    assert_eq!(again.to_string(), "Fetch: key not found: CD14");
    assert_eq!(again.with_kind(ErrorKind::Schema).kind(), ErrorKind::Schema);
}

#[test]
fn test_error_from_library_error() {
    fn parse() -> Result<i64> {
        Ok("twelve".parse::<i64>()?)
    }
    let e = parse().unwrap_err();
    assert_eq!(e.kind(), ErrorKind::Other);
}
