mod error;
mod rowset;


pub use error::{err, err_kind, Error, ErrorKind, Result};
pub use rowset::RowSet;
