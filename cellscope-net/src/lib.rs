// Everything between a column key and the bytes that hold it: where a
// dataset's files live, how to ask for them, and what comes back.

mod file;
mod index;
mod layout;
mod mem;
mod transport;
mod wire;

#[cfg(test)]
mod test;

pub use file::FileTransport;
pub use index::{ByteRange, ByteRangeIndex};
pub use layout::{base_url_of, Layout, SCHEMA_KEY};
pub use mem::MemTransport;
pub use transport::{HttpConfig, HttpTransport, Transport};
pub use wire::Payload;
