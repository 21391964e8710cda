//! File share access
//!
//! Addressing, chunk planning, response decoding, the typed protocol
//! client and the tree operations built on top of it.

pub mod address;
pub mod chunk;
pub mod client;
pub mod entry;
pub mod manager;
pub mod operations;
pub mod path;
pub mod transport;
pub mod xml;

#[cfg(test)]
pub mod testing;

pub use address::{RemoteLocation, Reference};
pub use chunk::{plan, ByteRange};
pub use client::ShareClient;
pub use entry::{DirectoryEntry, DirectoryListing, EntryKind};
pub use manager::{DeleteOutcome, DownloadReport, ShareManager, UploadReport};
pub use path::RemotePath;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, StreamingResponse, Transport};
