//! # Blob Storage
//!
//! Byte-level access to the place datasets live. The loader only needs
//! `read`; `write` backs the upload path.
//!
//! Three stores ship with the crate:
//! - [`LocalBlobStore`]: a directory on disk
//! - [`HttpBlobStore`]: an Azure-style container over HTTP
//! - [`MemoryBlobStore`]: process memory

mod backend;
mod errors;
mod http;
mod local;
mod memory;

pub use backend::BlobStore;
pub use errors::{BlobError, BlobResult};
pub use http::HttpBlobStore;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
