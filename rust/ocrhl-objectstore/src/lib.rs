//! *Object Store* abstraction: a storage service client that issues readers and
//! writers for objects addressed by URL.
//!
//! OCR sources given as URLs (rather than plain local paths) are opened through an
//! `ObjectStore`. The store only needs to serve byte ranges; how it talks to the
//! backing service is its own business.

pub mod local_store;
pub mod memory_store;
pub mod url;

use std::sync::Arc;

use ocrhl_io::{ReadAt, SealingWrite};
use url::ObjectUrl;

pub use local_store::{LocalFsMode, LocalFsObjectStore};
pub use memory_store::MemoryObjectStore;

/// A storage service capable of opening existing objects for positional reads and
/// creating new objects.
pub trait ObjectStore: Send + Sync + 'static {
    /// Opens a reader for an existing object.
    ///
    /// A missing object is reported with `std::io::ErrorKind::NotFound`.
    fn open(&self, url: &ObjectUrl) -> std::io::Result<Arc<dyn ReadAt>>;

    /// Creates a writer for a new object at the specified URL.
    fn create(&self, url: &ObjectUrl) -> std::io::Result<Box<dyn SealingWrite>>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn open(&self, url: &ObjectUrl) -> std::io::Result<Arc<dyn ReadAt>> {
        self.as_ref().open(url)
    }

    fn create(&self, url: &ObjectUrl) -> std::io::Result<Box<dyn SealingWrite>> {
        self.as_ref().create(url)
    }
}
