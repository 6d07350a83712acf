//! In-memory object store.
//!
//! Serves byte ranges of blobs keyed by URL, with any scheme. It stands in for a
//! remote object service: callers only ever see `ReadAt` handles, never local paths.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use bytes::Bytes;
use ocrhl_io::{ReadAt, SealingWrite, StorageProfile};

use crate::{ObjectStore, url::ObjectUrl};

#[derive(Default, Clone)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<ObjectUrl, Bytes>>>,
}

impl MemoryObjectStore {
    pub fn new() -> MemoryObjectStore {
        Default::default()
    }

    /// Stores `data` under `url`, replacing any previous object.
    pub fn put(&self, url: ObjectUrl, data: impl Into<Bytes>) {
        self.lock().insert(url, data.into());
    }

    pub fn contains(&self, url: &ObjectUrl) -> bool {
        self.lock().contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObjectUrl, Bytes>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ObjectStore for MemoryObjectStore {
    fn open(&self, url: &ObjectUrl) -> std::io::Result<Arc<dyn ReadAt>> {
        let data = self.lock().get(url).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, url.as_str().to_string())
        })?;
        Ok(Arc::new(RangeReader { data }))
    }

    fn create(&self, url: &ObjectUrl) -> std::io::Result<Box<dyn SealingWrite>> {
        if self.contains(url) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                url.as_str().to_string(),
            ));
        }
        Ok(Box::new(MemoryObjectWriter {
            store: self.clone(),
            url: Some(url.clone()),
            buf: Vec::new(),
        }))
    }
}

/// Range reader that reports a remote-like storage profile, so that readers above
/// it size their requests the way they would against an object service.
struct RangeReader {
    data: Bytes,
}

impl ReadAt for RangeReader {
    fn size(&self) -> std::io::Result<u64> {
        self.data.size()
    }

    fn read_at(&self, range: std::ops::Range<u64>) -> std::io::Result<Bytes> {
        self.data.read_at(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 64 * 1024,
            max_io_size: 8 * 1024 * 1024,
        }
    }
}

/// Buffers writes and publishes the object on `seal()`.
struct MemoryObjectWriter {
    store: MemoryObjectStore,
    url: Option<ObjectUrl>,
    buf: Vec<u8>,
}

impl SealingWrite for MemoryObjectWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        if self.url.is_none() {
            return Err(std::io::Error::other("object already sealed"));
        }
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let url = self
            .url
            .take()
            .ok_or_else(|| std::io::Error::other("object already sealed"))?;
        self.store.put(url, std::mem::take(&mut self.buf));
        Ok(())
    }

    fn storage_profile(&self) -> StorageProfile {
        Default::default()
    }
}

#[cfg(test)]
mod tests {
    use crate::{ObjectStore, url::ObjectUrl};

    use super::MemoryObjectStore;

    #[test]
    fn test_put_and_open() {
        let store = MemoryObjectStore::new();
        let url = ObjectUrl::parse("s3://books/vol1.hocr").unwrap();
        store.put(url.clone(), &b"<div class='ocr_page'></div>"[..]);
        assert!(store.contains(&url));

        let reader = store.open(&url).unwrap();
        assert_eq!(reader.size().unwrap(), 28);
        assert_eq!(reader.read_at(12..20).unwrap().as_ref(), b"ocr_page");
        assert_eq!(reader.storage_profile().min_io_size, 64 * 1024);

        let missing = ObjectUrl::parse("s3://books/vol2.hocr").unwrap();
        assert_eq!(
            store.open(&missing).err().unwrap().kind(),
            std::io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_object_visible_after_seal() {
        let store = MemoryObjectStore::new();
        let url = ObjectUrl::parse("mem://idx/vol1.idx").unwrap();
        let mut writer = store.create(&url).unwrap();
        writer.write_all(b"OCRIDX").unwrap();
        assert!(!store.contains(&url));
        writer.seal().unwrap();
        assert!(writer.write_all(b"x").is_err());

        assert_eq!(store.len(), 1);
        assert_eq!(store.open(&url).unwrap().read_at(0..6).unwrap().as_ref(), b"OCRIDX");
        assert!(store.create(&url).is_err());
    }
}
