//! Opening the file sources of a pointer.

use std::{path::Path, sync::Arc};

use ocrhl_common::error::Error;
use ocrhl_io::{FileReader, ReadAt};
use ocrhl_io_impl::PageCacheWarmer;
use ocrhl_objectstore::{LocalFsObjectStore, ObjectStore, url::ObjectUrl};

use crate::{
    options::SourceReaderOptions,
    pointer::{FileSource, SourcePointer},
    reader::SourceReader,
};

/// Turns source pointers into `SourceReader`s.
///
/// Local paths are opened directly; URL paths go through the configured object
/// store. The resolver holds only read-only configuration and may be shared
/// across threads, while every reader it returns belongs to one request.
#[derive(Clone)]
pub struct SourceResolver {
    store: Arc<dyn ObjectStore>,
    options: SourceReaderOptions,
}

impl SourceResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> SourceResolver {
        SourceResolver {
            store,
            options: Default::default(),
        }
    }

    pub fn with_options(mut self, options: SourceReaderOptions) -> SourceResolver {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SourceReaderOptions {
        &self.options
    }

    /// Parses `pointer` and opens a reader over it.
    pub fn open_str(&self, pointer: &str) -> ocrhl_common::Result<SourceReader> {
        self.open(SourcePointer::parse(pointer)?)
    }

    /// Opens a reader over a single local file.
    pub fn open_path(&self, path: impl AsRef<Path>) -> ocrhl_common::Result<SourceReader> {
        self.open(SourcePointer::single(FileSource::new(
            path.as_ref().to_string_lossy(),
        )))
    }

    /// Opens every file source of `pointer` and lays them out in one reader.
    ///
    /// Fails fast when any source is missing or empty.
    pub fn open(&self, pointer: SourcePointer) -> ocrhl_common::Result<SourceReader> {
        let readers = pointer
            .sources
            .iter()
            .map(|source| self.open_source(source))
            .collect::<ocrhl_common::Result<Vec<_>>>()?;
        SourceReader::from_sources(pointer, readers, self.options.clone())
    }

    /// Opens the raw reader of one file source.
    pub fn open_source(&self, source: &FileSource) -> ocrhl_common::Result<Arc<dyn ReadAt>> {
        let result = if source.is_url() {
            let url = ObjectUrl::parse(&source.path)?;
            self.store.open(&url)
        } else {
            FileReader::open(&source.path).map(|r| Arc::new(r) as Arc<dyn ReadAt>)
        };
        let reader = result.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found(&source.path),
            _ => Error::io(&source.path, e),
        })?;
        let size = reader.size().map_err(|e| Error::io(&source.path, e))?;
        if size == 0 {
            return Err(Error::empty_source(&source.path));
        }
        Ok(reader)
    }

    /// Schedules a read-ahead of the regions of every file source of `pointer`.
    ///
    /// Jobs are keyed by the file source's textual form, so they can be cancelled
    /// through `warmer.cancel(&source.to_string())`. Sources that fail to open
    /// are skipped. Returns the number of scheduled jobs.
    pub fn warm(&self, pointer: &SourcePointer, warmer: &PageCacheWarmer) -> usize {
        let mut scheduled = 0;
        for source in &pointer.sources {
            let reader = match self.open_source(source) {
                Ok(reader) => reader,
                Err(e) => {
                    log::debug!("not prefetching '{source}': {e}");
                    continue;
                }
            };
            let size = reader.size().unwrap_or(0);
            let ranges = if source.regions.is_empty() {
                vec![0..size]
            } else {
                source
                    .regions
                    .iter()
                    .map(|r| r.start..r.end.unwrap_or(size).min(size))
                    .collect()
            };
            if warmer.prefetch(source.to_string(), reader, ranges) {
                scheduled += 1;
            }
        }
        scheduled
    }
}

impl Default for SourceResolver {
    fn default() -> Self {
        SourceResolver::new(Arc::new(LocalFsObjectStore::new_unscoped()))
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use ocrhl_common::error::ErrorKind;
    use ocrhl_io_impl::{IoPool, PageCacheWarmer};
    use ocrhl_objectstore::{MemoryObjectStore, url::ObjectUrl};

    use super::SourceResolver;
    use crate::{SourcePointer, options::SourceReaderOptions};

    #[test]
    fn test_open_concatenated_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.xml");
        let b = dir.path().join("b.xml");
        std::fs::write(&a, b"<alto><Page ID=\"p1\"/>").unwrap();
        std::fs::write(&b, b"<Page ID=\"p2\"/></alto>").unwrap();

        let resolver = SourceResolver::default()
            .with_options(SourceReaderOptions::default().with_section_size(16));
        let pointer = format!("{}+{}[0:14]", a.display(), b.display());
        let reader = resolver.open_str(&pointer).unwrap();
        assert_eq!(reader.len(), 21 + 14);
        assert_eq!(reader.read_ascii_string(19, 6).unwrap(), "/><Pag");
        assert_eq!(reader.pointer().sources.len(), 2);
    }

    #[test]
    fn test_missing_and_empty_sources() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.xml");
        std::fs::write(&empty, b"").unwrap();
        let missing = dir.path().join("missing.xml");

        let resolver = SourceResolver::default();
        let err = resolver.open_path(&missing).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
        assert!(err.is_document_scoped());

        let err = resolver.open_path(&empty).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::EmptySource { .. }));

        let err = resolver.open_str("/a.xml[5:1]").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Malformed { .. }));
    }

    #[test]
    fn test_open_from_object_store() {
        let store = MemoryObjectStore::new();
        store.put(
            ObjectUrl::parse("s3://books/vol1.hocr").unwrap(),
            &b"<div class='ocr_page' title='bbox 0 0 10 10'>"[..],
        );
        let resolver = SourceResolver::new(Arc::new(store));
        let reader = resolver.open_str("s3://books/vol1.hocr[5:20]").unwrap();
        assert_eq!(reader.read_ascii_string(0, 15).unwrap(), "class='ocr_page");

        let err = resolver.open_str("s3://books/vol2.hocr").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
    }

    #[test]
    fn test_warm_schedules_each_source() {
        let store = MemoryObjectStore::new();
        store.put(ObjectUrl::parse("mem://b/one.xml").unwrap(), vec![b' '; 1000]);
        store.put(ObjectUrl::parse("mem://b/two.xml").unwrap(), vec![b' '; 10]);
        let resolver = SourceResolver::new(Arc::new(store));
        let warmer = PageCacheWarmer::new(IoPool::with_limits(1, 8).unwrap());

        let pointer =
            SourcePointer::parse("mem://b/one.xml[0:500]+mem://b/two.xml+mem://b/three.xml")
                .unwrap();
        assert_eq!(resolver.warm(&pointer, &warmer), 2);

        let deadline = Instant::now() + Duration::from_secs(10);
        while warmer.stats().completed < 2 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(warmer.stats().completed, 2);
        assert!(!warmer.is_pending("mem://b/two.xml"));
    }
}
