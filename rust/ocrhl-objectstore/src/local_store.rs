use std::{
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use ocrhl_common::error::Error;
use ocrhl_io::{FileReader, FileWriter, ReadAt, SealingWrite};

use crate::{ObjectStore, url::ObjectUrl};

/// An object store over the local filesystem, confined to a container directory.
///
/// In `Passthrough` mode URLs are absolute `file://` URLs on the host and must lie
/// within the container. In `VirtualRoot` mode the URL path is taken relative to
/// the container, which becomes the root of the store.
pub struct LocalFsObjectStore {
    container_path: PathBuf,
    container_url: ObjectUrl,
    mode: LocalFsMode,
}

impl LocalFsObjectStore {
    /// Creates a store rooted at `container_path`, creating the directory if needed.
    pub fn new(
        container_path: &Path,
        mode: LocalFsMode,
    ) -> ocrhl_common::Result<LocalFsObjectStore> {
        let url = ::url::Url::from_directory_path(container_path).map_err(|()| {
            Error::invalid_arg(
                "container",
                format!("invalid path {container_path:?} for local object store"),
            )
        })?;
        let container_url = ObjectUrl::new(url)?;
        std::fs::create_dir_all(container_path)
            .map_err(|e| Error::io(container_path.to_string_lossy(), e))?;
        Ok(LocalFsObjectStore {
            container_path: container_path.to_path_buf(),
            container_url,
            mode,
        })
    }

    /// A passthrough store over the whole filesystem (`file:///`).
    pub fn new_unscoped() -> LocalFsObjectStore {
        LocalFsObjectStore {
            container_path: PathBuf::from("/"),
            container_url: ObjectUrl::parse("file:///").expect("parse unscoped"),
            mode: LocalFsMode::Passthrough,
        }
    }

    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    pub fn container_url(&self) -> &ObjectUrl {
        &self.container_url
    }

    pub fn mode(&self) -> LocalFsMode {
        self.mode
    }

    /// Maps an object URL to a path under the container.
    pub fn url_to_path(&self, url: &ObjectUrl) -> ocrhl_common::Result<PathBuf> {
        if url.scheme() != "file" {
            return Err(Error::unsupported(format!(
                "local object store cannot serve '{url}'"
            )));
        }
        let file_url = match self.mode {
            LocalFsMode::Passthrough => {
                let relative_path = self.container_url.make_relative(url).ok_or_else(|| {
                    Error::invalid_arg(
                        "url",
                        format!("'{url}' is outside of the local fs container"),
                    )
                })?;
                if relative_path.is_empty() {
                    return Err(Error::invalid_arg("url", format!("'{url}' names no object")));
                }
                url.clone().into_inner()
            }
            LocalFsMode::VirtualRoot => {
                let relative_path = url.path().trim_start_matches('/');
                if relative_path.is_empty() {
                    return Err(Error::invalid_arg("url", format!("'{url}' names no object")));
                }
                self.container_url.join(relative_path).map_err(|e| {
                    Error::invalid_arg("url", format!("'{url}' cannot be placed in the container: {e}"))
                })?
            }
        };
        let path = file_url.to_file_path().map_err(|()| {
            Error::invalid_arg("url", format!("'{url}' is not a local file path"))
        })?;
        // an encoded "../" decodes into a parent reference
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(Error::invalid_arg(
                "url",
                format!("'{url}' escapes the local fs container"),
            ));
        }
        Ok(path)
    }
}

impl ObjectStore for LocalFsObjectStore {
    fn open(&self, url: &ObjectUrl) -> std::io::Result<Arc<dyn ReadAt>> {
        let path = self.url_to_path(url).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("open: {e}"))
        })?;
        log::trace!("local store: opening {path:?}");
        Ok(Arc::new(FileReader::open(path)?))
    }

    fn create(&self, url: &ObjectUrl) -> std::io::Result<Box<dyn SealingWrite>> {
        let path = self.url_to_path(url).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, format!("create: {e}"))
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Box::new(FileWriter::create(path)?))
    }
}

/// How `LocalFsObjectStore` interprets object URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalFsMode {
    /// URLs are host paths, required to reside within the container.
    Passthrough,
    /// The container acts as the root; URL paths are relative to it.
    VirtualRoot,
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::{ObjectStore, url::ObjectUrl};

    use super::{LocalFsMode, LocalFsObjectStore};

    fn create_temp_fs(mode: LocalFsMode) -> (LocalFsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let fs = LocalFsObjectStore::new(dir.path(), mode).unwrap();
        (fs, dir)
    }

    #[test]
    fn test_passthrough_mode() {
        let (fs, dir) = create_temp_fs(LocalFsMode::Passthrough);
        let (_fs2, dir2) = create_temp_fs(LocalFsMode::Passthrough);

        let file_path = dir.path().join("vol1").join("page 1.hocr");
        let file_url = ObjectUrl::from_file_path(&file_path).unwrap();
        let mut writer = fs.create(&file_url).unwrap();
        writer.write_all(b"<div class='ocr_page'>").unwrap();
        writer.seal().unwrap();
        assert!(file_path.is_file());
        assert_eq!(fs.url_to_path(&file_url).unwrap(), file_path);

        let reader = fs.open(&file_url).unwrap();
        assert_eq!(reader.read_at(5..10).unwrap().as_ref(), b"class");

        let outside = ObjectUrl::from_file_path(&dir2.path().join("x.xml")).unwrap();
        assert!(fs.create(&outside).is_err());
        assert!(fs.open(&outside).is_err());
    }

    #[test]
    fn test_virtual_root_mode() {
        let (fs, dir) = create_temp_fs(LocalFsMode::VirtualRoot);
        let url = ObjectUrl::parse("file:///alto/vol2.xml").unwrap();
        let mut writer = fs.create(&url).unwrap();
        writer.write_all(b"<alto/>").unwrap();
        writer.seal().unwrap();
        assert!(dir.path().join("alto").join("vol2.xml").is_file());

        let reader = fs.open(&url).unwrap();
        assert_eq!(reader.size().unwrap(), 7);

        let root = ObjectUrl::parse("file:///").unwrap();
        assert!(fs.create(&root).is_err());
    }

    #[test]
    fn test_percent_encoded_names() {
        let (fs, dir) = create_temp_fs(LocalFsMode::VirtualRoot);
        let url = ObjectUrl::parse("file:///vol%203/page%201.xml").unwrap();
        assert_eq!(
            fs.url_to_path(&url).unwrap(),
            dir.path().join("vol 3").join("page 1.xml")
        );
        let mut writer = fs.create(&url).unwrap();
        writer.write_all(b"<alto/>").unwrap();
        writer.seal().unwrap();
        assert!(dir.path().join("vol 3").join("page 1.xml").is_file());

        let escaping = ObjectUrl::parse("file:///%2e%2e%2fother.xml").unwrap();
        assert!(fs.url_to_path(&escaping).is_err());

        let (fs, dir) = create_temp_fs(LocalFsMode::Passthrough);
        let path = dir.path().join("a b%.xml");
        let url = ObjectUrl::from_file_path(&path).unwrap();
        assert!(url.as_str().ends_with("a%20b%25.xml"));
        assert_eq!(fs.url_to_path(&url).unwrap(), path);
    }

    #[test]
    fn test_missing_object_is_not_found() {
        let (fs, dir) = create_temp_fs(LocalFsMode::Passthrough);
        let url = ObjectUrl::from_file_path(&dir.path().join("missing.xml")).unwrap();
        let err = fs.open(&url).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn test_unscoped_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("mini.xml");
        std::fs::write(&path, b"<p xml:id=\"p1\"/>").unwrap();

        let fs = LocalFsObjectStore::new_unscoped();
        let url = ObjectUrl::from_file_path(&path).unwrap();
        let reader = fs.open(&url).unwrap();
        assert_eq!(reader.read_at(0..2).unwrap().as_ref(), b"<p");

        let remote = ObjectUrl::parse("s3://bucket/mini.xml").unwrap();
        assert!(fs.open(&remote).is_err());
    }
}
