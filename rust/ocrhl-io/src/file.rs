use std::{
    fs::File,
    io::Write,
    ops::Range,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use bytes::{Bytes, BytesMut};

use crate::{ReadAt, SealingWrite, StorageProfile, verify};

/// Positional reader over a local file.
///
/// The file handle is shared, so clones of the same `Arc<FileReader>` can serve
/// independent readers (one per highlighting request) without reopening the file.
pub struct FileReader {
    file: Arc<File>,
    path: Option<PathBuf>,
    size: OnceLock<u64>,
}

impl FileReader {
    pub fn new(file: impl Into<Arc<File>>) -> FileReader {
        FileReader {
            file: file.into(),
            path: None,
            size: Default::default(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<FileReader> {
        let path = path.as_ref();
        Ok(FileReader {
            file: Arc::new(File::open(path)?),
            path: Some(path.to_path_buf()),
            size: Default::default(),
        })
    }

    /// The path this reader was opened from, if known.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl FileReader {
    /// Source files are immutable while indexed, so the size is read once.
    fn cached_size(&self) -> std::io::Result<u64> {
        match self.size.get() {
            Some(&size) => Ok(size),
            None => {
                let size = self.file.metadata()?.len();
                Ok(*self.size.get_or_init(|| size))
            }
        }
    }
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        self.cached_size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let end = range.end.min(self.cached_size()?);
        if range.start >= end {
            return Ok(Bytes::new());
        }
        let mut buf = BytesMut::zeroed((end - range.start) as usize);
        file_read_at_exact(&self.file, range.start, &mut buf)?;
        Ok(buf.freeze())
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 16 * 1024,
            max_io_size: 1024 * 1024,
        }
    }
}

/// Writes a page index (or any sealed artifact) to a new local file.
///
/// The handle is dropped on `seal()`; writing afterwards fails.
pub struct FileWriter {
    file: Option<File>,
}

impl FileWriter {
    pub fn new(file: File) -> FileWriter {
        FileWriter { file: Some(file) }
    }

    /// Creates the file, failing if it already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> std::io::Result<FileWriter> {
        Ok(FileWriter::new(File::create_new(path)?))
    }

    fn open_file(&mut self) -> std::io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file writer is already sealed"))
    }
}

impl SealingWrite for FileWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.open_file()?.write_all(buf)
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let file = self.open_file()?;
        file.flush()?;
        file.sync_all()?;
        self.file = None;
        Ok(())
    }

    fn storage_profile(&self) -> StorageProfile {
        Default::default()
    }
}

#[cfg(unix)]
pub fn file_read_at_exact(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)
}

#[cfg(windows)]
pub fn file_read_at_exact(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, pos) {
            Ok(0) => break,
            Ok(n) => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
            Err(e) => return Err(e),
        }
    }
    if !buf.is_empty() {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        ReadAt, SealingWrite,
        file::{FileReader, FileWriter},
    };

    #[test]
    fn test_file_reader_and_writer() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("page.xml");
        let mut writer = FileWriter::create(&path).expect("create file");
        for _ in 0..10 {
            writer.write_all(b"<w>abcd</w>").expect("write_all");
        }
        writer.seal().expect("seal");

        let reader = FileReader::open(&path).expect("open file");
        assert_eq!(reader.size().unwrap(), 110);
        assert_eq!(reader.path(), Some(path.as_path()));
        for pos in (0..110).step_by(11) {
            let buf = reader.read_at(pos + 3..pos + 7).expect("read_at");
            assert_eq!(buf.as_ref(), b"abcd");
        }
    }

    #[test]
    fn test_file_reader_clamps_to_size() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("short.xml");
        std::fs::write(&path, b"<l/>").unwrap();

        let reader = FileReader::open(&path).unwrap();
        assert_eq!(reader.read_at(2..100).unwrap().as_ref(), b"/>");
        assert!(reader.read_at(4..10).unwrap().is_empty());
        assert!(reader.read_at(3..2).is_err());
    }

    #[test]
    fn test_file_writer_rejects_existing_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("exists.idx");
        std::fs::write(&path, b"x").unwrap();
        assert!(FileWriter::create(&path).is_err());
    }

    #[test]
    fn test_write_after_seal_fails() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let mut writer = FileWriter::create(tempdir.path().join("sealed.idx")).unwrap();
        writer.write_all(b"OCRIDX").unwrap();
        writer.seal().unwrap();
        assert!(writer.write_all(b"more").is_err());
        assert!(writer.seal().is_err());
    }
}
