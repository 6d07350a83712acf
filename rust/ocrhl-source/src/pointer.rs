//! Source pointers: where the bytes of an OCR document live.
//!
//! The textual form is
//!
//! ```text
//! pointer  := source ( "+" source )*
//! source   := path [ "{ascii}" ] [ "[" region ( "," region )* "]" ]
//! region   := [ start ] ":" [ end ]
//! ```
//!
//! `:end` reads from the beginning of the file, `start:` reads to its end. A path
//! with a URL scheme (`s3://...`, `file:///...`) is opened through an object store,
//! anything else is a local filesystem path. The sources of a pointer are
//! concatenated, in order, into one logical byte space.

use std::{fmt, str::FromStr};

use ocrhl_common::error::Error;
use ocrhl_objectstore::url::has_scheme;

const ASCII_MARKER: &str = "{ascii}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePointer {
    pub sources: Vec<FileSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    /// Local path or object URL.
    pub path: String,
    /// Byte regions to read, sorted and non-overlapping. Empty means the whole file.
    pub regions: Vec<Region>,
    /// The bytes are known to be pure ASCII.
    pub is_ascii: bool,
}

/// A physical byte range `[start, end)` of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub start: u64,
    /// `None` extends the region to the end of the file.
    pub end: Option<u64>,
    /// Logical offset at which the region's first byte is reported.
    ///
    /// When absent, the region directly follows the previous one. A gap left
    /// before an explicit start offset reads as ASCII spaces. Start offsets are
    /// set programmatically and are not part of the textual form.
    pub start_offset: Option<u64>,
}

impl SourcePointer {
    pub fn parse(s: &str) -> ocrhl_common::Result<SourcePointer> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::malformed("source pointer", "empty pointer"));
        }
        let sources = s
            .split('+')
            .map(FileSource::parse)
            .collect::<ocrhl_common::Result<Vec<_>>>()?;
        Ok(SourcePointer { sources })
    }

    pub fn single(source: FileSource) -> SourcePointer {
        SourcePointer {
            sources: vec![source],
        }
    }

    /// Whether every source is flagged as pure ASCII.
    pub fn is_ascii(&self) -> bool {
        self.sources.iter().all(|s| s.is_ascii)
    }
}

impl FileSource {
    pub fn new(path: impl Into<String>) -> FileSource {
        FileSource {
            path: path.into(),
            regions: Vec::new(),
            is_ascii: false,
        }
    }

    pub fn with_regions(mut self, regions: Vec<Region>) -> FileSource {
        self.regions = regions;
        self
    }

    pub fn with_ascii(mut self, is_ascii: bool) -> FileSource {
        self.is_ascii = is_ascii;
        self
    }

    /// Whether the path is an object URL rather than a local path.
    pub fn is_url(&self) -> bool {
        has_scheme(&self.path)
    }

    fn parse(s: &str) -> ocrhl_common::Result<FileSource> {
        let malformed = |message: &str| Error::malformed("source pointer", format!("'{s}': {message}"));

        let mut rest = s.trim();
        let mut regions = Vec::new();
        if let Some(body) = rest.strip_suffix(']') {
            let open = body.rfind('[').ok_or_else(|| malformed("unbalanced ']'"))?;
            regions = body[open + 1..]
                .split(',')
                .map(|r| Region::parse(r.trim()).ok_or_else(|| malformed("bad region")))
                .collect::<ocrhl_common::Result<Vec<_>>>()?;
            rest = &body[..open];
        }
        let is_ascii = match rest.strip_suffix(ASCII_MARKER) {
            Some(path) => {
                rest = path;
                true
            }
            None => false,
        };
        if rest.is_empty() {
            return Err(malformed("missing path"));
        }
        if rest.contains(['[', ']', '{', '}']) {
            return Err(malformed("unexpected bracket in path"));
        }
        if !regions_are_ordered(&regions) {
            return Err(malformed("regions must be sorted and non-overlapping"));
        }
        Ok(FileSource {
            path: rest.to_string(),
            regions,
            is_ascii,
        })
    }
}

impl Region {
    pub fn new(start: u64, end: Option<u64>) -> Region {
        Region {
            start,
            end,
            start_offset: None,
        }
    }

    pub fn with_start_offset(mut self, start_offset: u64) -> Region {
        self.start_offset = Some(start_offset);
        self
    }

    fn parse(s: &str) -> Option<Region> {
        let (start, end) = s.split_once(':')?;
        let start = match start.trim() {
            "" => 0,
            n => n.parse().ok()?,
        };
        let end = match end.trim() {
            "" => None,
            n => Some(n.parse().ok()?),
        };
        if end.is_some_and(|end| end < start) {
            return None;
        }
        Some(Region::new(start, end))
    }
}

fn regions_are_ordered(regions: &[Region]) -> bool {
    regions.windows(2).all(|w| match w[0].end {
        Some(end) => end <= w[1].start,
        None => false,
    })
}

impl FromStr for SourcePointer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourcePointer::parse(s)
    }
}

impl fmt::Display for SourcePointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{source}")?;
        }
        Ok(())
    }
}

impl fmt::Display for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if self.is_ascii {
            f.write_str(ASCII_MARKER)?;
        }
        if !self.regions.is_empty() {
            f.write_str("[")?;
            for (i, region) in self.regions.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{region}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.start)?;
        if let Some(end) = self.end {
            write!(f, "{end}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ocrhl_common::error::ErrorKind;

    use super::{FileSource, Region, SourcePointer};

    #[test]
    fn test_parse_single_path() {
        let ptr = SourcePointer::parse("/data/vol1/alto.xml").unwrap();
        assert_eq!(ptr.sources, vec![FileSource::new("/data/vol1/alto.xml")]);
        assert!(!ptr.is_ascii());
    }

    #[test]
    fn test_parse_full_grammar() {
        let ptr = SourcePointer::parse(
            "/data/p1.hocr{ascii}+/data/p2.hocr[:100,200:300,500:]+s3://books/p3.hocr{ascii}[10:20]",
        )
        .unwrap();
        assert_eq!(ptr.sources.len(), 3);

        assert!(ptr.sources[0].is_ascii);
        assert!(ptr.sources[0].regions.is_empty());

        let p2 = &ptr.sources[1];
        assert!(!p2.is_ascii);
        assert_eq!(
            p2.regions,
            vec![
                Region::new(0, Some(100)),
                Region::new(200, Some(300)),
                Region::new(500, None),
            ]
        );

        let p3 = &ptr.sources[2];
        assert_eq!(p3.path, "s3://books/p3.hocr");
        assert!(p3.is_url());
        assert!(p3.is_ascii);
        assert_eq!(p3.regions, vec![Region::new(10, Some(20))]);
        assert!(!ptr.is_ascii());
    }

    #[test]
    fn test_display_round_trip() {
        for s in [
            "/a.xml",
            "/a.xml{ascii}",
            "/a.xml[0:10,10:]",
            "/a.xml{ascii}[5:6]+/b.xml+/c.xml[:]",
        ] {
            let ptr: SourcePointer = s.parse().unwrap();
            let printed = ptr.to_string();
            assert_eq!(SourcePointer::parse(&printed).unwrap(), ptr);
        }
        assert_eq!(
            SourcePointer::parse("/a.xml[:10]").unwrap().to_string(),
            "/a.xml[0:10]"
        );
    }

    #[test]
    fn test_malformed_pointers() {
        for s in [
            "",
            "+",
            "/a.xml+",
            "/a.xml[",
            "/a.xml]",
            "/a.xml[]",
            "/a.xml[10]",
            "/a.xml[x:10]",
            "/a.xml[20:10]",
            "/a.xml[0:10,5:20]",
            "/a.xml[0:,5:20]",
            "/a.xml[0:5]{ascii}",
            "{ascii}",
            "[0:10]",
        ] {
            let err = SourcePointer::parse(s).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::Malformed { .. }),
                "{s:?} should be malformed, got {err}"
            );
        }
    }

    #[test]
    fn test_local_paths_are_not_urls() {
        assert!(!FileSource::new("/data/a.xml").is_url());
        assert!(!FileSource::new("relative/a.xml").is_url());
        assert!(FileSource::new("file:///data/a.xml").is_url());
    }
}
