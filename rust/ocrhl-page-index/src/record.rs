use std::{fmt, ops::BitOr};

/// Pixel size of a page image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u16,
    pub height: u16,
}

impl Dimensions {
    pub fn new(width: u16, height: u16) -> Dimensions {
        Dimensions { width, height }
    }
}

/// One page of an OCR document: where it starts in the source and what it is called.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageRecord {
    pub id: Option<String>,
    pub start_offset: u32,
    /// Exclusive end. `None` when unknown (the last page of an index without lengths).
    pub end_offset: Option<u32>,
    /// A 0x0 size is stored the same way as no size and reads back as `None`.
    pub dimensions: Option<Dimensions>,
}

impl PageRecord {
    pub fn new(start_offset: u32) -> PageRecord {
        PageRecord {
            start_offset,
            ..Default::default()
        }
    }

    pub fn with_end(mut self, end_offset: u32) -> PageRecord {
        self.end_offset = Some(end_offset);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> PageRecord {
        self.id = Some(id.into());
        self
    }

    pub fn with_dimensions(mut self, width: u16, height: u16) -> PageRecord {
        self.dimensions = Some(Dimensions::new(width, height));
        self
    }

    /// Whether `offset` falls within `[start_offset, end_offset)`; an open-ended
    /// page contains everything from its start.
    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start_offset as u64
            && self.end_offset.is_none_or(|end| offset < end as u64)
    }
}

/// Optional record fields present in an index file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Features(u8);

impl Features {
    pub const NONE: Features = Features(0);
    pub const LENGTH: Features = Features(0x01);
    pub const IDENTIFIER: Features = Features(0x02);
    pub const DIMENSION: Features = Features(0x04);
    pub const ALL: Features = Features(0x07);

    pub fn bits(&self) -> u8 {
        self.0
    }

    /// `None` when `bits` has flags this version does not know.
    pub fn from_bits(bits: u8) -> Option<Features> {
        (bits & !Self::ALL.0 == 0).then_some(Features(bits))
    }

    pub fn contains(&self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    /// The features needed to store every record of `records`.
    pub fn of<'a>(records: impl IntoIterator<Item = &'a PageRecord>) -> Features {
        records.into_iter().fold(Features::NONE, |features, r| {
            let mut bits = features.0;
            if r.end_offset.is_some() {
                bits |= Self::LENGTH.0;
            }
            if r.id.is_some() {
                bits |= Self::IDENTIFIER.0;
            }
            if r.dimensions.is_some() {
                bits |= Self::DIMENSION.0;
            }
            Features(bits)
        })
    }

    /// Size of the file header: magic, version, features and, with identifiers,
    /// the record count.
    pub fn header_size(&self) -> usize {
        let base = crate::MAGIC.len() + 2;
        if self.contains(Self::IDENTIFIER) {
            base + 2
        } else {
            base
        }
    }

    /// Size of one fixed-width record.
    pub fn record_size(&self) -> usize {
        let mut size = 4;
        if self.contains(Self::LENGTH) {
            size += 4;
        }
        if self.contains(Self::IDENTIFIER) {
            size += 4;
        }
        if self.contains(Self::DIMENSION) {
            size += 4;
        }
        size
    }
}

impl BitOr for Features {
    type Output = Features;

    fn bitor(self, rhs: Features) -> Features {
        Features(self.0 | rhs.0)
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::LENGTH, "length"),
            (Self::IDENTIFIER, "identifier"),
            (Self::DIMENSION, "dimension"),
        ]
        .into_iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, name)| name)
        .collect::<Vec<_>>();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join("+"))
        }
    }
}
