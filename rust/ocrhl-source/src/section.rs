//! Sections and the per-reader section cache.

use std::ops::Range;

use bytes::Bytes;

/// A window of raw bytes `[start, end)` of a reader's logical byte space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub start: u64,
    pub end: u64,
    bytes: Bytes,
}

impl Section {
    pub fn new(start: u64, bytes: Bytes) -> Section {
        Section {
            start,
            end: start + bytes.len() as u64,
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn range(&self) -> Range<u64> {
        self.start..self.end
    }

    pub fn contains(&self, offset: u64) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Bytes of the logical range `range`, clipped to this section.
    pub fn slice(&self, range: Range<u64>) -> Bytes {
        let start = range.start.clamp(self.start, self.end);
        let end = range.end.clamp(start, self.end);
        self.bytes
            .slice((start - self.start) as usize..(end - self.start) as usize)
    }

    /// The section as text, one char per byte.
    pub fn text(&self) -> String {
        self.bytes.iter().map(|&b| b as char).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Fixed-capacity cache of sections keyed by section start offset.
///
/// Slots are filled in order while any is free. Once full, the slot touched least
/// recently (by `get` hit or `insert`) is replaced.
#[derive(Debug)]
pub struct SectionCache {
    slots: Vec<Option<Slot>>,
    tick: u64,
    stats: CacheStats,
}

#[derive(Debug)]
struct Slot {
    section: Section,
    last_used: u64,
}

impl SectionCache {
    pub fn new(capacity: usize) -> SectionCache {
        SectionCache {
            slots: (0..capacity.max(1)).map(|_| None).collect(),
            tick: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Looks up the section starting at `start`, refreshing its recency on a hit.
    pub fn get(&mut self, start: u64) -> Option<Section> {
        self.tick += 1;
        let tick = self.tick;
        let found = self
            .slots
            .iter_mut()
            .flatten()
            .find(|slot| slot.section.start == start);
        match found {
            Some(slot) => {
                slot.last_used = tick;
                self.stats.hits += 1;
                Some(slot.section.clone())
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Caches `section`, returning the section it displaced, if any.
    pub fn insert(&mut self, section: Section) -> Option<Section> {
        self.tick += 1;
        let start = section.start;
        let same = self
            .slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|s| s.section.start == start));
        let index = same
            .or_else(|| self.slots.iter().position(Option::is_none))
            .unwrap_or_else(|| self.least_recently_used());

        let slot = Slot {
            section,
            last_used: self.tick,
        };
        let previous = self.slots[index].replace(slot).map(|s| s.section);
        if let (None, Some(evicted)) = (same, &previous) {
            self.stats.evictions += 1;
            log::trace!("section cache: evicted {:?}", evicted.range());
        }
        previous
    }

    /// Ranges of the cached sections, in slot order.
    pub fn cached_ranges(&self) -> Vec<Range<u64>> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| slot.section.range())
            .collect()
    }

    fn least_recently_used(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.as_ref().map_or(0, |s| s.last_used))
            .map_or(0, |(i, _)| i)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::{CacheStats, Section, SectionCache};

    fn section(start: u64) -> Section {
        Section::new(start, Bytes::from(vec![b'x'; 16]))
    }

    #[test]
    fn test_section_slice_and_text() {
        let s = Section::new(100, Bytes::from_static(b"<w>caf\xe9</w>"));
        assert_eq!(s.range(), 100..111);
        assert!(s.contains(100) && s.contains(110) && !s.contains(111) && !s.contains(99));
        assert_eq!(s.slice(103..107).as_ref(), b"caf\xe9");
        assert_eq!(s.slice(90..103).as_ref(), b"<w>");
        assert_eq!(s.slice(109..200).as_ref(), b"w>");
        assert_eq!(s.text(), "<w>café</w>");
    }

    #[test]
    fn test_fills_free_slots_before_evicting() {
        let mut cache = SectionCache::new(3);
        assert!(cache.insert(section(0)).is_none());
        assert!(cache.insert(section(16)).is_none());
        assert!(cache.insert(section(32)).is_none());
        assert_eq!(cache.cached_ranges(), vec![0..16, 16..32, 32..48]);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_evicts_least_recently_touched() {
        let mut cache = SectionCache::new(3);
        cache.insert(section(0)); // A
        cache.insert(section(16)); // B
        cache.insert(section(32)); // C
        assert!(cache.get(0).is_some()); // touch A

        let evicted = cache.insert(section(48)).unwrap(); // D
        assert_eq!(evicted.start, 16);
        assert!(cache.get(16).is_none());
        assert!(cache.get(0).is_some());
        assert!(cache.get(32).is_some());
        assert!(cache.get(48).is_some());

        // A was looked up before C and D
        let evicted = cache.insert(section(64)).unwrap();
        assert_eq!(evicted.start, 0);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 4,
                misses: 1,
                evictions: 2,
            }
        );
    }

    #[test]
    fn test_reinsert_same_start_is_not_eviction() {
        let mut cache = SectionCache::new(2);
        cache.insert(section(0));
        let previous = cache.insert(section(0));
        assert_eq!(previous.map(|s| s.start), Some(0));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.cached_ranges().len(), 1);
    }
}
