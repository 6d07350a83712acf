//! Best-effort read-ahead that warms the OS page cache for upcoming requests.
//!
//! A prefetch job reads its byte ranges in fixed-size chunks and throws the data
//! away. Nothing waits for it. Each job is registered in a pending map under a
//! key (usually the file source it reads) together with a cancellation flag that
//! belongs to that job alone, and checks the flag between chunks. Cancelling a key
//! and prefetching it again starts a fresh job without reviving the old one.

use std::{
    collections::{HashMap, hash_map::Entry},
    ops::Range,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use ocrhl_io::ReadAt;

use crate::io_pool::IoPool;

#[derive(Clone)]
pub struct PageCacheWarmer {
    pool: Arc<IoPool>,
    pending: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
    chunk_size: u64,
    stats: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    completed: AtomicUsize,
    cancelled: AtomicUsize,
    failed: AtomicUsize,
}

/// Outcome counts of finished prefetch jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmerStats {
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl PageCacheWarmer {
    pub const DEFAULT_CHUNK_SIZE: u64 = 64 * 1024;

    pub fn new(pool: Arc<IoPool>) -> PageCacheWarmer {
        PageCacheWarmer {
            pool,
            pending: Default::default(),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            stats: Default::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> PageCacheWarmer {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Schedules a read-ahead of `ranges` from `reader`.
    ///
    /// Returns `false` when a job for `key` is already pending or the pool queue is
    /// full. Never blocks on I/O.
    pub fn prefetch(
        &self,
        key: impl Into<String>,
        reader: Arc<dyn ReadAt>,
        ranges: Vec<Range<u64>>,
    ) -> bool {
        let key = key.into();
        let cancelled = Arc::new(AtomicBool::new(false));
        match self.lock().entry(key.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(entry) => {
                entry.insert(cancelled.clone());
            }
        }
        let this = self.clone();
        let job_key = key.clone();
        let job_cancelled = cancelled.clone();
        if self.pool.try_spawn(move || {
            this.run(&job_key, &job_cancelled, reader.as_ref(), &ranges)
        }) {
            true
        } else {
            log::debug!("prefetch of '{key}' rejected: io queue is full");
            self.finish(&key, &cancelled);
            false
        }
    }

    /// Cancels the pending job for `key`; it stops before its next chunk.
    pub fn cancel(&self, key: &str) -> bool {
        match self.lock().remove(key) {
            Some(cancelled) => {
                cancelled.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn stats(&self) -> WarmerStats {
        WarmerStats {
            completed: self.stats.completed.load(Ordering::Relaxed),
            cancelled: self.stats.cancelled.load(Ordering::Relaxed),
            failed: self.stats.failed.load(Ordering::Relaxed),
        }
    }

    fn run(
        &self,
        key: &str,
        cancelled: &Arc<AtomicBool>,
        reader: &dyn ReadAt,
        ranges: &[Range<u64>],
    ) {
        let chunk = reader.storage_profile().clamp_io_size(self.chunk_size as usize) as u64;
        for range in ranges {
            let mut pos = range.start;
            while pos < range.end {
                if cancelled.load(Ordering::Relaxed) {
                    log::debug!("prefetch of '{key}' cancelled at offset {pos}");
                    self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                let end = range.end.min(pos.saturating_add(chunk));
                match reader.read_at(pos..end) {
                    Ok(bytes) if bytes.is_empty() => break,
                    Ok(_) => pos = end,
                    Err(e) => {
                        log::debug!("prefetch of '{key}' failed at offset {pos}: {e}");
                        self.finish(key, cancelled);
                        self.stats.failed.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                }
            }
        }
        self.finish(key, cancelled);
        self.stats.completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Unregisters `key` unless it already belongs to a newer job.
    fn finish(&self, key: &str, cancelled: &Arc<AtomicBool>) {
        let mut pending = self.lock();
        if pending.get(key).is_some_and(|current| Arc::ptr_eq(current, cancelled)) {
            pending.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<AtomicBool>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for PageCacheWarmer {
    fn default() -> Self {
        PageCacheWarmer::new(IoPool::get())
    }
}
