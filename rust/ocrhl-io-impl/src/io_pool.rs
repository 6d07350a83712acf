//! Thread pool for background I/O with a bounded queue.

use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};

/// Fixed-size thread pool dedicated to advisory background I/O.
///
/// The number of queued jobs is bounded: once the queue is full, new jobs are
/// rejected rather than buffered, so a burst of prefetch requests cannot grow
/// memory without limit or delay the requests that actually need the data.
pub struct IoPool {
    thread_pool: rayon::ThreadPool,
    queue_size: AtomicUsize,
    max_queued: usize,
}

impl IoPool {
    const MAX_QUEUED_OPS: usize = 4 * 1024;
    const NUM_THREADS: usize = 8;

    /// Returns the process-wide shared pool, starting it on first use.
    pub fn get() -> Arc<IoPool> {
        static POOL: OnceLock<Arc<IoPool>> = OnceLock::new();
        POOL.get_or_init(|| {
            IoPool::with_limits(Self::NUM_THREADS, Self::MAX_QUEUED_OPS).expect("io thread pool")
        })
        .clone()
    }

    /// Starts a dedicated pool.
    pub fn with_limits(num_threads: usize, max_queued: usize) -> std::io::Result<Arc<IoPool>> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads.max(1))
            .thread_name(|i| format!("ocrhl_io_thread_{i}"))
            .build()
            .map_err(std::io::Error::other)?;
        Ok(Arc::new(IoPool {
            thread_pool,
            queue_size: AtomicUsize::new(0),
            max_queued: max_queued.max(1),
        }))
    }

    /// Number of jobs queued or running.
    pub fn queued(&self) -> usize {
        self.queue_size.load(Ordering::Relaxed)
    }

    /// Attempts to enqueue a job.
    ///
    /// Returns `false` without running the job when the queue is full.
    pub fn try_spawn<F>(self: &Arc<Self>, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        if self.queue_size.fetch_add(1, Ordering::Relaxed) >= self.max_queued {
            self.queue_size.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        let this = self.clone();
        self.thread_pool.spawn_fifo(move || {
            job();
            this.queue_size.fetch_sub(1, Ordering::Relaxed);
        });
        true
    }
}
