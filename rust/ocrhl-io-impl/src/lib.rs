//! Background I/O services built on the `ocrhl-io` abstractions.

pub mod io_pool;
pub mod page_cache_warmer;

pub use io_pool::IoPool;
pub use page_cache_warmer::{PageCacheWarmer, WarmerStats};
