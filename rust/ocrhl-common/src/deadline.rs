//! Cooperative deadlines for long-running scans.

use std::time::{Duration, Instant};

use crate::error::{Error, ErrorKind};

/// A point in time after which a highlighting pass should give up.
///
/// Readers check the deadline between section fetches, which bounds the amount of
/// uninterruptible work to a single section read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn at(instant: Instant) -> Deadline {
        Deadline(instant)
    }

    pub fn after(timeout: Duration) -> Deadline {
        Deadline(Instant::now() + timeout)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Returns `DeadlineExceeded` once the deadline has passed.
    pub fn check(&self) -> crate::Result<()> {
        if self.is_expired() {
            log::debug!("deadline exceeded");
            Err(Error::from(ErrorKind::DeadlineExceeded))
        } else {
            Ok(())
        }
    }
}
