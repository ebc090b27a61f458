//! Re-entrancy guard for user-triggered runs.
use crate::{InsightError, Result};
use std::sync::atomic::{AtomicBool, Ordering};

/// Set while an extraction or analysis run is in flight.
///
/// Acquisition is a compare-and-swap, so two submissions racing each other
/// cannot both start.
#[derive(Debug)]
pub struct BusyFlag {
    busy: AtomicBool,
    label: &'static str,
}

impl BusyFlag {
    pub const fn new(label: &'static str) -> Self {
        Self {
            busy: AtomicBool::new(false),
            label,
        }
    }

    pub fn try_acquire(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| InsightError::Busy(self.label))?;
        Ok(BusyGuard { flag: &self.busy })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Clears the flag on drop, including when the run errors out.
#[derive(Debug)]
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
