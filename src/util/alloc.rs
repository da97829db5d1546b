//! Per-thread bookkeeping for block allocations, used by the test suites to count releases and to
//! simulate allocator failure. Every test runs on its own thread, so the counters never mix.
#![cfg(test)]

use std::cell::Cell;

thread_local! {
    static LIVE: Cell<usize> = const { Cell::new(0) };
    static ALLOCATED: Cell<usize> = const { Cell::new(0) };
    static RELEASED: Cell<usize> = const { Cell::new(0) };
    static FAIL_AFTER: Cell<Option<usize>> = const { Cell::new(None) };
}

/// A snapshot of this thread's allocation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
    pub live: usize,
    pub allocated: usize,
    pub released: usize,
}

impl AllocStats {
    pub fn now() -> AllocStats {
        AllocStats {
            live: LIVE.get(),
            allocated: ALLOCATED.get(),
            released: RELEASED.get(),
        }
    }

    /// Returns the counters accumulated since `earlier` was taken.
    pub fn since(earlier: AllocStats) -> AllocStats {
        let now = AllocStats::now();
        AllocStats {
            live: now.live.wrapping_sub(earlier.live),
            allocated: now.allocated - earlier.allocated,
            released: now.released - earlier.released,
        }
    }
}

/// Makes every allocation after the next `successes` ones fail, until [`FailGuard`] is dropped.
#[must_use]
pub fn fail_after(successes: usize) -> FailGuard {
    FAIL_AFTER.set(Some(successes));
    FailGuard
}

pub struct FailGuard;

impl Drop for FailGuard {
    fn drop(&mut self) {
        FAIL_AFTER.set(None);
    }
}

/// Consulted by the raw block allocator before touching the global allocator.
pub(crate) fn should_fail() -> bool {
    match FAIL_AFTER.get() {
        Some(0) => true,
        Some(n) => {
            FAIL_AFTER.set(Some(n - 1));
            false
        },
        None => false,
    }
}

pub(crate) fn record_allocate() {
    LIVE.set(LIVE.get() + 1);
    ALLOCATED.set(ALLOCATED.get() + 1);
}

pub(crate) fn record_release() {
    LIVE.set(LIVE.get() - 1);
    RELEASED.set(RELEASED.get() + 1);
}
