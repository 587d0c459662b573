//! Capture-source timestamp normalization.
//!
//! The capture source stamps its very first buffer with a huge tick value
//! (an uninitialized clock). Downstream pipelines reject timestamps that
//! jump backwards from there, so anything at or above the sentinel is
//! rewritten to zero. Every other value passes through untouched; this is
//! not a monotonicity check.

/// Smallest tick value treated as an uninitialized capture clock.
pub const SENTINEL: u64 = 17_446_044_073_700_192_000;

/// Maps sentinel timestamps to zero, passes everything else through.
#[inline]
pub fn normalize(pts: u64) -> u64 {
    if pts >= SENTINEL {
        0
    } else {
        pts
    }
}
