//! Order number generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sequence shared by every generator in the process. A per-instance
/// counter would let two engines built in the same second allocate the
/// same number.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Allocates unique, human-presentable order numbers.
///
/// Numbers look like `ORD-1735689600-0042`: a second-resolution timestamp
/// for a monotonic-looking prefix, then a serially allocated sequence.
/// The sequence is a process-wide atomic counter, so two checkouts
/// completing in the same instant always receive distinct numbers even
/// across separate engine instances; nothing is ever computed
/// client-side.
#[derive(Debug)]
pub struct OrderNumberGenerator;

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Allocate the next order number.
    pub fn next(&self) -> String {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!("ORD-{}-{:04}", seconds, seq)
    }
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}
