/*!
 * ID Generation System
 * Type-safe stream identities and sequence counters
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// Type-Safe ID Wrappers
// ============================================================================

/// Stream identity, unique within the process
///
/// The joiner matches members by this value, so two streams never compare
/// equal unless they are the same stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub u64);

static NEXT_STREAM_ID: AtomicU64 = AtomicU64::new(1);

impl StreamId {
    /// Allocate a fresh identity
    #[inline]
    pub fn next() -> Self {
        Self(NEXT_STREAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Atomic Counter Generator
// ============================================================================

/// Monotonic counter for per-sensor sequence numbers
#[derive(Debug)]
#[repr(C, align(64))]
pub struct SequenceGenerator {
    counter: AtomicU64,
}

impl SequenceGenerator {
    /// Create new generator starting at given value
    #[inline]
    pub const fn new(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
        }
    }

    /// Next value; never repeats within one generator
    #[inline]
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Get current counter value (for debugging)
    #[inline]
    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
