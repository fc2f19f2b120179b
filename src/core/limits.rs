/*!
 * System Limits and Constants
 *
 * Centralized location for stream sizing defaults and timing constants.
 * Organized by domain. Values marked [CONFIG] can be overridden through
 * `SensorConfig`.
 */

use std::time::Duration;

// =============================================================================
// CHANNEL CAPACITIES
// =============================================================================

/// Joiner output buffer length (1024 events)
/// [CONFIG] `SENSOR_CHANNEL_BUFFER_LENGTH`, 0 selects a rendezvous channel
pub const DEFAULT_CHANNEL_BUFFER_LENGTH: usize = 1024;

/// Leaf source data channel capacity (rendezvous)
/// Each event is handed straight to whoever drains the source
pub const SOURCE_CHANNEL_CAPACITY: usize = 0;

/// Queued control messages per joiner
/// Add/Remove still wait for their reply regardless of this value
pub const CONTROL_CHANNEL_CAPACITY: usize = 1;

// =============================================================================
// TIMER SOURCES
// =============================================================================

/// Default ticker interval for subscriptions without an explicit one (1s)
/// [CONFIG] `SENSOR_TICKER_INTERVAL_MS`
pub const DEFAULT_TICKER_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// TRACING
// =============================================================================

/// Operations slower than this are logged at warn level (100ms)
pub const SLOW_OPERATION_THRESHOLD: Duration = Duration::from_millis(100);
