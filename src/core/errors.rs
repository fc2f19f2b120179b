/*!
 * Error Types
 * Centralized error handling with thiserror and miette
 *
 * Only edge conditions are recoverable: a producer outliving its consumer and
 * malformed configuration. Misuse of the joiner handle is a caller bug and
 * panics instead (see `stream::joiner`).
 */

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for producer-side stream operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Result alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Producer-side stream errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Diagnostic)]
pub enum StreamError {
    #[error("Stream control closed by consumer")]
    #[diagnostic(
        code(stream::control_closed),
        help("The consumer asked this producer to stop. Drop the producer to close its data channel.")
    )]
    ControlClosed,

    #[error("Stream data receiver disconnected")]
    #[diagnostic(
        code(stream::disconnected),
        help("Nobody is reading this stream anymore. Stop producing and drop the producer.")
    )]
    Disconnected,
}

/// Result alias for subscription setup
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

/// Subscription validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum SubscriptionError {
    #[error("Subscription selects no events")]
    #[diagnostic(
        code(subscription::empty),
        help("Add at least one event filter, e.g. a ticker interval.")
    )]
    Empty,

    #[error("Ticker filter {index} has a zero interval")]
    #[diagnostic(
        code(subscription::zero_interval),
        help("Ticker intervals must be greater than zero.")
    )]
    ZeroTickerInterval { index: usize },
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    #[diagnostic(
        code(config::invalid_value),
        help("Unset the variable to use the default, or provide a valid value.")
    )]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} must be greater than zero")]
    #[diagnostic(
        code(config::zero_interval),
        help("Periodic sources cannot tick at a zero interval.")
    )]
    ZeroInterval { key: &'static str },
}
