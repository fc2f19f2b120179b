/*!
 * Core Module
 * Fundamental sensor types, configuration and error handling
 */

pub mod config;
pub mod errors;
pub mod id;
pub mod limits;

// Re-export for convenience
pub use config::SensorConfig;
pub use errors::*;
pub use id::{SequenceGenerator, StreamId};
