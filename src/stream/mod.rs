/*!
 * Stream Multiplexing Engine
 * Event streams with attached control channels, and a dynamic fan-in joiner
 */

mod channel;
mod joiner;
mod ticker;

pub use channel::{control_channel, ControlWatch, EventStream, StreamControl, StreamProducer};
pub use joiner::{ControlMessage, Joiner, JoinerHandle, JoinerStats};
pub use ticker::Ticker;
