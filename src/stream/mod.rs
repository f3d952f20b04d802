// Record Buffering and Fan-out
//
// The sliding window of recent records and the broker that multicasts every
// record to the stream subscribers.

pub mod broker;
pub mod buffer;

pub use broker::{ClientCounts, FanOutBroker};
pub use buffer::{BufferStats, CertBuffer};
