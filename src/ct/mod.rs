// Certificate Transparency Polling Engine
//
// This module tracks per-log append offsets against remote Signed Tree Heads,
// retrieves new entries in bounded batches, and decodes each one into a
// normalized certificate record.

pub mod client;
pub mod decoder;
pub mod directory;
pub mod poller;
pub mod record;
pub mod scheduler;

pub use client::{CtClient, RawEntry, SignedTreeHead};
pub use directory::{LogDescriptor, LogDirectory};
pub use poller::{LogPoller, PollerConfig};
pub use record::{Record, StreamView};
pub use scheduler::PollScheduler;

use crate::error::CtError;

/// Result type for CT polling operations
pub type Result<T> = std::result::Result<T, CtError>;
