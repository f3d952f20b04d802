// CertWire - Real-time Certificate Transparency log aggregator
// Copyright (C) 2025 CertWire Team
// Licensed under GPL-3.0

//! CertWire aggregates the public Certificate Transparency ecosystem into a
//! single real-time feed. It polls every usable CT log, decodes each newly
//! appended entry into a normalized certificate record, retains a sliding
//! window of recent records, and multicasts every record to WebSocket
//! subscribers in three verbosities (full, lite, domains-only).

pub mod api;
pub mod cli;
pub mod constants;
pub mod ct;
pub mod error;
pub mod stream;

// Re-export commonly used types
pub use crate::cli::Args;
pub use crate::ct::record::{Record, StreamView};
pub use crate::error::CtError;
pub use crate::stream::broker::FanOutBroker;
pub use crate::stream::buffer::CertBuffer;

/// Result type for CertWire operations
///
/// The standard Result type used throughout CertWire, wrapping the structured
/// CtError enum for exhaustive matching.
pub type Result<T> = std::result::Result<T, CtError>;
