// CertWire - Real-time Certificate Transparency log aggregator
// Copyright (C) 2025 CertWire Team
// Licensed under GPL-3.0

//! Process-wide Defaults and Protocol Constants
//!
//! Centralized constants for the polling engine, the fan-out broker, and the
//! RFC 6962 MerkleTreeLeaf framing, eliminating magic numbers throughout the
//! codebase. Every default is overridable from the command line.

use std::time::Duration;

// =============================================================================
// Server Defaults
// =============================================================================

/// Default bind address for the HTTP API
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default port for the HTTP API
///
/// The three WebSocket stream listeners bind to the three consecutive ports
/// above this one: lite on `port + 1`, full on `port + 2`, domains-only on
/// `port + 3`.
pub const DEFAULT_PORT: u16 = 8080;

/// Port offset of the lite stream listener
pub const LITE_PORT_OFFSET: u16 = 1;

/// Port offset of the full stream listener
pub const FULL_PORT_OFFSET: u16 = 2;

/// Port offset of the domains-only stream listener
pub const DOMAINS_PORT_OFFSET: u16 = 3;

// =============================================================================
// Polling Engine
// =============================================================================

/// Google CT log list URL (v3 format)
pub const CT_LOG_LIST_URL: &str = "https://www.gstatic.com/ct/log_list/v3/log_list.json";

/// Interval between successive STH polls of a single log
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Maximum number of entries requested per get-entries call
///
/// Logs may return fewer entries than requested; the poller advances by the
/// count actually returned.
pub const DEFAULT_BATCH_SIZE: u64 = 256;

/// Maximum number of concurrent log pollers
///
/// The usable-log list is capped at this size; logs beyond the cap are not
/// polled.
pub const MAX_WORKERS: usize = 50;

/// Overall timeout for upstream HTTP requests (log list, STH, entries)
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Buffer and Fan-out
// =============================================================================

/// Capacity of the sliding window of recent records
pub const CERTIFICATE_BUFFER_SIZE: usize = 25;

/// Per-subscriber queue capacity
///
/// A subscriber that falls further behind than this loses its oldest queued
/// messages (drop-oldest); producers never block on slow subscribers. The
/// broadcast transport rounds this up to the next power of two.
pub const CLIENT_QUEUE_SIZE: usize = 100;

/// Maximum subscribers per stream endpoint; excess connections are refused
pub const MAX_CLIENTS_PER_ENDPOINT: usize = 1000;

/// Liveness timeout for stream subscribers
///
/// A subscriber that has not sent a `ping` message within this window is
/// disconnected. The check itself runs once per window, so worst-case
/// detection is twice the timeout.
pub const CLIENT_PING_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// RFC 6962 MerkleTreeLeaf Framing
// =============================================================================

/// LogEntryType: X509Entry (RFC 6962 Section 3.1)
pub const ENTRY_TYPE_X509: u16 = 0;

/// LogEntryType: PrecertEntry (RFC 6962 Section 3.1)
pub const ENTRY_TYPE_PRECERT: u16 = 1;

/// Byte offset of the 64-bit big-endian timestamp in a MerkleTreeLeaf
pub const LEAF_TIMESTAMP_OFFSET: usize = 2;

/// Byte offset of the 16-bit big-endian entry type in a MerkleTreeLeaf
pub const LEAF_ENTRY_TYPE_OFFSET: usize = 10;

/// Byte offset of the certificate payload for an X509Entry
///
/// A 24-bit big-endian length immediately followed by the DER bytes.
pub const LEAF_X509_PAYLOAD_OFFSET: usize = 12;

/// Length of the issuer key hash preceding a PrecertEntry payload
pub const PRECERT_ISSUER_KEY_HASH_LEN: usize = 32;

/// Byte offset of the TBSCertificate payload for a PrecertEntry
pub const LEAF_PRECERT_PAYLOAD_OFFSET: usize =
    LEAF_X509_PAYLOAD_OFFSET + PRECERT_ISSUER_KEY_HASH_LEN;

/// Width of the 24-bit length prefixes used throughout the leaf and chain
/// framings
pub const U24_LEN: usize = 3;
