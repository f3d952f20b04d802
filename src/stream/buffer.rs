// Certificate Buffer
//
// Bounded sliding window of the most recently produced records plus the
// statistics accumulator. All access is serialized by a single mutex;
// snapshots are value copies.

use crate::ct::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Statistics snapshot for the buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferStats {
    pub buffer_size: usize,
    pub buffer_capacity: usize,
    /// Monotonically non-decreasing count of every record ever added
    pub total_processed: u64,
    pub uptime_s: f64,
    pub rate_per_s: f64,
    /// Unix seconds at which the buffer was created
    pub started_at: f64,
}

struct Inner {
    window: VecDeque<Arc<Record>>,
    total_processed: u64,
}

/// Sliding window of the N most recent records
pub struct CertBuffer {
    capacity: usize,
    started: Instant,
    started_at_unix: f64,
    inner: Mutex<Inner>,
}

impl CertBuffer {
    /// Create a buffer holding at most `capacity` records
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            started: Instant::now(),
            started_at_unix: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
            inner: Mutex::new(Inner {
                window: VecDeque::with_capacity(capacity),
                total_processed: 0,
            }),
        }
    }

    /// Append a record, discarding the oldest when the window is full
    pub fn add(&self, record: Arc<Record>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.window.push_back(record);
            if inner.window.len() > self.capacity {
                inner.window.pop_front();
            }
            inner.total_processed += 1;
        }
    }

    /// Snapshot of up to `limit` records (all when None), newest-first
    pub fn latest(&self, limit: Option<usize>) -> Vec<Arc<Record>> {
        if let Ok(inner) = self.inner.lock() {
            let take = limit.unwrap_or(inner.window.len());
            inner.window.iter().rev().take(take).cloned().collect()
        } else {
            Vec::new()
        }
    }

    /// The most recently added record
    pub fn example(&self) -> Option<Arc<Record>> {
        self.inner.lock().ok().and_then(|inner| inner.window.back().cloned())
    }

    /// Current statistics snapshot
    pub fn stats(&self) -> BufferStats {
        let (size, total) = if let Ok(inner) = self.inner.lock() {
            (inner.window.len(), inner.total_processed)
        } else {
            (0, 0)
        };

        let uptime = self.started.elapsed().as_secs_f64();
        let rate = if uptime > 0.0 { total as f64 / uptime } else { 0.0 };

        BufferStats {
            buffer_size: size,
            buffer_capacity: self.capacity,
            total_processed: total,
            uptime_s: uptime,
            rate_per_s: rate,
            started_at: self.started_at_unix,
        }
    }
}
