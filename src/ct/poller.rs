// Log Poller
//
// One poller per CT log. Tracks the next append offset against the remote
// Signed Tree Head and fetches new entries in bounded batches, emitting each
// decoded record to the fan-out broker.

use super::client::CtClient;
use super::decoder;
use super::directory::LogDescriptor;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_POLL_INTERVAL};
use crate::stream::broker::FanOutBroker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Cap on the consecutive-failure backoff: 2^3 = 8 poll intervals
const MAX_BACKOFF_SHIFT: u32 = 3;

/// STH attempts allowed while seeding the starting index
const SEED_ATTEMPTS: u32 = 3;

/// Poll loop parameters shared by every poller
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between successive STH polls
    pub poll_interval: Duration,
    /// Maximum entries requested per get-entries call
    pub batch_size: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Polls a single CT log and emits decoded records
///
/// Within one poller, emitted records carry strictly increasing cert_index
/// values. The index advances by the number of entries returned, never by the
/// number successfully decoded, so an undecodable entry cannot livelock the
/// loop.
pub struct LogPoller {
    descriptor: LogDescriptor,
    client: CtClient,
    broker: Arc<FanOutBroker>,
    config: PollerConfig,
    shutdown: Arc<AtomicBool>,
    next_index: u64,
    tree_size: u64,
}

impl LogPoller {
    pub fn new(
        descriptor: LogDescriptor,
        broker: Arc<FanOutBroker>,
        config: PollerConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            descriptor,
            client: CtClient::new(),
            broker,
            config,
            shutdown,
            next_index: 0,
            tree_size: 0,
        }
    }

    /// Run the poll loop until the shutdown flag is set
    ///
    /// The first successful STH seeds both the observed tree size and the
    /// next index, so polling starts at the head observed at startup rather
    /// than replaying log history. A failed poll leaves the index untouched
    /// and widens the gap to the next attempt; a log that stays unreachable
    /// through seeding is disabled and not respawned.
    pub async fn run(mut self) {
        if !self.seed_from_sth().await {
            return;
        }

        let mut consecutive_failures: u32 = 0;
        while !self.shutdown.load(Ordering::Relaxed) {
            match self.poll_once().await {
                Ok(()) => {
                    consecutive_failures = 0;
                    sleep(self.config.poll_interval).await;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    let delay = backoff_delay(self.config.poll_interval, consecutive_failures);
                    warn!(
                        "Poll failed for {} ({} in a row): {}; next attempt in {:?}",
                        self.descriptor.name, consecutive_failures, e, delay
                    );
                    sleep(delay).await;
                }
            }
        }

        info!("Poller for {} stopped", self.descriptor.name);
    }

    /// Seed tree size and next index from the log's current head
    async fn seed_from_sth(&mut self) -> bool {
        for attempt in 1..=SEED_ATTEMPTS {
            if self.shutdown.load(Ordering::Relaxed) {
                return false;
            }

            match self.client.get_sth(&self.descriptor.url).await {
                Ok(sth) => {
                    self.tree_size = sth.tree_size;
                    self.next_index = sth.tree_size;
                    info!(
                        "Starting poller for {} at tree size {}",
                        self.descriptor.name, self.tree_size
                    );
                    return true;
                }
                Err(e) if attempt < SEED_ATTEMPTS => {
                    let delay = backoff_delay(self.config.poll_interval, attempt);
                    warn!(
                        "Initial STH fetch for {} failed (attempt {}/{}): {}; retrying in {:?}",
                        self.descriptor.name, attempt, SEED_ATTEMPTS, e, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!(
                        "Disabling poller for {}: initial STH fetch failed: {}",
                        self.descriptor.name, e
                    );
                }
            }
        }
        false
    }

    /// One STH check plus at most one get-entries batch
    async fn poll_once(&mut self) -> super::Result<()> {
        let sth = self.client.get_sth(&self.descriptor.url).await?;
        self.tree_size = sth.tree_size;

        let (start, end) = match batch_window(self.next_index, self.tree_size, self.config.batch_size)
        {
            Some(window) => window,
            None => {
                debug!(
                    "Caught up with {} (index {}, tree size {})",
                    self.descriptor.name, self.next_index, self.tree_size
                );
                return Ok(());
            }
        };

        // A failed fetch returns here without touching next_index
        let entries = self.client.get_entries(&self.descriptor.url, start, end).await?;

        let returned = entries.len() as u64;
        for (offset, entry) in entries.iter().enumerate() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            let index = start + offset as u64;
            let raw = match entry.decode() {
                Ok(raw) => raw,
                Err(e) => {
                    debug!("Entry {} from {} undecodable: {}", index, self.descriptor.name, e);
                    continue;
                }
            };

            if let Some(record) = decoder::decode(&raw, &self.descriptor, index) {
                self.broker.publish(record);
            }
        }

        // Advance by the count returned, not the count requested
        self.next_index = start + returned;
        Ok(())
    }
}

/// Compute the next fetch window, or None when the poller is caught up
///
/// The window is `[next_index, end]` inclusive, clamped to both the tree head
/// and the batch size.
pub fn batch_window(next_index: u64, tree_size: u64, batch_size: u64) -> Option<(u64, u64)> {
    if tree_size <= next_index {
        return None;
    }
    let end = std::cmp::min(tree_size - 1, next_index + batch_size.max(1) - 1);
    Some((next_index, end))
}

/// Gap before the next attempt after `consecutive_failures` failed polls
///
/// The first failure retries on the normal cadence; each further failure
/// doubles the gap, capped at 2^MAX_BACKOFF_SHIFT intervals so a rate-limiting
/// log is left alone without being abandoned. Resets on the next success.
pub fn backoff_delay(poll_interval: Duration, consecutive_failures: u32) -> Duration {
    let shift = consecutive_failures.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    poll_interval * (1u32 << shift)
}
