// Command line arguments for the CertWire server

use crate::constants;
use clap::Parser;
use std::time::Duration;

/// Real-time Certificate Transparency aggregation and stream server
#[derive(Parser, Debug, Clone)]
#[command(name = "certwire", version, about)]
pub struct Args {
    /// Address to bind the HTTP API on
    #[arg(long, default_value = constants::DEFAULT_HOST)]
    pub host: String,

    /// Base port; the lite/full/domains-only WebSocket streams listen on the
    /// three consecutive ports above it
    #[arg(long, default_value_t = constants::DEFAULT_PORT)]
    pub port: u16,

    /// URL of the CT log list to poll
    #[arg(long = "log-list-url", default_value = constants::CT_LOG_LIST_URL)]
    pub log_list_url: String,

    /// Seconds between successive STH polls of a single log
    #[arg(long = "poll-interval", default_value_t = 10)]
    pub poll_interval: u64,

    /// Maximum entries requested per get-entries call
    #[arg(long = "batch-size", default_value_t = constants::DEFAULT_BATCH_SIZE)]
    pub batch_size: u64,

    /// Capacity of the sliding window of recent records
    #[arg(long = "buffer-size", default_value_t = constants::CERTIFICATE_BUFFER_SIZE)]
    pub buffer_size: usize,

    /// Seconds a subscriber may go without sending a ping before disconnect
    #[arg(long = "ping-timeout", default_value_t = 60)]
    pub ping_timeout: u64,

    /// Maximum subscribers per stream endpoint
    #[arg(long = "max-clients", default_value_t = constants::MAX_CLIENTS_PER_ENDPOINT)]
    pub max_clients: usize,

    /// Per-subscriber queue capacity
    #[arg(long = "queue-size", default_value_t = constants::CLIENT_QUEUE_SIZE)]
    pub queue_size: usize,

    /// Maximum number of concurrent log pollers
    #[arg(long = "max-workers", default_value_t = constants::MAX_WORKERS)]
    pub max_workers: usize,

    /// Suppress the startup banner
    #[arg(long)]
    pub quiet: bool,
}

impl Args {
    /// Poll interval as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// Ping timeout as a Duration
    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }
}
