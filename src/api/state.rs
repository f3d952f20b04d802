// Shared Application State

use crate::stream::broker::FanOutBroker;
use crate::stream::buffer::CertBuffer;
use serde::Serialize;
use std::sync::Arc;

/// Effective configuration, echoed by `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    /// Seconds between STH polls
    pub poll_interval: u64,
    pub batch_size: u64,
    pub buffer_size: usize,
    /// Seconds a subscriber may go without pinging
    pub client_ping_timeout: u64,
}

/// State shared by every HTTP handler
pub struct AppState {
    pub buffer: Arc<CertBuffer>,
    pub broker: Arc<FanOutBroker>,
    pub config: ConfigSnapshot,
}

impl AppState {
    pub fn new(buffer: Arc<CertBuffer>, broker: Arc<FanOutBroker>, config: ConfigSnapshot) -> Self {
        Self {
            buffer,
            broker,
            config,
        }
    }
}
