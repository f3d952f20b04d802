// Fan-out Broker
//
// Receives every decoded record, appends it to the sliding window, and
// multicasts it to the subscribers of each view. Each view's JSON payload is
// serialized once per record, never once per subscriber. Slow subscribers
// lose their oldest queued payloads; producers never block.

use super::buffer::CertBuffer;
use crate::ct::record::{self, Record, StreamView};
use crate::error::CtError;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

/// Per-view subscriber counts, as reported by `/stats`
#[derive(Debug, Clone, Serialize)]
pub struct ClientCounts {
    pub full_stream: usize,
    pub lite_stream: usize,
    pub domains_only_stream: usize,
    pub total: usize,
}

/// Multicasts records to every attached subscriber
///
/// One broadcast channel per view carries the serialized payloads; each
/// receiver has an independent bounded queue with drop-oldest semantics (the
/// channel capacity is the configured queue size rounded up to a power of
/// two). Lag counts feed the broker-wide drop counter.
pub struct FanOutBroker {
    buffer: Arc<CertBuffer>,
    max_clients_per_endpoint: usize,
    full_tx: broadcast::Sender<Arc<String>>,
    lite_tx: broadcast::Sender<Arc<String>>,
    domains_tx: broadcast::Sender<Arc<String>>,
    dropped: AtomicU64,
}

impl FanOutBroker {
    pub fn new(buffer: Arc<CertBuffer>, max_clients_per_endpoint: usize, queue_size: usize) -> Self {
        let queue_size = queue_size.max(1);
        let (full_tx, _) = broadcast::channel(queue_size);
        let (lite_tx, _) = broadcast::channel(queue_size);
        let (domains_tx, _) = broadcast::channel(queue_size);

        Self {
            buffer,
            max_clients_per_endpoint,
            full_tx,
            lite_tx,
            domains_tx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Single entry point from the pollers
    ///
    /// Appends to the buffer first, then fans out; `/latest.json` may show a
    /// record before a subscriber receives it. Views with no subscribers are
    /// not serialized at all.
    pub fn publish(&self, record: Record) {
        let record = Arc::new(record);
        self.buffer.add(Arc::clone(&record));

        self.send_view(&self.full_tx, || record::encode_full(&record));
        self.send_view(&self.lite_tx, || record::encode_lite(&record));
        self.send_view(&self.domains_tx, || record::encode_domains_only(&record));
    }

    fn send_view<F>(&self, tx: &broadcast::Sender<Arc<String>>, encode: F)
    where
        F: FnOnce() -> serde_json::Result<String>,
    {
        if tx.receiver_count() == 0 {
            return;
        }
        match encode() {
            Ok(payload) => {
                // Err means every receiver detached since the count check
                let _ = tx.send(Arc::new(payload));
            }
            Err(e) => warn!("Failed to serialize record: {}", e),
        }
    }

    /// Attach a subscriber to a view
    ///
    /// Refused when the view is at its client cap; the caller closes the
    /// socket with the refusal reason.
    pub fn attach(&self, view: StreamView) -> Result<broadcast::Receiver<Arc<String>>, CtError> {
        let tx = self.sender(view);
        if tx.receiver_count() >= self.max_clients_per_endpoint {
            return Err(CtError::MaxClientsReached);
        }
        Ok(tx.subscribe())
    }

    fn sender(&self, view: StreamView) -> &broadcast::Sender<Arc<String>> {
        match view {
            StreamView::Full => &self.full_tx,
            StreamView::Lite => &self.lite_tx,
            StreamView::DomainsOnly => &self.domains_tx,
        }
    }

    /// Current subscriber counts per view
    pub fn client_counts(&self) -> ClientCounts {
        let full = self.full_tx.receiver_count();
        let lite = self.lite_tx.receiver_count();
        let domains = self.domains_tx.receiver_count();
        ClientCounts {
            full_stream: full,
            lite_stream: lite,
            domains_only_stream: domains,
            total: full + lite + domains,
        }
    }

    /// Record `n` messages dropped from a saturated subscriber queue
    pub fn note_dropped(&self, n: u64) {
        self.dropped.fetch_add(n, Ordering::Relaxed);
    }

    /// Total messages dropped across all subscribers since start
    pub fn dropped_total(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Configured per-endpoint client cap
    pub fn max_clients_per_endpoint(&self) -> usize {
        self.max_clients_per_endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ct::directory::LogDescriptor;
    use crate::ct::record::{Extensions, LeafCert, Subject};

    fn record(index: u64) -> Record {
        Record {
            update_type: "X509LogEntry".to_string(),
            leaf_cert: LeafCert {
                subject: Subject {
                    common_name: Some("example.com".to_string()),
                    ..Default::default()
                },
                extensions: Extensions::default(),
                not_before: 0.0,
                not_after: 0.0,
                serial_number: index.to_string(),
                fingerprint: "00".repeat(32),
                as_der: Some("AAAA".to_string()),
                all_domains: vec!["example.com".to_string()],
            },
            chain: Vec::new(),
            cert_index: index,
            seen: index as f64,
            source: LogDescriptor::new("https://ct.example.com", "Example Log"),
        }
    }

    fn broker(max_clients: usize, queue: usize) -> FanOutBroker {
        FanOutBroker::new(Arc::new(CertBuffer::new(8)), max_clients, queue)
    }

    #[tokio::test]
    async fn test_publish_reaches_buffer_without_subscribers() {
        let buffer = Arc::new(CertBuffer::new(8));
        let broker = FanOutBroker::new(Arc::clone(&buffer), 4, 16);

        broker.publish(record(1));

        assert_eq!(buffer.stats().total_processed, 1);
        assert_eq!(buffer.example().unwrap().cert_index, 1);
    }

    #[tokio::test]
    async fn test_attach_respects_client_cap() {
        let broker = broker(2, 16);

        let _a = broker.attach(StreamView::Full).unwrap();
        let _b = broker.attach(StreamView::Full).unwrap();
        assert!(matches!(
            broker.attach(StreamView::Full),
            Err(CtError::MaxClientsReached)
        ));

        // Other views are unaffected by a full view's cap
        assert!(broker.attach(StreamView::Lite).is_ok());
    }

    #[tokio::test]
    async fn test_detach_frees_capacity() {
        let broker = broker(1, 16);

        let rx = broker.attach(StreamView::DomainsOnly).unwrap();
        assert!(broker.attach(StreamView::DomainsOnly).is_err());

        drop(rx);
        assert!(broker.attach(StreamView::DomainsOnly).is_ok());
    }

    #[tokio::test]
    async fn test_client_counts() {
        let broker = broker(10, 16);

        let _full = broker.attach(StreamView::Full).unwrap();
        let _lite1 = broker.attach(StreamView::Lite).unwrap();
        let _lite2 = broker.attach(StreamView::Lite).unwrap();

        let counts = broker.client_counts();
        assert_eq!(counts.full_stream, 1);
        assert_eq!(counts.lite_stream, 2);
        assert_eq!(counts.domains_only_stream, 0);
        assert_eq!(counts.total, 3);
    }

    #[tokio::test]
    async fn test_drop_counter() {
        let broker = broker(10, 16);
        assert_eq!(broker.dropped_total(), 0);

        broker.note_dropped(3);
        broker.note_dropped(2);
        assert_eq!(broker.dropped_total(), 5);
    }
}
