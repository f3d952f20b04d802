// CT Log API Client
//
// Thin HTTP layer over the RFC 6962 read endpoints. Each call is a single
// request; pacing and failure backoff are the poller's concern, since both
// are driven by the log's poll cadence.

use super::Result;
use crate::constants::HTTP_REQUEST_TIMEOUT;
use crate::error::CtError;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// CT Log API client
pub struct CtClient {
    client: reqwest::Client,
}

impl CtClient {
    /// Create a new CT log API client
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { client }
    }

    /// Fetch the log's current Signed Tree Head
    pub async fn get_sth(&self, log_url: &str) -> Result<SignedTreeHead> {
        let url = format!("{}/ct/v1/get-sth", log_url.trim_end_matches('/'));
        self.fetch_json(&url).await
    }

    /// Fetch entries `start..=end` from the log
    ///
    /// The log may return fewer entries than requested; callers must advance
    /// by the count actually returned.
    pub async fn get_entries(&self, log_url: &str, start: u64, end: u64) -> Result<Vec<EntryResponse>> {
        let url = format!(
            "{}/ct/v1/get-entries?start={}&end={}",
            log_url.trim_end_matches('/'),
            start,
            end
        );

        debug!("Fetching entries {} to {}", start, end);

        let response: EntriesResponse = self.fetch_json(&url).await?;
        Ok(response.entries)
    }

    /// One GET, decoded as JSON
    ///
    /// Non-success statuses (including 429 and 5xx) surface as errors for the
    /// poller to back off on; nothing is retried here.
    async fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CtError::HttpError {
                status: status.as_u16(),
                details: format!("{} returned {}", url, status),
            });
        }

        response.json().await.map_err(|e| CtError::ParseError {
            message: format!("Bad response from {}: {}", url, e),
        })
    }
}

impl Default for CtClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Signed Tree Head response (RFC 6962 Section 4.3)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub timestamp: u64,
    pub sha256_root_hash: String,
    pub tree_head_signature: String,
}

/// get-entries API response
#[derive(Debug, Deserialize, Serialize)]
struct EntriesResponse {
    entries: Vec<EntryResponse>,
}

/// Individual CT log entry as returned by the API, fields base64-encoded
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntryResponse {
    pub leaf_input: String,
    pub extra_data: String,
}

impl EntryResponse {
    /// Base64-decode both fields into a raw entry
    pub fn decode(&self) -> Result<RawEntry> {
        let engine = &base64::engine::general_purpose::STANDARD;
        Ok(RawEntry {
            leaf_input: engine.decode(&self.leaf_input)?,
            extra_data: engine.decode(&self.extra_data)?,
        })
    }
}

/// A CT log entry after base64 decoding
#[derive(Debug, Clone)]
pub struct RawEntry {
    /// RFC 6962 MerkleTreeLeaf bytes
    pub leaf_input: Vec<u8>,
    /// Chain bytes (CertificateChain or PrecertChainEntry framing)
    pub extra_data: Vec<u8>,
}
