// CT Log Directory
//
// Fetches the master list of CT logs and filters it down to the usable ones.

use crate::constants::HTTP_REQUEST_TIMEOUT;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// A single pollable CT log
///
/// The URL is normalized with no trailing slash so the `/ct/v1/...` paths can
/// be appended directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogDescriptor {
    /// Base URL for the log API
    pub url: String,
    /// Human-readable description from the log list
    pub name: String,
}

impl LogDescriptor {
    pub fn new(url: &str, name: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            name: name.to_string(),
        }
    }
}

/// Fetches and filters Google's CT log list
pub struct LogDirectory {
    list_url: String,
    client: reqwest::Client,
}

impl LogDirectory {
    /// Create a directory backed by the given log list URL
    pub fn new(list_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            list_url: list_url.to_string(),
            client,
        }
    }

    /// Fetch the log list and return the usable logs, order preserved
    ///
    /// Only logs whose `state.usable` key is present are retained. Any
    /// network or parse failure yields an empty list; the caller treats an
    /// empty list as a startup error.
    pub async fn list(&self) -> Vec<LogDescriptor> {
        info!("Fetching CT log list from {}", self.list_url);

        let response = match self.client.get(&self.list_url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Failed to fetch CT log list: {}", e);
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            error!(
                "CT log list request failed with status: {}",
                response.status()
            );
            return Vec::new();
        }

        let log_list: CtLogList = match response.json().await {
            Ok(list) => list,
            Err(e) => {
                error!("Failed to parse CT log list: {}", e);
                return Vec::new();
            }
        };

        debug!(
            "Fetched {} operators from CT log list",
            log_list.operators.len()
        );

        let mut descriptors = Vec::new();
        for operator in &log_list.operators {
            for log in &operator.logs {
                let usable = log
                    .state
                    .as_ref()
                    .map(|s| s.usable.is_some())
                    .unwrap_or(false);
                if !usable {
                    continue;
                }

                let name = log
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("{} CT Log", operator.name));
                descriptors.push(LogDescriptor::new(&log.url, &name));
            }
        }

        info!("Loaded {} usable CT logs", descriptors.len());
        descriptors
    }
}

// Google CT log list JSON structures (v3 format)
#[derive(Debug, Deserialize)]
struct CtLogList {
    operators: Vec<Operator>,
}

#[derive(Debug, Deserialize)]
struct Operator {
    name: String,
    #[serde(default)]
    logs: Vec<Log>,
}

#[derive(Debug, Deserialize)]
struct Log {
    description: Option<String>,
    url: String,
    state: Option<LogState>,
}

#[derive(Debug, Deserialize)]
struct LogState {
    usable: Option<UsableState>,
}

// Empty struct used as marker; presence indicates the log is usable
#[derive(Debug, Deserialize)]
struct UsableState {}
