// Certificate Record Model
//
// The normalized record is the universal currency of the pipeline: produced
// once by the decoder, appended to the sliding window, and rendered into the
// three subscriber views.

use super::directory::LogDescriptor;
use serde::{Deserialize, Serialize};

/// The three rendering policies for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamView {
    Full,
    Lite,
    DomainsOnly,
}

impl StreamView {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamView::Full => "full",
            StreamView::Lite => "lite",
            StreamView::DomainsOnly => "domains-only",
        }
    }
}

impl std::fmt::Display for StreamView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subject distinguished name, one key per RDN attribute
///
/// `aggregated` preserves the certificate's own RDN order as a single
/// `/C=…/O=…/CN=…` string; duplicate attributes are last-wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated: Option<String>,
    #[serde(rename = "CN", skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    #[serde(rename = "C", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(rename = "ST", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(rename = "L", skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(rename = "O", skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(rename = "OU", skip_serializing_if = "Option::is_none")]
    pub organizational_unit: Option<String>,
    #[serde(rename = "emailAddress", skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// Textual renderings of the extensions consumers key on
///
/// Missing extensions are simply absent from the serialized map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Extensions {
    #[serde(rename = "subjectAltName", skip_serializing_if = "Option::is_none")]
    pub subject_alt_name: Option<String>,
    #[serde(rename = "keyUsage", skip_serializing_if = "Option::is_none")]
    pub key_usage: Option<String>,
    #[serde(rename = "extendedKeyUsage", skip_serializing_if = "Option::is_none")]
    pub extended_key_usage: Option<String>,
    #[serde(rename = "basicConstraints", skip_serializing_if = "Option::is_none")]
    pub basic_constraints: Option<String>,
}

/// The decoded leaf certificate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeafCert {
    pub subject: Subject,
    pub extensions: Extensions,
    /// Unix seconds, fractional allowed
    pub not_before: f64,
    /// Unix seconds, fractional allowed
    pub not_after: f64,
    /// Decimal rendering of the serial integer
    pub serial_number: String,
    /// Lowercase hex SHA-256 of the DER bytes carried in `as_der`
    pub fingerprint: String,
    /// Base64 DER bytes; absent in the lite view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_der: Option<String>,
    /// Unique domains, CN first if present, then DNS SANs in certificate order
    pub all_domains: Vec<String>,
}

/// One element of the chain appended by the log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainCert {
    pub subject: Subject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_der: Option<String>,
}

/// A normalized certificate record
///
/// Immutable after creation; `(source, cert_index)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub update_type: String,
    pub leaf_cert: LeafCert,
    pub chain: Vec<ChainCert>,
    /// Global index within the source log
    pub cert_index: u64,
    /// Unix seconds at decode time
    pub seen: f64,
    pub source: LogDescriptor,
}

impl Record {
    /// The same record with every DER payload elided
    pub fn to_lite(&self) -> Record {
        let mut lite = self.clone();
        lite.leaf_cert.as_der = None;
        for link in &mut lite.chain {
            link.as_der = None;
        }
        lite
    }

    /// The domains-only rendering
    pub fn to_domains_only(&self) -> DomainsOnly {
        DomainsOnly {
            domains: self.leaf_cert.all_domains.clone(),
            seen: self.seen,
            source: self.source.clone(),
        }
    }
}

/// Payload of the domains-only view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainsOnly {
    pub domains: Vec<String>,
    pub seen: f64,
    pub source: LogDescriptor,
}

/// Outer envelope of every stream message
#[derive(Debug, Serialize)]
pub struct CertificateUpdate<T: Serialize> {
    pub message_type: &'static str,
    pub data: T,
}

/// Serialize the full-view stream message for a record
pub fn encode_full(record: &Record) -> serde_json::Result<String> {
    serde_json::to_string(&CertificateUpdate {
        message_type: "certificate_update",
        data: record,
    })
}

/// Serialize the lite-view stream message for a record
pub fn encode_lite(record: &Record) -> serde_json::Result<String> {
    serde_json::to_string(&CertificateUpdate {
        message_type: "certificate_update",
        data: record.to_lite(),
    })
}

/// Serialize the domains-only stream message for a record
pub fn encode_domains_only(record: &Record) -> serde_json::Result<String> {
    serde_json::to_string(&CertificateUpdate {
        message_type: "certificate_update",
        data: record.to_domains_only(),
    })
}
