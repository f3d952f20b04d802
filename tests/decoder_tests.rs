// Integration tests for the CT leaf decoder
//
// Certificates are built by a small DER encoder below, so the tests are
// deterministic and need no network or fixture files.

use base64::Engine;
use certwire::ct::client::RawEntry;
use certwire::ct::decoder;
use certwire::ct::directory::LogDescriptor;
use sha2::{Digest, Sha256};

/// Minimal DER encoding helpers
mod der {
    pub fn encode_len(len: usize) -> Vec<u8> {
        if len < 128 {
            vec![len as u8]
        } else if len < 256 {
            vec![0x81, len as u8]
        } else {
            vec![0x82, (len >> 8) as u8, (len & 0xff) as u8]
        }
    }

    pub fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        out.extend(encode_len(content.len()));
        out.extend_from_slice(content);
        out
    }

    pub fn seq(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x30, &parts.concat())
    }

    pub fn set(parts: &[Vec<u8>]) -> Vec<u8> {
        tlv(0x31, &parts.concat())
    }

    pub fn oid(bytes: &[u8]) -> Vec<u8> {
        tlv(0x06, bytes)
    }

    pub fn printable(s: &str) -> Vec<u8> {
        tlv(0x13, s.as_bytes())
    }

    pub fn utc_time(s: &str) -> Vec<u8> {
        tlv(0x17, s.as_bytes())
    }

    pub fn integer(bytes: &[u8]) -> Vec<u8> {
        tlv(0x02, bytes)
    }

    pub fn null() -> Vec<u8> {
        tlv(0x05, &[])
    }

    pub fn boolean(value: bool) -> Vec<u8> {
        tlv(0x01, &[if value { 0xff } else { 0x00 }])
    }

    pub fn bit_string(bytes: &[u8]) -> Vec<u8> {
        let mut content = vec![0u8];
        content.extend_from_slice(bytes);
        tlv(0x03, &content)
    }

    pub fn octet_string(bytes: &[u8]) -> Vec<u8> {
        tlv(0x04, bytes)
    }

    /// Constructed context-specific tag
    pub fn ctx(tag: u8, content: &[u8]) -> Vec<u8> {
        tlv(0xa0 | tag, content)
    }
}

// Attribute and algorithm OIDs
const OID_CN: &[u8] = &[0x55, 0x04, 0x03];
const OID_C: &[u8] = &[0x55, 0x04, 0x06];
const OID_O: &[u8] = &[0x55, 0x04, 0x0a];
const OID_SHA256_RSA: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];
const OID_RSA_ENC: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
const OID_EXT_SAN: &[u8] = &[0x55, 0x1d, 0x11];
const OID_EXT_KEY_USAGE: &[u8] = &[0x55, 0x1d, 0x0f];
const OID_EXT_EKU: &[u8] = &[0x55, 0x1d, 0x25];
const OID_EXT_BASIC_CONSTRAINTS: &[u8] = &[0x55, 0x1d, 0x13];
const OID_EKU_SERVER_AUTH: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x01];
const OID_EKU_CLIENT_AUTH: &[u8] = &[0x2b, 0x06, 0x01, 0x05, 0x05, 0x07, 0x03, 0x02];

fn attribute(oid: &[u8], value: &str) -> Vec<u8> {
    der::set(&[der::seq(&[der::oid(oid), der::printable(value)])])
}

fn extension(oid: &[u8], critical: bool, value: &[u8]) -> Vec<u8> {
    let mut parts = vec![der::oid(oid)];
    if critical {
        parts.push(der::boolean(true));
    }
    parts.push(der::octet_string(value));
    der::seq(&parts)
}

fn san_extension(dns_names: &[&str]) -> Vec<u8> {
    // GeneralName dNSName is context tag [2], primitive
    let names: Vec<Vec<u8>> = dns_names
        .iter()
        .map(|name| der::tlv(0x82, name.as_bytes()))
        .collect();
    extension(OID_EXT_SAN, false, &der::seq(&names))
}

fn key_usage_extension() -> Vec<u8> {
    // digitalSignature + keyEncipherment: bits 0 and 2, five unused bits
    extension(OID_EXT_KEY_USAGE, true, &der::tlv(0x03, &[0x05, 0xa0]))
}

fn eku_extension() -> Vec<u8> {
    let value = der::seq(&[der::oid(OID_EKU_SERVER_AUTH), der::oid(OID_EKU_CLIENT_AUTH)]);
    extension(OID_EXT_EKU, false, &value)
}

fn basic_constraints_extension(ca: bool) -> Vec<u8> {
    let value = if ca {
        der::seq(&[der::boolean(true)])
    } else {
        der::seq(&[])
    };
    extension(OID_EXT_BASIC_CONSTRAINTS, true, &value)
}

struct TbsSpec<'a> {
    serial: &'a [u8],
    subject_cn: &'a str,
    subject_extra: Vec<Vec<u8>>,
    extensions: Vec<Vec<u8>>,
}

/// Build a TBSCertificate with fixed issuer and validity 2024-01-01 to
/// 2034-01-01
fn build_tbs(spec: &TbsSpec) -> Vec<u8> {
    let version = der::ctx(0, &der::integer(&[0x02]));
    let serial = der::integer(spec.serial);
    let signature_alg = der::seq(&[der::oid(OID_SHA256_RSA), der::null()]);
    let issuer = der::seq(&[attribute(OID_CN, "Test CA")]);
    let validity = der::seq(&[der::utc_time("240101000000Z"), der::utc_time("340101000000Z")]);

    let mut subject_attrs = vec![attribute(OID_CN, spec.subject_cn)];
    subject_attrs.extend(spec.subject_extra.iter().cloned());
    let subject = der::seq(&subject_attrs);

    let spki = der::seq(&[
        der::seq(&[der::oid(OID_RSA_ENC), der::null()]),
        der::bit_string(&[0x30, 0x03, 0x02, 0x01, 0x03]),
    ]);

    let mut parts = vec![version, serial, signature_alg, issuer, validity, subject, spki];
    if !spec.extensions.is_empty() {
        parts.push(der::ctx(3, &der::seq(&spec.extensions)));
    }
    der::seq(&parts)
}

fn build_certificate(tbs: &[u8]) -> Vec<u8> {
    der::seq(&[
        tbs.to_vec(),
        der::seq(&[der::oid(OID_SHA256_RSA), der::null()]),
        der::bit_string(&[0xaa; 32]),
    ])
}

fn leaf_cert_der() -> Vec<u8> {
    let tbs = build_tbs(&TbsSpec {
        serial: &[0x01, 0xe2, 0x40], // 123456
        subject_cn: "example.com",
        subject_extra: vec![attribute(OID_C, "US"), attribute(OID_O, "Example Corp")],
        extensions: vec![
            san_extension(&["www.example.com", "example.com", "api.example.com"]),
            key_usage_extension(),
            eku_extension(),
            basic_constraints_extension(false),
        ],
    });
    build_certificate(&tbs)
}

fn ca_cert_der(cn: &str) -> Vec<u8> {
    let tbs = build_tbs(&TbsSpec {
        serial: &[0x07],
        subject_cn: cn,
        subject_extra: vec![],
        extensions: vec![basic_constraints_extension(true)],
    });
    build_certificate(&tbs)
}

// RFC 6962 framing helpers

fn u24(len: usize) -> [u8; 3] {
    [(len >> 16) as u8, (len >> 8) as u8, (len & 0xff) as u8]
}

fn x509_leaf(cert_der: &[u8]) -> Vec<u8> {
    // version 0, leaf type 0, zero timestamp, entry type 0x0000
    let mut leaf = vec![0u8; 12];
    leaf.extend_from_slice(&u24(cert_der.len()));
    leaf.extend_from_slice(cert_der);
    leaf
}

fn precert_leaf(tbs_der: &[u8]) -> Vec<u8> {
    let mut leaf = vec![0u8; 10];
    leaf.extend_from_slice(&[0x00, 0x01]); // entry type 0x0001
    leaf.extend_from_slice(&[0u8; 32]); // issuer key hash
    leaf.extend_from_slice(&u24(tbs_der.len()));
    leaf.extend_from_slice(tbs_der);
    leaf
}

fn chain_block(certs: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for cert in certs {
        body.extend_from_slice(&u24(cert.len()));
        body.extend_from_slice(cert);
    }
    let mut out = u24(body.len()).to_vec();
    out.extend(body);
    out
}

fn precert_extra_data(precert: &[u8], chain: &[&[u8]]) -> Vec<u8> {
    let mut out = u24(precert.len()).to_vec();
    out.extend_from_slice(precert);
    out.extend(chain_block(chain));
    out
}

fn source() -> LogDescriptor {
    LogDescriptor::new("https://ct.example.com/2025", "Example Log 2025")
}

// 2024-01-01T00:00:00Z and 2034-01-01T00:00:00Z
const NOT_BEFORE: f64 = 1_704_067_200.0;
const NOT_AFTER: f64 = 2_019_686_400.0;

#[test]
fn x509_entry_decodes_to_record() {
    let cert = leaf_cert_der();
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };

    let record = decoder::decode(&raw, &source(), 42).expect("decode");

    assert_eq!(record.update_type, "X509LogEntry");
    assert_eq!(record.cert_index, 42);
    assert_eq!(record.source.url, "https://ct.example.com/2025");

    let leaf = &record.leaf_cert;
    assert_eq!(leaf.subject.common_name.as_deref(), Some("example.com"));
    assert_eq!(leaf.subject.organization.as_deref(), Some("Example Corp"));
    assert_eq!(leaf.subject.country.as_deref(), Some("US"));
    let aggregated = leaf.subject.aggregated.as_deref().unwrap();
    assert!(aggregated.contains("/CN=example.com"));
    assert!(aggregated.contains("/O=Example Corp"));

    assert_eq!(leaf.serial_number, "123456");
    assert_eq!(leaf.not_before, NOT_BEFORE);
    assert_eq!(leaf.not_after, NOT_AFTER);
}

#[test]
fn x509_entry_der_is_the_framed_payload() {
    let cert = leaf_cert_der();
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };

    let record = decoder::decode(&raw, &source(), 0).expect("decode");
    let as_der = record.leaf_cert.as_der.as_deref().expect("as_der");
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(as_der)
        .expect("base64");

    assert!(!decoded.is_empty());
    assert_eq!(decoded, cert);
    // Fingerprint is the SHA-256 of exactly those bytes, lowercase hex
    assert_eq!(record.leaf_cert.fingerprint, hex::encode(Sha256::digest(&decoded)));
}

#[test]
fn all_domains_has_cn_first_and_no_duplicates() {
    let cert = leaf_cert_der();
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };

    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    // CN leads even though the SAN list starts with www; the duplicate CN
    // entry in the SANs is dropped
    assert_eq!(
        record.leaf_cert.all_domains,
        vec!["example.com", "www.example.com", "api.example.com"]
    );
}

#[test]
fn every_subject_attribute_survives_in_aggregated() {
    // title (2.5.4.12) has no dedicated record field; the second OID is a
    // private-arc attribute (1.3.6.1.4.1.55555.1.1) absent from any registry
    const OID_TITLE: &[u8] = &[0x55, 0x04, 0x0c];
    const OID_PRIVATE: &[u8] = &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x83, 0xb2, 0x03, 0x01, 0x01];

    let tbs = build_tbs(&TbsSpec {
        serial: &[0x05],
        subject_cn: "attrs.example.com",
        subject_extra: vec![
            attribute(OID_TITLE, "Chief Example Officer"),
            attribute(OID_PRIVATE, "widget-7"),
        ],
        extensions: vec![],
    });
    let cert = build_certificate(&tbs);

    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };
    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    let aggregated = record.leaf_cert.subject.aggregated.as_deref().unwrap();
    assert!(aggregated.starts_with("/CN=attrs.example.com"));
    // Attributes without a dedicated field keep their value
    assert!(aggregated.contains("=Chief Example Officer"));
    // Unregistered OIDs fall back to their dotted form
    assert!(aggregated.contains("/1.3.6.1.4.1.55555.1.1=widget-7"));
    // Certificate order is preserved
    assert!(aggregated.ends_with("=widget-7"));
}

#[test]
fn extensions_are_rendered_textually() {
    let cert = leaf_cert_der();
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };

    let record = decoder::decode(&raw, &source(), 0).expect("decode");
    let extensions = &record.leaf_cert.extensions;

    assert_eq!(
        extensions.subject_alt_name.as_deref(),
        Some("DNS:www.example.com, DNS:example.com, DNS:api.example.com")
    );
    assert_eq!(
        extensions.key_usage.as_deref(),
        Some("Digital Signature, Key Encipherment")
    );
    assert_eq!(
        extensions.extended_key_usage.as_deref(),
        Some("TLS Web Server Authentication, TLS Web Client Authentication")
    );
    assert_eq!(extensions.basic_constraints.as_deref(), Some("CA:false"));
}

#[test]
fn chain_is_parsed_in_order() {
    let cert = leaf_cert_der();
    let intermediate = ca_cert_der("Test Intermediate");
    let root = ca_cert_der("Test Root");

    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: chain_block(&[&intermediate, &root]),
    };

    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    assert_eq!(record.chain.len(), 2);
    assert_eq!(
        record.chain[0].subject.common_name.as_deref(),
        Some("Test Intermediate")
    );
    assert_eq!(record.chain[1].subject.common_name.as_deref(), Some("Test Root"));

    let chain_der = base64::engine::general_purpose::STANDARD
        .decode(record.chain[0].as_der.as_deref().unwrap())
        .unwrap();
    assert_eq!(chain_der, intermediate);
}

#[test]
fn unparseable_chain_element_is_skipped() {
    let cert = leaf_cert_der();
    let root = ca_cert_der("Test Root");
    let garbage = [0xde, 0xad, 0xbe, 0xef, 0x00, 0x11];

    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: chain_block(&[&garbage, &root]),
    };

    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    // The bad element is dropped; the record itself survives
    assert_eq!(record.chain.len(), 1);
    assert_eq!(record.chain[0].subject.common_name.as_deref(), Some("Test Root"));
}

#[test]
fn precert_entry_decodes_from_tbs() {
    let tbs = build_tbs(&TbsSpec {
        serial: &[0x2a], // 42
        subject_cn: "precert.example.com",
        subject_extra: vec![],
        extensions: vec![san_extension(&["precert.example.com"])],
    });

    let raw = RawEntry {
        leaf_input: precert_leaf(&tbs),
        extra_data: Vec::new(),
    };

    let record = decoder::decode(&raw, &source(), 7).expect("decode");

    assert_eq!(record.update_type, "X509LogEntry");
    assert_eq!(record.cert_index, 7);
    assert_eq!(record.leaf_cert.serial_number, "42");
    assert_eq!(
        record.leaf_cert.subject.common_name.as_deref(),
        Some("precert.example.com")
    );
    assert_eq!(record.leaf_cert.all_domains, vec!["precert.example.com"]);

    // as_der carries the TBS bytes themselves
    let as_der = base64::engine::general_purpose::STANDARD
        .decode(record.leaf_cert.as_der.as_deref().unwrap())
        .unwrap();
    assert_eq!(as_der, tbs);
    assert_eq!(record.leaf_cert.fingerprint, hex::encode(Sha256::digest(&tbs)));
}

#[test]
fn precert_chain_leads_with_the_signed_precertificate() {
    let tbs = build_tbs(&TbsSpec {
        serial: &[0x2a],
        subject_cn: "precert.example.com",
        subject_extra: vec![],
        extensions: vec![],
    });
    let signed_precert = build_certificate(&tbs);
    let root = ca_cert_der("Test Root");

    let raw = RawEntry {
        leaf_input: precert_leaf(&tbs),
        extra_data: precert_extra_data(&signed_precert, &[&root]),
    };

    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    assert_eq!(record.chain.len(), 2);
    assert_eq!(
        record.chain[0].subject.common_name.as_deref(),
        Some("precert.example.com")
    );
    assert_eq!(record.chain[1].subject.common_name.as_deref(), Some("Test Root"));
}

#[test]
fn truncated_leaf_payload_is_rejected() {
    let cert = leaf_cert_der();
    let mut leaf = vec![0u8; 12];
    // Declared length one byte past the actual payload
    leaf.extend_from_slice(&u24(cert.len() + 1));
    leaf.extend_from_slice(&cert);

    let raw = RawEntry {
        leaf_input: leaf,
        extra_data: Vec::new(),
    };
    assert!(decoder::decode(&raw, &source(), 0).is_none());
}

#[test]
fn reparsing_as_der_matches_the_record() {
    use x509_parser::prelude::*;

    let cert = leaf_cert_der();
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };
    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    let der = base64::engine::general_purpose::STANDARD
        .decode(record.leaf_cert.as_der.as_deref().unwrap())
        .unwrap();
    let (_, reparsed) = X509Certificate::from_der(&der).expect("reparse");

    assert_eq!(
        reparsed.tbs_certificate.serial.to_str_radix(10),
        record.leaf_cert.serial_number
    );
    assert_eq!(
        reparsed.validity().not_before.timestamp() as f64,
        record.leaf_cert.not_before
    );
    assert_eq!(
        reparsed.validity().not_after.timestamp() as f64,
        record.leaf_cert.not_after
    );

    let mut san_dns = Vec::new();
    if let Ok(Some(san)) = reparsed.subject_alternative_name() {
        for name in &san.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                san_dns.push(dns.to_string());
            }
        }
    }
    assert_eq!(
        san_dns,
        vec!["www.example.com", "example.com", "api.example.com"]
    );
}

#[test]
fn lite_view_preserves_everything_but_der() {
    let cert = leaf_cert_der();
    let intermediate = ca_cert_der("Test Intermediate");
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: chain_block(&[&intermediate]),
    };
    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    let lite = record.to_lite();
    assert!(lite.leaf_cert.as_der.is_none());
    assert!(lite.chain.iter().all(|c| c.as_der.is_none()));
    assert_eq!(lite.leaf_cert.fingerprint, record.leaf_cert.fingerprint);
    assert_eq!(lite.leaf_cert.all_domains, record.leaf_cert.all_domains);
    assert_eq!(lite.chain.len(), record.chain.len());
    assert_eq!(lite.cert_index, record.cert_index);
}

#[test]
fn domains_only_view_matches_all_domains() {
    let cert = leaf_cert_der();
    let raw = RawEntry {
        leaf_input: x509_leaf(&cert),
        extra_data: Vec::new(),
    };
    let record = decoder::decode(&raw, &source(), 0).expect("decode");

    let domains = record.to_domains_only();
    assert_eq!(domains.domains, record.leaf_cert.all_domains);
    assert_eq!(domains.seen, record.seen);
    assert_eq!(domains.source, record.source);
}
