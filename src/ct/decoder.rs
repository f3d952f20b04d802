// CT Leaf Decoder
//
// Pure decoding of an RFC 6962 MerkleTreeLeaf + extra_data pair into a
// normalized certificate record. No I/O; any failure yields None at debug
// severity and the poller moves on to the next entry.

use super::client::RawEntry;
use super::directory::LogDescriptor;
use super::record::{ChainCert, Extensions, LeafCert, Record, Subject};
use crate::constants::{
    ENTRY_TYPE_PRECERT, ENTRY_TYPE_X509, LEAF_ENTRY_TYPE_OFFSET, LEAF_PRECERT_PAYLOAD_OFFSET,
    LEAF_X509_PAYLOAD_OFFSET, U24_LEN,
};
use base64::Engine;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;
use x509_parser::der_parser::oid::Oid;
use x509_parser::prelude::*;

/// Decode one raw entry into a record
///
/// Returns None for unknown entry types, framing over/underruns, and
/// certificates the X.509 parser rejects.
pub fn decode(raw: &RawEntry, source: &LogDescriptor, index: u64) -> Option<Record> {
    let leaf = &raw.leaf_input;

    if leaf.len() < LEAF_X509_PAYLOAD_OFFSET {
        debug!("Leaf {} from {} too short: {} bytes", index, source.url, leaf.len());
        return None;
    }

    // MerkleTreeLeaf: version, leaf_type, 8-byte timestamp, 2-byte entry type
    if leaf[0] != 0 {
        debug!("Leaf {} has unsupported version {}", index, leaf[0]);
        return None;
    }
    if leaf[1] != 0 {
        debug!("Leaf {} has unsupported leaf type {}", index, leaf[1]);
        return None;
    }

    let entry_type = u16::from_be_bytes([leaf[LEAF_ENTRY_TYPE_OFFSET], leaf[LEAF_ENTRY_TYPE_OFFSET + 1]]);

    let der = match entry_type {
        ENTRY_TYPE_X509 => length_prefixed(leaf, LEAF_X509_PAYLOAD_OFFSET)?,
        ENTRY_TYPE_PRECERT => {
            // 32 bytes of issuer_key_hash precede the TBSCertificate
            if leaf.len() < LEAF_PRECERT_PAYLOAD_OFFSET {
                debug!("Precert leaf {} too short for issuer key hash", index);
                return None;
            }
            length_prefixed(leaf, LEAF_PRECERT_PAYLOAD_OFFSET)?
        }
        other => {
            debug!("Leaf {} has unknown entry type {}", index, other);
            return None;
        }
    };

    let leaf_cert = match entry_type {
        ENTRY_TYPE_PRECERT => extract_precert(der),
        _ => extract_certificate(der),
    };

    let leaf_cert = match leaf_cert {
        Some(cert) => cert,
        None => {
            debug!("Failed to parse certificate in leaf {} from {}", index, source.url);
            return None;
        }
    };

    let chain = parse_chain(&raw.extra_data, entry_type);

    Some(Record {
        update_type: "X509LogEntry".to_string(),
        leaf_cert,
        chain,
        cert_index: index,
        seen: Utc::now().timestamp_micros() as f64 / 1_000_000.0,
        source: source.clone(),
    })
}

/// Read a 24-bit big-endian length at `offset` and return the bytes it covers
fn length_prefixed(buf: &[u8], offset: usize) -> Option<&[u8]> {
    let len = read_u24(buf, offset)?;
    let start = offset + U24_LEN;
    buf.get(start..start + len)
}

/// Read a 24-bit big-endian integer at `offset`
fn read_u24(buf: &[u8], offset: usize) -> Option<usize> {
    let bytes = buf.get(offset..offset + U24_LEN)?;
    Some(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) as usize)
}

/// Extract leaf fields from a full DER-encoded certificate
fn extract_certificate(der: &[u8]) -> Option<LeafCert> {
    let (_, cert) = X509Certificate::from_der(der).ok()?;
    Some(leaf_from_tbs(&cert.tbs_certificate, der))
}

/// Extract leaf fields from a TBSCertificate (precertificate payload)
///
/// TBSCertificates lack the issuer signature wrapper, so they are parsed
/// directly; the record's as_der carries the TBS bytes.
fn extract_precert(der: &[u8]) -> Option<LeafCert> {
    let (_, tbs) = TbsCertificate::from_der(der).ok()?;
    Some(leaf_from_tbs(&tbs, der))
}

fn leaf_from_tbs(tbs: &TbsCertificate, der: &[u8]) -> LeafCert {
    let subject = subject_from_name(&tbs.subject);

    let san_dns = dns_sans(tbs);
    let extensions = extract_extensions(tbs, &san_dns);
    let all_domains = collect_domains(subject.common_name.as_deref(), &san_dns);

    LeafCert {
        subject,
        extensions,
        not_before: tbs.validity.not_before.timestamp() as f64,
        not_after: tbs.validity.not_after.timestamp() as f64,
        serial_number: tbs.serial.to_str_radix(10),
        fingerprint: hex::encode(Sha256::digest(der)),
        as_der: Some(base64::engine::general_purpose::STANDARD.encode(der)),
        all_domains,
    }
}

/// Flatten the subject DN into per-attribute keys plus the aggregated string
///
/// Every attribute lands in `aggregated` in certificate order, keyed by its
/// registry abbreviation or dotted OID, so nothing in the DN is lost; the
/// dedicated struct fields cover the attributes consumers key on. Duplicate
/// attributes are last-wins for the fields.
fn subject_from_name(name: &X509Name) -> Subject {
    let mut subject = Subject::default();
    let mut aggregated = String::new();

    for rdn in name.iter_rdn() {
        for attr in rdn.iter() {
            let value = match attr.as_str() {
                Ok(v) => v.to_string(),
                Err(_) => continue,
            };

            let oid = attr.attr_type();
            if oid == &oid_registry::OID_X509_COMMON_NAME {
                subject.common_name = Some(value.clone());
            } else if oid == &oid_registry::OID_X509_COUNTRY_NAME {
                subject.country = Some(value.clone());
            } else if oid == &oid_registry::OID_X509_STATE_OR_PROVINCE_NAME {
                subject.state = Some(value.clone());
            } else if oid == &oid_registry::OID_X509_LOCALITY_NAME {
                subject.locality = Some(value.clone());
            } else if oid == &oid_registry::OID_X509_ORGANIZATION_NAME {
                subject.organization = Some(value.clone());
            } else if oid == &oid_registry::OID_X509_ORGANIZATIONAL_UNIT {
                subject.organizational_unit = Some(value.clone());
            } else if oid == &oid_registry::OID_PKCS9_EMAIL_ADDRESS {
                subject.email_address = Some(value.clone());
            }

            aggregated.push('/');
            aggregated.push_str(&attribute_key(oid));
            aggregated.push('=');
            aggregated.push_str(&value);
        }
    }

    if !aggregated.is_empty() {
        subject.aggregated = Some(aggregated);
    }
    subject
}

/// Abbreviated name of a DN attribute, falling back to the dotted OID
fn attribute_key(oid: &Oid) -> String {
    match x509_parser::objects::oid2abbrev(oid, x509_parser::objects::oid_registry()) {
        Ok(abbrev) => abbrev.to_string(),
        Err(_) => oid.to_id_string(),
    }
}

/// DNS-type SANs in certificate order
fn dns_sans(tbs: &TbsCertificate) -> Vec<String> {
    let mut sans = Vec::new();
    if let Ok(Some(san_ext)) = tbs.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                sans.push(dns.to_string());
            }
        }
    }
    sans
}

fn extract_extensions(tbs: &TbsCertificate, san_dns: &[String]) -> Extensions {
    let mut extensions = Extensions::default();

    if tbs.subject_alternative_name().ok().flatten().is_some() {
        let joined = san_dns
            .iter()
            .map(|dns| format!("DNS:{}", dns))
            .collect::<Vec<_>>()
            .join(", ");
        extensions.subject_alt_name = Some(joined);
    }

    if let Ok(Some(ku)) = tbs.key_usage() {
        extensions.key_usage = Some(key_usage_string(ku.value));
    }

    if let Ok(Some(eku)) = tbs.extended_key_usage() {
        extensions.extended_key_usage = Some(extended_key_usage_string(eku.value));
    }

    if let Ok(Some(bc)) = tbs.basic_constraints() {
        extensions.basic_constraints = Some(if bc.value.ca {
            "CA:true".to_string()
        } else {
            "CA:false".to_string()
        });
    }

    extensions
}

fn key_usage_string(ku: &KeyUsage) -> String {
    let mut parts = Vec::new();
    if ku.digital_signature() {
        parts.push("Digital Signature");
    }
    if ku.non_repudiation() {
        parts.push("Non Repudiation");
    }
    if ku.key_encipherment() {
        parts.push("Key Encipherment");
    }
    if ku.data_encipherment() {
        parts.push("Data Encipherment");
    }
    if ku.key_agreement() {
        parts.push("Key Agreement");
    }
    if ku.key_cert_sign() {
        parts.push("Certificate Sign");
    }
    if ku.crl_sign() {
        parts.push("CRL Sign");
    }
    if ku.encipher_only() {
        parts.push("Encipher Only");
    }
    if ku.decipher_only() {
        parts.push("Decipher Only");
    }
    parts.join(", ")
}

fn extended_key_usage_string(eku: &ExtendedKeyUsage) -> String {
    let mut parts = Vec::new();
    if eku.any {
        parts.push("Any Extended Key Usage");
    }
    if eku.server_auth {
        parts.push("TLS Web Server Authentication");
    }
    if eku.client_auth {
        parts.push("TLS Web Client Authentication");
    }
    if eku.code_signing {
        parts.push("Code Signing");
    }
    if eku.email_protection {
        parts.push("E-mail Protection");
    }
    if eku.time_stamping {
        parts.push("Time Stamping");
    }
    if eku.ocsp_signing {
        parts.push("OCSP Signing");
    }
    parts.join(", ")
}

/// CN first if present, then DNS SANs in certificate order, no duplicates
fn collect_domains(common_name: Option<&str>, san_dns: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = Vec::new();
    if let Some(cn) = common_name {
        domains.push(cn.to_string());
    }
    for dns in san_dns {
        if !domains.iter().any(|d| d == dns) {
            domains.push(dns.clone());
        }
    }
    domains
}

/// Parse the chain certificates out of extra_data
///
/// For an X509Entry the framing is a 24-bit total length followed by
/// length-prefixed DER certificates. For a PrecertEntry the signed
/// precertificate (itself length-prefixed) leads, followed by the same chain
/// block; the precertificate becomes the first chain element. Individual
/// parse failures are skipped, not fatal.
fn parse_chain(extra_data: &[u8], entry_type: u16) -> Vec<ChainCert> {
    let mut chain = Vec::new();
    let mut pos = 0;

    if entry_type == ENTRY_TYPE_PRECERT {
        match length_prefixed(extra_data, 0) {
            Some(der) => {
                if let Some(link) = chain_link(der) {
                    chain.push(link);
                }
                pos = U24_LEN + der.len();
            }
            None => return chain,
        }
    }

    let total = match read_u24(extra_data, pos) {
        Some(total) => total,
        None => return chain,
    };
    pos += U24_LEN;
    let end = std::cmp::min(pos + total, extra_data.len());

    while pos + U24_LEN <= end {
        let cert_len = match read_u24(extra_data, pos) {
            Some(len) => len,
            None => break,
        };
        pos += U24_LEN;

        let der = match extra_data.get(pos..pos + cert_len) {
            Some(der) => der,
            None => break,
        };
        pos += cert_len;

        match chain_link(der) {
            Some(link) => chain.push(link),
            None => debug!("Skipping unparseable chain certificate ({} bytes)", der.len()),
        }
    }

    chain
}

fn chain_link(der: &[u8]) -> Option<ChainCert> {
    let (_, cert) = X509Certificate::from_der(der).ok()?;
    Some(ChainCert {
        subject: subject_from_name(cert.subject()),
        as_der: Some(base64::engine::general_purpose::STANDARD.encode(der)),
    })
}
