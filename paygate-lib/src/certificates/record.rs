//! Parsed X.509 certificates.

use chrono::{DateTime, Utc};
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::{PaygateError, Result};

/// A certificate reduced to what verification needs.
///
/// Immutable once built. Validity is recorded but never enforced here.
#[derive(Clone, Debug, PartialEq)]
pub struct CertificateRecord {
    serial_no: String,
    subject: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    public_key: RsaPublicKey,
    der: Vec<u8>,
}

impl CertificateRecord {
    /// Parse the first certificate of a PEM document.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let (_, pem) = parse_x509_pem(pem)
            .map_err(|e| PaygateError::Certificate(format!("invalid PEM: {e}")))?;
        if pem.label != "CERTIFICATE" {
            return Err(PaygateError::Certificate(format!(
                "expected CERTIFICATE, found {}",
                pem.label
            )));
        }
        Self::from_der(pem.contents)
    }

    /// Parse DER-encoded certificate bytes.
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| PaygateError::Certificate(format!("failed to parse certificate: {e}")))?;

        let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| PaygateError::Certificate(format!("certificate key is not RSA: {e}")))?;

        let validity = cert.validity();
        let not_before = to_utc(validity.not_before.timestamp())?;
        let not_after = to_utc(validity.not_after.timestamp())?;

        Ok(Self {
            serial_no: serial_hex(cert.raw_serial()),
            subject: cert.subject().to_string(),
            not_before,
            not_after,
            public_key,
            der,
        })
    }

    /// Upper-case hex serial number.
    pub fn serial_no(&self) -> &str {
        &self.serial_no
    }

    /// Subject distinguished name.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Start of the validity window.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// End of the validity window.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `at` falls inside the validity window. Informational only.
    pub fn is_valid_at(&self, at: DateTime<Utc>) -> bool {
        self.not_before <= at && at <= self.not_after
    }

    /// Public key used to verify gateway signatures.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Raw DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }
}

/// Serial as upper-case hex without the DER sign padding.
fn serial_hex(raw: &[u8]) -> String {
    let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len().saturating_sub(1));
    hex::encode_upper(&raw[start..])
}

fn to_utc(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| PaygateError::Certificate(format!("validity out of range: {timestamp}")))
}
