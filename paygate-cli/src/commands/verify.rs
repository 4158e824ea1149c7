//! Verify command - check a newer protocol reply signature offline

use anyhow::{bail, Context, Result};
use chrono::Utc;
use paygate_lib::signing::rsa_sha256::{response_source, verify_sha256_rsa};
use paygate_lib::CertificateRecord;
use std::path::Path;

use crate::ui::{self, Validity};

pub async fn run(
    certificate: &Path,
    timestamp: &str,
    nonce: &str,
    signature: &str,
    body: &Path,
) -> Result<()> {
    let pem = std::fs::read(certificate)
        .with_context(|| format!("Failed to read certificate {}", certificate.display()))?;
    let record = CertificateRecord::from_pem(&pem)?;
    let body = std::fs::read_to_string(body)
        .with_context(|| format!("Failed to read body {}", body.display()))?;

    let now = Utc::now();
    ui::title("Reply Signature");
    ui::certificate(&record, now);
    if Validity::of(&record, now) != Validity::Valid {
        ui::caution("Certificate is outside its validity window");
    }

    let verified = verify_signature(&record, timestamp, nonce, signature, &body);
    ui::verdict(verified, record.serial_no());
    if !verified {
        bail!("sign check fail");
    }
    Ok(())
}

pub fn verify_signature(
    record: &CertificateRecord,
    timestamp: &str,
    nonce: &str,
    signature: &str,
    body: &str,
) -> bool {
    let source = response_source(timestamp, nonce, body);
    tracing::debug!(serial_no = record.serial_no(), len = source.len(), "verifying reply");
    verify_sha256_rsa(record.public_key(), &source, signature)
}
