//! Terminal rendering of signatures, certificates and gateway replies

use chrono::{DateTime, Utc};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use paygate_lib::{CertificateRecord, V3ErrorDetail};
use serde_json::Value;
use std::time::Duration;

/// Validity of a certificate at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    NotYetValid,
    Valid,
    Expired,
}

impl Validity {
    pub fn of(record: &CertificateRecord, at: DateTime<Utc>) -> Self {
        if at < record.not_before() {
            Self::NotYetValid
        } else if record.is_valid_at(at) {
            Self::Valid
        } else {
            Self::Expired
        }
    }

    fn label(self) -> colored::ColoredString {
        match self {
            Self::Valid => "valid".green(),
            Self::NotYetValid => "not yet valid".yellow(),
            Self::Expired => "expired".red(),
        }
    }
}

/// Print a section title
pub fn title(text: &str) {
    println!("\n{}", text.bold().underline());
}

fn field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<12} {}", format!("{name}:").cyan(), value);
}

/// Print a computed older protocol signature. The secret never appears;
/// `canonical` is shown with it masked.
pub fn signature(sign_type: &str, sign: &str, canonical: Option<&str>) {
    title("Older Protocol Signature");
    field("Sign Type", sign_type);
    if let Some(canonical) = canonical {
        field("Canonical", canonical.dimmed());
    }
    field("Sign", sign.bold());
}

/// Print a certificate with its validity window and status at `now`
pub fn certificate(record: &CertificateRecord, now: DateTime<Utc>) {
    println!("{}", format!("─ {}", record.serial_no()).dimmed());
    field("Subject", record.subject());
    field(
        "Window",
        format!(
            "{} .. {}",
            record.not_before().format("%Y-%m-%d %H:%M:%S UTC"),
            record.not_after().format("%Y-%m-%d %H:%M:%S UTC")
        ),
    );
    field("Status", Validity::of(record, now).label());
}

/// Print the outcome of a signature check. Mismatches go to stderr.
pub fn verdict(verified: bool, serial_no: &str) {
    if verified {
        println!("{} Signature is valid for {}", "✓".green().bold(), serial_no);
    } else {
        eprintln!("{} Signature does not match {}", "✗".red().bold(), serial_no);
    }
}

/// Print a non-fatal note about the input
pub fn caution(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print a verified newer protocol reply
pub fn reply(status_code: u16, data: Option<&Value>) {
    field("Status", status_code.to_string().green());
    match data.map(serde_json::to_string_pretty) {
        Some(Ok(pretty)) => println!("{pretty}"),
        Some(Err(_)) | None => println!("{}", "(empty body)".dimmed()),
    }
}

/// Print the error body of a verified newer protocol reply
pub fn gateway_error(status_code: u16, error: &V3ErrorDetail) {
    field("Status", status_code.to_string().red());
    eprintln!("{} {}: {}", "✗".red().bold(), error.code.bold(), error.message);
    if let Some(Ok(detail)) = error.detail.as_ref().map(serde_json::to_string_pretty) {
        eprintln!("{}", detail.dimmed());
    }
}

/// Create a spinner for a gateway round trip
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
