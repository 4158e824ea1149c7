//! Inbound gateway callbacks (payment and refund results).
//!
//! A callback is authenticated exactly like a reply: four header scalars
//! plus the raw body. Its business payload is AEAD-wrapped under the
//! merchant's v3 key.

use serde::{Deserialize, Serialize};

use crate::signing::aead;
use crate::Result;

/// Authentication headers of a callback request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationHeaders {
    pub serial_no: String,
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

impl NotificationHeaders {
    pub fn new(
        serial_no: impl Into<String>,
        timestamp: impl Into<String>,
        nonce: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            serial_no: serial_no.into(),
            timestamp: timestamp.into(),
            nonce: nonce.into(),
            signature: signature.into(),
        }
    }

    /// Pick the `Wechatpay-*` headers out of name/value pairs, matching names
    /// case-insensitively. Missing headers stay empty.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut headers = Self::default();
        for (name, value) in pairs {
            let slot = match name.to_ascii_lowercase().as_str() {
                "wechatpay-serial" => &mut headers.serial_no,
                "wechatpay-timestamp" => &mut headers.timestamp,
                "wechatpay-nonce" => &mut headers.nonce,
                "wechatpay-signature" => &mut headers.signature,
                _ => continue,
            };
            *slot = value.trim().to_string();
        }
        headers
    }
}

/// Encrypted payload of a callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResource {
    pub algorithm: String,
    pub ciphertext: String,
    #[serde(default)]
    pub associated_data: String,
    #[serde(default)]
    pub original_type: String,
    pub nonce: String,
}

impl NotificationResource {
    /// Decrypt into the plaintext JSON document.
    pub fn decrypt(&self, v3_key: &str) -> Result<String> {
        aead::decrypt_to_string(
            &self.algorithm,
            v3_key,
            &self.nonce,
            &self.associated_data,
            &self.ciphertext,
        )
    }
}

/// Callback body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub id: String,
    #[serde(default)]
    pub create_time: String,
    pub event_type: String,
    #[serde(default)]
    pub resource_type: String,
    pub resource: NotificationResource,
    #[serde(default)]
    pub summary: String,
}

/// A verified, decrypted callback.
#[derive(Clone, Debug)]
pub struct Notification<T> {
    pub envelope: NotificationEnvelope,
    pub data: T,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_from_pairs() {
        let headers = NotificationHeaders::from_pairs([
            ("Wechatpay-Serial", "5157F09E"),
            ("wechatpay-timestamp", "1700000000"),
            ("WECHATPAY-NONCE", " n1 "),
            ("Content-Type", "application/json"),
        ]);
        assert_eq!(headers.serial_no, "5157F09E");
        assert_eq!(headers.timestamp, "1700000000");
        assert_eq!(headers.nonce, "n1");
        assert!(headers.signature.is_empty());
    }

    #[test]
    fn test_envelope_shape() {
        let body = r#"{"id":"EV-2018022511223320873","create_time":"2015-05-20T13:29:35+08:00",
            "resource_type":"encrypt-resource","event_type":"TRANSACTION.SUCCESS","summary":"ok",
            "resource":{"original_type":"transaction","algorithm":"AEAD_AES_256_GCM",
            "ciphertext":"...","associated_data":"transaction","nonce":"fdasflkja484w"}}"#;
        let envelope: NotificationEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.event_type, "TRANSACTION.SUCCESS");
        assert_eq!(envelope.resource.original_type, "transaction");
    }
}
