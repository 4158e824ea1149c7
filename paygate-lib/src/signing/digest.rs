//! Symmetric signatures for the older protocol.
//!
//! The signature is a digest of the canonical string (with `&key=<secret>`
//! appended) rendered as upper-case hex. Two algorithms exist: plain MD5 and
//! HMAC-SHA256 keyed with the same secret.
//!
//! Computed signatures are always upper-case and a received signature must
//! match that casing exactly. The comparison runs in constant time.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::canonical::canonical_string;
use crate::params::ParameterSet;
use crate::{PaygateError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Older protocol signature algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignType {
    /// MD5 digest of the canonical string.
    #[default]
    #[serde(rename = "MD5")]
    Md5,
    /// HMAC-SHA256 of the canonical string keyed with the secret.
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl SignType {
    /// Tag carried in the `sign_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignType {
    type Err = PaygateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().replace('_', "-").as_str() {
            "MD5" => Ok(Self::Md5),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            other => Err(PaygateError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Sign `params` with the shared secret.
pub fn sign_with_key(params: &ParameterSet, key: &str, sign_type: SignType) -> Result<String> {
    let content = canonical_string(params, Some(key));
    digest(&content, key, sign_type)
}

/// Digest an already canonical string as upper-case hex.
pub fn digest(content: &str, key: &str, sign_type: SignType) -> Result<String> {
    match sign_type {
        SignType::Md5 => Ok(hex::encode_upper(md5::compute(content.as_bytes()).0)),
        SignType::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(key.as_bytes())
                .map_err(|e| PaygateError::Crypto(format!("invalid HMAC key: {e}")))?;
            mac.update(content.as_bytes());
            Ok(hex::encode_upper(mac.finalize().into_bytes()))
        }
    }
}

/// Check a received signature against the one recomputed from `params`.
pub fn verify_with_key(
    params: &ParameterSet,
    key: &str,
    sign_type: SignType,
    signature: &str,
) -> Result<bool> {
    let expected = sign_with_key(params, key, sign_type)?;
    Ok(signatures_match(&expected, signature))
}

/// Case-sensitive, constant-time comparison.
pub fn signatures_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}
