//! SHA256-with-RSA signatures for the newer protocol.
//!
//! Every signed message is a list of fields each followed by `\n`:
//!
//! ```text
//! reply / notification:  {timestamp}\n{nonce}\n{body}\n
//! outbound request:      {METHOD}\n{path?query}\n{timestamp}\n{nonce}\n{body}\n
//! client-side payment:   {app_id}\n{timestamp}\n{nonce}\n{package}\n
//! ```
//!
//! Signatures travel as standard base64 of the PKCS#1 v1.5 signature.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

use crate::{PaygateError, Result};

/// Authorization scheme of newer protocol requests.
pub const AUTH_SCHEME: &str = "WECHATPAY2-SHA256-RSA2048";

/// Join fields, each terminated by a newline.
fn join_lines(fields: &[&str]) -> String {
    let mut source = String::with_capacity(fields.iter().map(|f| f.len() + 1).sum());
    for field in fields {
        source.push_str(field);
        source.push('\n');
    }
    source
}

/// Source string of a reply or notification signature.
pub fn response_source(timestamp: &str, nonce: &str, body: &str) -> String {
    join_lines(&[timestamp, nonce, body])
}

/// Source string of an outbound request signature.
pub fn request_source(method: &str, path_and_query: &str, timestamp: &str, nonce: &str, body: &str) -> String {
    join_lines(&[method, path_and_query, timestamp, nonce, body])
}

/// Source string of a client-side payment signature.
pub fn sdk_source(app_id: &str, timestamp: &str, nonce: &str, package: &str) -> String {
    join_lines(&[app_id, timestamp, nonce, package])
}

/// Verify a base64 SHA256-with-RSA signature. Pure predicate: malformed
/// input is simply `false`.
pub fn verify_sha256_rsa(public_key: &RsaPublicKey, source: &str, signature: &str) -> bool {
    let Ok(raw) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(raw.as_slice()) else {
        return false;
    };
    VerifyingKey::<Sha256>::new(public_key.clone())
        .verify(source.as_bytes(), &signature)
        .is_ok()
}

/// Sign `source` and return the base64 signature.
pub fn sign_sha256_rsa(private_key: &RsaPrivateKey, source: &str) -> Result<String> {
    let signing_key = SigningKey::<Sha256>::new(private_key.clone());
    let signature = signing_key
        .try_sign(source.as_bytes())
        .map_err(|e| PaygateError::Crypto(format!("signing failed: {e}")))?;
    Ok(STANDARD.encode(signature.to_bytes()))
}

/// Parse an RSA private key from PEM (PKCS#8 `PRIVATE KEY` or PKCS#1
/// `RSA PRIVATE KEY`).
pub fn load_private_key(pem: &str) -> Result<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| PaygateError::Crypto(format!("invalid private key: {e}")))
}

/// Credentials attached to one outbound newer protocol request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestAuthorization {
    pub mch_id: String,
    pub serial_no: String,
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
}

impl RequestAuthorization {
    /// Sign a request with the merchant's private key.
    #[allow(clippy::too_many_arguments)]
    pub fn sign(
        private_key: &RsaPrivateKey,
        mch_id: &str,
        serial_no: &str,
        method: &str,
        path_and_query: &str,
        body: &str,
        timestamp: &str,
        nonce: &str,
    ) -> Result<Self> {
        let source = request_source(method, path_and_query, timestamp, nonce, body);
        Ok(Self {
            mch_id: mch_id.to_string(),
            serial_no: serial_no.to_string(),
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
            signature: sign_sha256_rsa(private_key, &source)?,
        })
    }

    /// Value of the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!(
            "{AUTH_SCHEME} mchid=\"{}\",nonce_str=\"{}\",signature=\"{}\",timestamp=\"{}\",serial_no=\"{}\"",
            self.mch_id, self.nonce, self.signature, self.timestamp, self.serial_no
        )
    }
}
