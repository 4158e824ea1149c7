//! AEAD_AES_256_GCM decryption of gateway-issued payloads.
//!
//! Platform certificates and notification resources arrive encrypted with
//! AES-256-GCM under the merchant's v3 key.
//!
//! # Wire Format
//!
//! ```text
//! key:             32 raw bytes (the v3 key string as UTF-8)
//! nonce:           12 raw bytes (a 12 character string)
//! associated_data: UTF-8 string, may be empty
//! ciphertext:      base64([encrypted bytes][16 bytes auth tag])
//! ```

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::{PaygateError, Result};

/// The only supported algorithm identifier.
pub const AEAD_AES_256_GCM: &str = "AEAD_AES_256_GCM";

/// Size of the key in bytes.
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits for GCM).
const NONCE_SIZE: usize = 12;

/// Size of the authentication tag in bytes.
const TAG_SIZE: usize = 16;

fn cipher(key: &str) -> Result<Aes256Gcm> {
    let key = key.as_bytes();
    if key.len() != KEY_SIZE {
        return Err(PaygateError::Crypto(format!(
            "v3 key must be {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key).map_err(|e| PaygateError::Crypto(e.to_string()))
}

fn nonce(nonce: &str) -> Result<&Nonce<aes_gcm::aead::consts::U12>> {
    if nonce.len() != NONCE_SIZE {
        return Err(PaygateError::Crypto(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    Ok(Nonce::from_slice(nonce.as_bytes()))
}

/// Decrypt a payload after checking its algorithm identifier.
pub fn decrypt(
    algorithm: &str,
    key: &str,
    nonce_str: &str,
    associated_data: &str,
    ciphertext: &str,
) -> Result<Vec<u8>> {
    if algorithm != AEAD_AES_256_GCM {
        return Err(PaygateError::UnsupportedAlgorithm(algorithm.to_string()));
    }

    let encrypted = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| PaygateError::Crypto(format!("ciphertext is not base64: {e}")))?;
    if encrypted.len() < TAG_SIZE {
        return Err(PaygateError::Crypto("ciphertext shorter than tag".to_string()));
    }

    cipher(key)?
        .decrypt(
            nonce(nonce_str)?,
            Payload {
                msg: &encrypted,
                aad: associated_data.as_bytes(),
            },
        )
        .map_err(|_| PaygateError::Crypto("authentication failed".to_string()))
}

/// Decrypt a payload whose plaintext is UTF-8 text (PEM, JSON).
pub fn decrypt_to_string(
    algorithm: &str,
    key: &str,
    nonce_str: &str,
    associated_data: &str,
    ciphertext: &str,
) -> Result<String> {
    let plaintext = decrypt(algorithm, key, nonce_str, associated_data, ciphertext)?;
    String::from_utf8(plaintext)
        .map_err(|e| PaygateError::Crypto(format!("plaintext is not UTF-8: {e}")))
}

/// Encrypt `plaintext` into the base64 ciphertext format the gateway uses.
pub fn encrypt(key: &str, nonce_str: &str, associated_data: &str, plaintext: &[u8]) -> Result<String> {
    let encrypted = cipher(key)?
        .encrypt(
            nonce(nonce_str)?,
            Payload {
                msg: plaintext,
                aad: associated_data.as_bytes(),
            },
        )
        .map_err(|e| PaygateError::Crypto(format!("encryption failed: {e}")))?;
    Ok(STANDARD.encode(encrypted))
}
