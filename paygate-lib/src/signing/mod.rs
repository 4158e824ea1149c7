//! Signature computation and verification for both protocol generations.
//!
//! - [`canonical`]: deterministic `k=v&...` strings for the older protocol
//! - [`digest`]: MD5 / HMAC-SHA256 signatures over canonical strings
//! - [`rsa_sha256`]: SHA256-with-RSA signatures for the newer protocol
//! - [`aead`]: AEAD_AES_256_GCM decryption of certificates and notifications
//!
//! Everything here is synchronous and side-effect free.

pub mod aead;
pub mod canonical;
pub mod digest;
pub mod rsa_sha256;

pub use aead::AEAD_AES_256_GCM;
pub use canonical::{canonical_string, SIGN_FIELD, SIGN_TYPE_FIELD};
pub use digest::{sign_with_key, verify_with_key, SignType};
pub use rsa_sha256::{
    load_private_key, response_source, sign_sha256_rsa, verify_sha256_rsa, RequestAuthorization,
};

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Random 32 character alphanumeric nonce.
pub fn generate_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Current unix time in seconds, as the protocols transmit it.
pub fn timestamp_now() -> String {
    chrono::Utc::now().timestamp().to_string()
}
