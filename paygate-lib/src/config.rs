//! Merchant credentials and transport configuration.
//!
//! # Environment Variables
//!
//! [`GatewayOptions::from_env`] reads:
//! - `PAYGATE_APP_ID` - application identifier
//! - `PAYGATE_MCH_ID` - merchant identifier
//! - `PAYGATE_KEY` - older protocol signing secret
//! - `PAYGATE_V3_KEY` - newer protocol AEAD key (32 bytes)
//! - `PAYGATE_CERTIFICATE` or `PAYGATE_CERTIFICATE_PATH` - client certificate PEM
//! - `PAYGATE_PRIVATE_KEY` or `PAYGATE_PRIVATE_KEY_PATH` - client private key PEM
//! - `PAYGATE_CERTIFICATE_SERIAL_NO` - client certificate serial (optional)

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::certificates::CertificateRecord;
use crate::{PaygateError, Result};

/// Default gateway API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.mch.weixin.qq.com";

/// Credentials of one merchant, read-only for the lifetime of a call.
///
/// Fields are plain strings so options can be loaded from any serde source;
/// emptiness is checked per call by the `require_*` helpers. The secrets
/// (`key`, `v3_key`, `private_key`) are zeroized on drop.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct GatewayOptions {
    /// Application identifier.
    #[serde(default)]
    pub app_id: String,

    /// Merchant identifier.
    #[serde(default)]
    pub mch_id: String,

    /// Older protocol signing secret.
    #[serde(default)]
    pub key: String,

    /// Newer protocol AEAD key used to decrypt certificates and notifications.
    #[serde(default)]
    pub v3_key: String,

    /// Client certificate (PEM).
    #[serde(default)]
    pub certificate: String,

    /// Client private key (PEM, PKCS#8 or PKCS#1).
    #[serde(default)]
    pub private_key: String,

    /// Client certificate serial. Derived from `certificate` when empty.
    #[serde(default)]
    pub certificate_serial_no: String,
}

impl std::fmt::Debug for GatewayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayOptions")
            .field("app_id", &self.app_id)
            .field("mch_id", &self.mch_id)
            .field("key", &redacted(&self.key))
            .field("v3_key", &redacted(&self.v3_key))
            .field("certificate", &redacted(&self.certificate))
            .field("private_key", &redacted(&self.private_key))
            .field("certificate_serial_no", &self.certificate_serial_no)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl GatewayOptions {
    /// Create options for a merchant.
    pub fn new(app_id: impl Into<String>, mch_id: impl Into<String>) -> Self {
        let mut options = Self::default();
        options.app_id = app_id.into();
        options.mch_id = mch_id.into();
        options
    }

    /// Set the older protocol secret.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the newer protocol AEAD key.
    pub fn with_v3_key(mut self, v3_key: impl Into<String>) -> Self {
        self.v3_key = v3_key.into();
        self
    }

    /// Set the client certificate and its private key.
    pub fn with_client_certificate(
        mut self,
        certificate_pem: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        self.certificate = certificate_pem.into();
        self.private_key = private_key_pem.into();
        self
    }

    /// Set the client certificate serial explicitly.
    pub fn with_certificate_serial_no(mut self, serial_no: impl Into<String>) -> Self {
        self.certificate_serial_no = serial_no.into();
        self
    }

    /// Load options from `PAYGATE_*` environment variables.
    ///
    /// Missing variables leave the field empty; `*_PATH` variables are read
    /// from disk when the inline variable is absent.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            app_id: env_or_empty("PAYGATE_APP_ID"),
            mch_id: env_or_empty("PAYGATE_MCH_ID"),
            key: env_or_empty("PAYGATE_KEY"),
            v3_key: env_or_empty("PAYGATE_V3_KEY"),
            certificate: env_or_file("PAYGATE_CERTIFICATE", "PAYGATE_CERTIFICATE_PATH")?,
            private_key: env_or_file("PAYGATE_PRIVATE_KEY", "PAYGATE_PRIVATE_KEY_PATH")?,
            certificate_serial_no: env_or_empty("PAYGATE_CERTIFICATE_SERIAL_NO"),
        })
    }

    /// Clear the secrets from memory.
    pub fn zeroize_secrets(&mut self) {
        self.key.zeroize();
        self.v3_key.zeroize();
        self.private_key.zeroize();
    }

    pub(crate) fn require_app_id(&self) -> Result<&str> {
        require("app_id", &self.app_id)
    }

    pub(crate) fn require_mch_id(&self) -> Result<&str> {
        require("mch_id", &self.mch_id)
    }

    pub(crate) fn require_key(&self) -> Result<&str> {
        require("key", &self.key)
    }

    pub(crate) fn require_v3_key(&self) -> Result<&str> {
        require("v3_key", &self.v3_key)
    }

    pub(crate) fn require_certificate(&self) -> Result<&str> {
        require("certificate", &self.certificate)
    }

    pub(crate) fn require_private_key(&self) -> Result<&str> {
        require("private_key", &self.private_key)
    }

    /// Serial of the client certificate: the configured value, or the one
    /// read from the certificate itself.
    pub fn client_serial_no(&self) -> Result<String> {
        if !self.certificate_serial_no.is_empty() {
            return Ok(self.certificate_serial_no.clone());
        }
        let record = CertificateRecord::from_pem(self.require_certificate()?.as_bytes())?;
        Ok(record.serial_no().to_string())
    }
}

impl Drop for GatewayOptions {
    fn drop(&mut self) {
        self.zeroize_secrets();
    }
}

fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() {
        Err(PaygateError::Configuration { field })
    } else {
        Ok(value)
    }
}

fn env_or_empty(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn env_or_file(inline: &str, path: &str) -> Result<String> {
    if let Ok(value) = std::env::var(inline) {
        return Ok(value);
    }
    match std::env::var(path) {
        Ok(file) => std::fs::read_to_string(&file)
            .map_err(|e| PaygateError::Serialization(format!("failed to read {file}: {e}"))),
        Err(_) => Ok(String::new()),
    }
}

/// Configuration for the reqwest-backed gateway transport.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpTransportConfig {
    /// Base URL that relative request paths are joined onto.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("paygate/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpTransportConfig {
    /// Create a configuration for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Resolve a request path against the base URL. Absolute URLs pass through.
    pub fn url(&self, path_or_url: &str) -> String {
        if path_or_url.starts_with("http://") || path_or_url.starts_with("https://") {
            path_or_url.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                path_or_url.trim_start_matches('/')
            )
        }
    }
}
