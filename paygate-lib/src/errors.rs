//! Error types for gateway operations.
//!
//! Every failure of the signing / verification pipeline surfaces to the caller
//! as a [`PaygateError`]. Nothing is retried or swallowed here; retry policy
//! belongs to the caller.

/// Error codes for FFI and logging integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum PaygateErrorCode {
    /// Required credential field missing
    Configuration = 1000,
    /// Transport/network layer error
    Transport = 2000,
    /// Response body does not match the expected shape
    ResponseParse = 3000,
    /// Well-formed error reply from the gateway
    Gateway = 3001,
    /// Response or notification signature mismatch
    SignatureVerification = 4000,
    /// Platform certificate missing after a refresh
    CertificateUnavailable = 4001,
    /// Certificate material could not be parsed
    Certificate = 4002,
    /// Encrypted payload names an unsupported algorithm
    UnsupportedAlgorithm = 5000,
    /// Key decoding, signing or AEAD failure
    Crypto = 5001,
    /// Serialization error
    Serialization = 6000,
}

/// Comprehensive error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    /// A credential field required by the call is empty. Raised before any
    /// network interaction.
    #[error("configuration error: `{field}` is required")]
    Configuration {
        /// Name of the missing option
        field: &'static str,
    },

    /// Propagated from the transport collaborator.
    #[error("transport error: {0}")]
    Transport(String),

    /// The body could not be decoded into the expected shape.
    #[error("response parse error (status {status}): {reason}")]
    ResponseParse {
        /// HTTP status code of the reply
        status: u16,
        /// Raw body, kept for diagnostics
        body: String,
        /// Decoder message
        reason: String,
    },

    /// The gateway answered with a structured error reply.
    #[error("gateway error (status {status}) {code}: {message}")]
    Gateway {
        /// HTTP status code of the reply
        status: u16,
        /// Gateway error code
        code: String,
        /// Gateway error message
        message: String,
    },

    /// Signature did not match. The parsed result is withheld.
    #[error("sign check fail: {0}")]
    SignatureVerification(String),

    /// The platform certificate is still unknown after one refresh.
    #[error("platform certificate {serial_no} unavailable after refresh")]
    CertificateUnavailable {
        /// Serial requested by the reply
        serial_no: String,
    },

    /// Certificate bytes could not be parsed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// Encrypted payload names an algorithm other than `AEAD_AES_256_GCM`.
    #[error("unknown algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Key decoding, signing or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Serialization/deserialization error outside response parsing.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl PaygateError {
    /// Get the error code.
    pub fn code(&self) -> PaygateErrorCode {
        match self {
            Self::Configuration { .. } => PaygateErrorCode::Configuration,
            Self::Transport(_) => PaygateErrorCode::Transport,
            Self::ResponseParse { .. } => PaygateErrorCode::ResponseParse,
            Self::Gateway { .. } => PaygateErrorCode::Gateway,
            Self::SignatureVerification(_) => PaygateErrorCode::SignatureVerification,
            Self::CertificateUnavailable { .. } => PaygateErrorCode::CertificateUnavailable,
            Self::Certificate(_) => PaygateErrorCode::Certificate,
            Self::UnsupportedAlgorithm(_) => PaygateErrorCode::UnsupportedAlgorithm,
            Self::Crypto(_) => PaygateErrorCode::Crypto,
            Self::Serialization(_) => PaygateErrorCode::Serialization,
        }
    }

    /// Whether the error was raised by option validation.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Whether a signature check rejected the reply.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, Self::SignatureVerification(_))
    }

    pub(crate) fn response_parse(status: u16, body: &str, reason: impl ToString) -> Self {
        Self::ResponseParse {
            status,
            body: body.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for PaygateError {
    fn from(e: serde_json::Error) -> Self {
        PaygateError::Serialization(e.to_string())
    }
}
