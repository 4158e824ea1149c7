use std::fmt;

use async_trait::async_trait;

use crate::{GatewayOptions, Result};

/// Which TLS identity the transport presents for an older protocol call.
#[derive(Clone, Copy)]
pub enum TransportIdentity<'a> {
    /// Server-authenticated TLS only.
    Anonymous,
    /// Mutual TLS bound to a client certificate.
    Certificate {
        /// Serial of the client certificate; transports key their per-identity
        /// connection pools on it.
        serial_no: &'a str,
        certificate_pem: &'a str,
        private_key_pem: &'a str,
    },
}

impl fmt::Debug for TransportIdentity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Certificate { serial_no, .. } => {
                f.debug_struct("Certificate").field("serial_no", serial_no).finish_non_exhaustive()
            }
        }
    }
}

/// HTTP method of a newer protocol call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status and body of an older protocol reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// A newer protocol call as handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct V3HttpRequest {
    pub method: HttpMethod,
    /// Path (joined onto the transport's base URL) or absolute URL.
    pub url: String,
    /// JSON body for POST calls.
    pub body: Option<String>,
}

/// Transport-level outputs of a newer protocol reply.
///
/// The four authentication scalars come from reply headers; a transport
/// leaves them empty when the gateway did not send them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct V3RawResponse {
    pub serial_no: String,
    pub timestamp: String,
    pub nonce: String,
    pub signature: String,
    pub body: String,
    pub status: u16,
}

/// Network collaborator of the request executor.
///
/// Implementations own TLS, timeouts and connection reuse. Failures are
/// returned as [`PaygateError::Transport`](crate::PaygateError::Transport)
/// and end the call.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait GatewayTransport {
    /// POST an older protocol XML document.
    async fn post_v2(
        &self,
        identity: TransportIdentity<'_>,
        url: &str,
        body: String,
    ) -> Result<RawResponse>;

    /// Send a newer protocol request, authorizing it with the merchant's
    /// private key.
    async fn send_v3(&self, request: &V3HttpRequest, options: &GatewayOptions) -> Result<V3RawResponse>;
}
