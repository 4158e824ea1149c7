//! Boundary to the network.
//!
//! The executor talks to the gateway only through [`GatewayTransport`].
//! [`HttpTransport`] is the production implementation (feature
//! `http-transport`); tests use [`MockGateway`](crate::test_utils::MockGateway).

#[cfg(feature = "http-transport")]
mod http;
mod traits;

#[cfg(feature = "http-transport")]
pub use http::HttpTransport;
pub use traits::{
    GatewayTransport, HttpMethod, RawResponse, TransportIdentity, V3HttpRequest, V3RawResponse,
};
