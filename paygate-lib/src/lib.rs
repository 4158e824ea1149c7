//! Paygate library.
//!
//! Client-side authentication for a payment gateway that speaks two protocol
//! generations:
//!
//! - **Older protocol**: XML parameter sets signed with a shared secret
//!   (MD5 or HMAC-SHA256 over a canonical `k=v&...&key=<secret>` string)
//! - **Newer protocol**: JSON bodies whose replies are signed with rotating
//!   gateway platform certificates (SHA256-with-RSA), downloaded on demand
//!   and delivered AEAD_AES_256_GCM-encrypted
//!
//! The network is injected through [`transport::GatewayTransport`]; the
//! reqwest implementation lives behind the `http-transport` feature.
//!
//! # Example
//!
//! ```ignore
//! use paygate_lib::requests::v3::TransactionQueryRequest;
//! use paygate_lib::transport::HttpTransport;
//! use paygate_lib::{GatewayClient, GatewayOptions, HttpTransportConfig};
//!
//! let transport = HttpTransport::new(HttpTransportConfig::default())?;
//! let client = GatewayClient::new(transport, GatewayOptions::from_env()?);
//!
//! let request = TransactionQueryRequest {
//!     mch_id: client.options().mch_id.clone(),
//!     out_trade_no: "1217752501201407033233368018".to_string(),
//! };
//! // Only returned once the gateway's signature checked out.
//! let transaction = client.execute_v3(&request).await?.into_result()?;
//! ```

pub mod certificates;
pub mod client;
pub mod config;
pub mod errors;
pub mod notification;
pub mod params;
pub mod requests;
pub mod response;
pub mod signing;
pub mod transport;

/// Test utilities: PEM fixtures and an in-memory gateway.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use certificates::{CertificateCache, CertificateRecord};
pub use client::GatewayClient;
pub use config::{GatewayOptions, HttpTransportConfig};
pub use errors::{PaygateError, PaygateErrorCode};
pub use params::ParameterSet;
pub use response::{V2Response, V3ErrorDetail, V3Response};

/// Common result alias for paygate operations.
pub type Result<T> = std::result::Result<T, PaygateError>;
