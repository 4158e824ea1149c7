//! Test utilities for paygate.
//!
//! This module provides:
//! - PEM fixtures: two platform certificates with distinct serials and a
//!   merchant client certificate, with their private keys
//! - [`MockGateway`], an in-memory [`GatewayTransport`](crate::transport::GatewayTransport)
//!   that signs replies like the real gateway
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paygate_lib::test_utils::{fixtures, MockGateway};
//! use paygate_lib::GatewayClient;
//!
//! let mock = MockGateway::default();
//! mock.route_v3("/v3/pay/transactions/id/42", 200, r#"{"trade_state":"SUCCESS"}"#);
//! let client = GatewayClient::new(mock, fixtures::test_options());
//! ```

pub mod fixtures;
mod mock_gateway;

pub use mock_gateway::{MockGateway, RecordedV2Call};
