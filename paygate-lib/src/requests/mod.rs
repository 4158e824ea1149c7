//! Request shapes per protocol generation and authentication mode.
//!
//! A request exposes exactly what the executor needs: its parameters or
//! body, whether the reply must be verified, and where it goes. Business
//! field schemas live with the caller; the types in [`v2`] and [`v3`] cover
//! the calls the pipeline itself makes plus a few common endpoints.

pub mod v2;
pub mod v3;

use serde::de::DeserializeOwned;

use crate::params::ParameterSet;
use crate::signing::{self, SignType, SIGN_FIELD, SIGN_TYPE_FIELD};
use crate::transport::HttpMethod;
use crate::{GatewayOptions, Result};

/// How an older protocol call authenticates at the TLS layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    /// Server-authenticated TLS only.
    #[default]
    Plain,
    /// Mutual TLS with the merchant's client certificate (refunds, transfers).
    Certificate,
}

/// An older protocol (XML, shared secret) call.
pub trait V2Request: Send + Sync {
    /// Typed view of the reply parameters.
    type Response: DeserializeOwned;

    /// Endpoint path or absolute URL.
    fn request_url(&self) -> &str;

    /// Business parameters, without credentials or signature.
    fn parameters(&self) -> ParameterSet;

    fn sign_type(&self) -> SignType {
        SignType::Md5
    }

    /// Whether the reply signature must be checked.
    fn needs_check_sign(&self) -> bool {
        true
    }

    fn auth_mode(&self) -> AuthMode {
        AuthMode::Plain
    }

    /// Build the signed parameter set sent on the wire.
    ///
    /// Override when an endpoint names the credential fields differently.
    fn prepare(&self, options: &GatewayOptions) -> Result<ParameterSet> {
        prepare_v2_parameters(self.parameters(), options, self.sign_type())
    }
}

/// Default preparation: `appid`, `mch_id`, a fresh `nonce_str`, the
/// `sign_type` tag for non-MD5 algorithms, then `sign`.
pub fn prepare_v2_parameters(
    mut parameters: ParameterSet,
    options: &GatewayOptions,
    sign_type: SignType,
) -> Result<ParameterSet> {
    parameters
        .insert("appid", options.require_app_id()?)
        .insert("mch_id", options.require_mch_id()?)
        .insert("nonce_str", signing::generate_nonce());
    if sign_type != SignType::Md5 {
        parameters.insert(SIGN_TYPE_FIELD, sign_type.as_str());
    }
    let sign = signing::sign_with_key(&parameters, options.require_key()?, sign_type)?;
    parameters.insert(SIGN_FIELD, sign);
    Ok(parameters)
}

/// Parameters an older protocol client SDK (app, mini program) signs locally.
pub trait V2SdkRequest: Send + Sync {
    fn sign_type(&self) -> SignType {
        SignType::Md5
    }

    /// Unsigned parameters under the names the SDK expects.
    fn sdk_parameters(&self, options: &GatewayOptions) -> Result<ParameterSet>;
}

/// A newer protocol (JSON, RSA) call.
pub trait V3Request: Send + Sync {
    /// Body type of a successful reply.
    type Response: DeserializeOwned;

    fn method(&self) -> HttpMethod;

    /// Endpoint path (with query) or absolute URL.
    fn request_url(&self) -> String;

    /// JSON body for POST calls.
    fn body(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Whether the reply signature must be checked. Only the certificate
    /// download skips it.
    fn needs_check_sign(&self) -> bool {
        true
    }
}

/// A newer protocol client-side payment invocation.
pub trait V3SdkRequest: Send + Sync {
    /// The `package` value signed into `paySign`.
    fn package(&self) -> String;
}
