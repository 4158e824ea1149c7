//! Newer protocol requests.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{V3Request, V3SdkRequest};
use crate::certificates::PlatformCertificateList;
use crate::transport::HttpMethod;
use crate::Result;

/// Path of the platform certificate list.
pub const CERTIFICATES_PATH: &str = "/v3/certificates";

/// Download of the gateway's platform certificates.
///
/// The reply is not verified: verifying it would need the certificates it
/// delivers. The payloads are authenticated by AEAD decryption instead.
#[derive(Clone, Copy, Debug, Default)]
pub struct CertificatesRequest;

impl V3Request for CertificatesRequest {
    type Response = PlatformCertificateList;

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn request_url(&self) -> String {
        CERTIFICATES_PATH.to_string()
    }

    fn needs_check_sign(&self) -> bool {
        false
    }
}

/// A call described entirely at runtime, with a JSON body.
pub struct V3ApiRequest<T = serde_json::Value> {
    method: HttpMethod,
    url: String,
    body: Option<serde_json::Value>,
    check_sign: bool,
    _response: PhantomData<fn() -> T>,
}

impl<T> V3ApiRequest<T> {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url, None)
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(HttpMethod::Post, url, Some(body))
    }

    fn new(method: HttpMethod, url: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method,
            url: url.into(),
            body,
            check_sign: true,
            _response: PhantomData,
        }
    }

    /// Accept the reply without verifying its signature.
    pub fn without_sign_check(mut self) -> Self {
        self.check_sign = false;
        self
    }
}

impl<T: DeserializeOwned> V3Request for V3ApiRequest<T> {
    type Response = T;

    fn method(&self) -> HttpMethod {
        self.method
    }

    fn request_url(&self) -> String {
        self.url.clone()
    }

    fn body(&self) -> Result<Option<String>> {
        Ok(self.body.as_ref().map(serde_json::to_string).transpose()?)
    }

    fn needs_check_sign(&self) -> bool {
        self.check_sign
    }
}

/// Transaction lookup by merchant order number.
#[derive(Clone, Debug)]
pub struct TransactionQueryRequest {
    pub mch_id: String,
    pub out_trade_no: String,
}

/// Reply to [`TransactionQueryRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub appid: String,
    pub mchid: String,
    pub out_trade_no: String,
    pub transaction_id: Option<String>,
    pub trade_type: Option<String>,
    pub trade_state: String,
    pub trade_state_desc: Option<String>,
    pub success_time: Option<String>,
    pub amount: Option<TransactionAmount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionAmount {
    pub total: i64,
    pub payer_total: Option<i64>,
    pub currency: Option<String>,
}

impl V3Request for TransactionQueryRequest {
    type Response = Transaction;

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn request_url(&self) -> String {
        format!(
            "/v3/pay/transactions/out-trade-no/{}?mchid={}",
            urlencoding::encode(&self.out_trade_no),
            urlencoding::encode(&self.mch_id)
        )
    }
}

/// JSAPI / mini program payment invocation for a prepaid order.
#[derive(Clone, Debug)]
pub struct JsApiSdkRequest {
    pub prepay_id: String,
}

impl V3SdkRequest for JsApiSdkRequest {
    fn package(&self) -> String {
        format!("prepay_id={}", self.prepay_id)
    }
}

/// Parameters handed to the client-side payment call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V3SdkParameters {
    pub app_id: String,
    pub time_stamp: String,
    pub nonce_str: String,
    pub package: String,
    /// Always `RSA`.
    pub sign_type: String,
    pub pay_sign: String,
}
