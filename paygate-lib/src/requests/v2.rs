//! Older protocol requests.
//!
//! Reply values arrive as XML text, so typed replies declare their fields as
//! strings.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{AuthMode, V2Request, V2SdkRequest};
use crate::params::ParameterSet;
use crate::signing::{self, SignType, SIGN_FIELD};
use crate::{GatewayOptions, Result};

/// A call described entirely at runtime.
///
/// ```
/// use paygate_lib::requests::v2::V2ApiRequest;
/// use paygate_lib::requests::AuthMode;
///
/// let request: V2ApiRequest = V2ApiRequest::new("pay/closeorder")
///     .param("out_trade_no", "1217752501201407033233368018")
///     .with_auth_mode(AuthMode::Plain);
/// ```
pub struct V2ApiRequest<T = ParameterSet> {
    url: String,
    parameters: ParameterSet,
    sign_type: SignType,
    auth_mode: AuthMode,
    check_sign: bool,
    _response: PhantomData<fn() -> T>,
}

impl<T> V2ApiRequest<T> {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            parameters: ParameterSet::new(),
            sign_type: SignType::Md5,
            auth_mode: AuthMode::Plain,
            check_sign: true,
            _response: PhantomData,
        }
    }

    /// Add a business parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key, value);
        self
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_sign_type(mut self, sign_type: SignType) -> Self {
        self.sign_type = sign_type;
        self
    }

    pub fn with_auth_mode(mut self, auth_mode: AuthMode) -> Self {
        self.auth_mode = auth_mode;
        self
    }

    /// Skip the reply signature check (download endpoints return raw data).
    pub fn without_sign_check(mut self) -> Self {
        self.check_sign = false;
        self
    }
}

impl<T: DeserializeOwned> V2Request for V2ApiRequest<T> {
    type Response = T;

    fn request_url(&self) -> &str {
        &self.url
    }

    fn parameters(&self) -> ParameterSet {
        self.parameters.clone()
    }

    fn sign_type(&self) -> SignType {
        self.sign_type
    }

    fn needs_check_sign(&self) -> bool {
        self.check_sign
    }

    fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }
}

/// Order status query (`pay/orderquery`).
#[derive(Clone, Debug, Default)]
pub struct OrderQueryRequest {
    pub transaction_id: Option<String>,
    pub out_trade_no: Option<String>,
}

/// Reply to [`OrderQueryRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderQueryResponse {
    pub return_code: String,
    pub return_msg: Option<String>,
    pub result_code: Option<String>,
    pub err_code: Option<String>,
    pub err_code_des: Option<String>,
    pub trade_state: Option<String>,
    pub trade_state_desc: Option<String>,
    pub transaction_id: Option<String>,
    pub out_trade_no: Option<String>,
    pub total_fee: Option<String>,
}

impl V2Request for OrderQueryRequest {
    type Response = OrderQueryResponse;

    fn request_url(&self) -> &str {
        "pay/orderquery"
    }

    fn parameters(&self) -> ParameterSet {
        let mut parameters = ParameterSet::new();
        parameters
            .insert_opt("transaction_id", self.transaction_id.clone())
            .insert_opt("out_trade_no", self.out_trade_no.clone());
        parameters
    }
}

/// Refund (`secapi/pay/refund`). Requires the client certificate.
#[derive(Clone, Debug)]
pub struct RefundRequest {
    pub out_trade_no: String,
    pub out_refund_no: String,
    /// Order total in fen.
    pub total_fee: u64,
    /// Refund amount in fen.
    pub refund_fee: u64,
    pub refund_desc: Option<String>,
}

/// Reply to [`RefundRequest`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundResponse {
    pub return_code: String,
    pub return_msg: Option<String>,
    pub result_code: Option<String>,
    pub err_code: Option<String>,
    pub err_code_des: Option<String>,
    pub refund_id: Option<String>,
    pub out_refund_no: Option<String>,
    pub refund_fee: Option<String>,
}

impl V2Request for RefundRequest {
    type Response = RefundResponse;

    fn request_url(&self) -> &str {
        "secapi/pay/refund"
    }

    fn parameters(&self) -> ParameterSet {
        let mut parameters = ParameterSet::new();
        parameters
            .insert("out_trade_no", self.out_trade_no.as_str())
            .insert("out_refund_no", self.out_refund_no.as_str())
            .insert("total_fee", self.total_fee.to_string())
            .insert("refund_fee", self.refund_fee.to_string())
            .insert_opt("refund_desc", self.refund_desc.clone());
        parameters
    }

    fn auth_mode(&self) -> AuthMode {
        AuthMode::Certificate
    }
}

/// Contract signing page (`papay/entrustweb`), opened in the payer's browser.
///
/// The page signs `appid`, `mch_id`, a `timestamp` and `version` instead of a
/// nonce.
#[derive(Clone, Debug)]
pub struct EntrustWebRequest {
    pub plan_id: String,
    pub contract_code: String,
    pub request_serial: u64,
    pub contract_display_account: String,
    pub notify_url: String,
}

impl V2Request for EntrustWebRequest {
    type Response = ParameterSet;

    fn request_url(&self) -> &str {
        "https://api.mch.weixin.qq.com/papay/entrustweb"
    }

    fn parameters(&self) -> ParameterSet {
        let mut parameters = ParameterSet::new();
        parameters
            .insert("plan_id", self.plan_id.as_str())
            .insert("contract_code", self.contract_code.as_str())
            .insert("request_serial", self.request_serial.to_string())
            .insert("contract_display_account", self.contract_display_account.as_str())
            .insert("notify_url", self.notify_url.as_str());
        parameters
    }

    fn needs_check_sign(&self) -> bool {
        false
    }

    fn prepare(&self, options: &GatewayOptions) -> Result<ParameterSet> {
        let mut parameters = self.parameters();
        parameters
            .insert("appid", options.require_app_id()?)
            .insert("mch_id", options.require_mch_id()?)
            .insert("version", "1.0")
            .insert("timestamp", signing::timestamp_now());
        let sign = signing::sign_with_key(&parameters, options.require_key()?, self.sign_type())?;
        parameters.insert(SIGN_FIELD, sign);
        Ok(parameters)
    }
}

/// App payment invocation parameters for a prepaid order.
#[derive(Clone, Debug)]
pub struct AppPaySdkRequest {
    pub prepay_id: String,
}

impl V2SdkRequest for AppPaySdkRequest {
    fn sdk_parameters(&self, options: &GatewayOptions) -> Result<ParameterSet> {
        let mut parameters = ParameterSet::new();
        parameters
            .insert("appid", options.require_app_id()?)
            .insert("partnerid", options.require_mch_id()?)
            .insert("prepayid", self.prepay_id.as_str())
            .insert("package", "Sign=WXPay")
            .insert("noncestr", signing::generate_nonce())
            .insert("timestamp", signing::timestamp_now());
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::test_options;

    #[test]
    fn test_order_query_skips_absent_ids() {
        let request = OrderQueryRequest {
            out_trade_no: Some("1415757673".to_string()),
            ..Default::default()
        };
        let parameters = request.parameters();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters.get("out_trade_no"), Some("1415757673"));
    }

    #[test]
    fn test_refund_uses_certificate() {
        let request = RefundRequest {
            out_trade_no: "T1".to_string(),
            out_refund_no: "R1".to_string(),
            total_fee: 100,
            refund_fee: 40,
            refund_desc: None,
        };
        assert_eq!(request.auth_mode(), AuthMode::Certificate);
        assert_eq!(request.parameters().get("refund_fee"), Some("40"));
    }

    #[test]
    fn test_entrust_web_signs_without_nonce() {
        let request = EntrustWebRequest {
            plan_id: "12535".to_string(),
            contract_code: "100000".to_string(),
            request_serial: 1000,
            contract_display_account: "test".to_string(),
            notify_url: "https://merchant.test/notify".to_string(),
        };
        let prepared = request.prepare(&test_options()).unwrap();
        assert!(!prepared.contains_key("nonce_str"));
        assert_eq!(prepared.get("version"), Some("1.0"));
        assert!(prepared.contains_key(SIGN_FIELD));
    }

    #[test]
    fn test_api_request_builder() {
        let request: V2ApiRequest = V2ApiRequest::new("pay/closeorder")
            .param("out_trade_no", "X1")
            .with_sign_type(SignType::HmacSha256)
            .without_sign_check();
        assert_eq!(request.request_url(), "pay/closeorder");
        assert_eq!(request.sign_type(), SignType::HmacSha256);
        assert!(!request.needs_check_sign());
        assert_eq!(request.auth_mode(), AuthMode::Plain);
    }
}
