//! Request executor.
//!
//! [`GatewayClient`] runs one logical call as a strictly sequential
//! pipeline: validate options, sign, send, parse, verify. A parsed result
//! leaves the pipeline only after verification succeeded.
//!
//! Newer protocol verification resolves the platform certificate named by
//! the reply. On a cache miss the client downloads the certificate list once
//! (unverified, see [`CertificatesRequest`]), decrypts and caches every
//! entry, then looks again. A serial that is still unknown fails the call
//! with [`PaygateError::CertificateUnavailable`].

use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::certificates::{CertificateCache, CertificateRecord, PlatformCertificateList};
use crate::notification::{Notification, NotificationEnvelope, NotificationHeaders};
use crate::params::ParameterSet;
use crate::requests::v3::{CertificatesRequest, V3SdkParameters};
use crate::requests::{AuthMode, V2Request, V2SdkRequest, V3Request, V3SdkRequest};
use crate::response::{self, V2Response, V3Response, RETURN_SUCCESS};
use crate::signing::{self, rsa_sha256, SignType, SIGN_FIELD};
use crate::transport::{GatewayTransport, TransportIdentity, V3HttpRequest, V3RawResponse};
use crate::{GatewayOptions, PaygateError, Result};

/// Client for one merchant.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and calls may
/// run concurrently. The two certificate caches are the only mutable state.
pub struct GatewayClient<T> {
    transport: T,
    options: GatewayOptions,
    client_certificates: Arc<CertificateCache>,
    platform_certificates: Arc<CertificateCache>,
    client_serial_no: OnceLock<String>,
    refresh: Mutex<()>,
}

impl<T> GatewayClient<T> {
    /// Create a client with fresh certificate caches.
    pub fn new(transport: T, options: GatewayOptions) -> Self {
        Self::with_caches(transport, options, Arc::default(), Arc::default())
    }

    /// Create a client using caches shared with other clients.
    pub fn with_caches(
        transport: T,
        options: GatewayOptions,
        client_certificates: Arc<CertificateCache>,
        platform_certificates: Arc<CertificateCache>,
    ) -> Self {
        Self {
            transport,
            options,
            client_certificates,
            platform_certificates,
            client_serial_no: OnceLock::new(),
            refresh: Mutex::new(()),
        }
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Cache of client certificates used for mutual TLS.
    pub fn client_certificates(&self) -> &Arc<CertificateCache> {
        &self.client_certificates
    }

    /// Cache of gateway platform certificates.
    pub fn platform_certificates(&self) -> &Arc<CertificateCache> {
        &self.platform_certificates
    }

    /// Sign an older protocol request and return the redirect URL built
    /// from it, wrapped by `factory`. No network interaction.
    pub fn page_execute_v2<R, P, F>(&self, request: &R, factory: F) -> Result<P>
    where
        R: V2Request,
        F: FnOnce(String) -> P,
    {
        self.validate_v2()?;
        let parameters = request.prepare(&self.options)?;
        let url = request.request_url();
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(factory(format!("{url}{separator}{}", parameters.to_query())))
    }

    /// Sign older protocol SDK parameters for a client-side invocation.
    pub fn execute_v2_sdk<R: V2SdkRequest>(&self, request: &R) -> Result<ParameterSet> {
        self.validate_v2()?;
        let mut parameters = request.sdk_parameters(&self.options)?;
        let sign = signing::sign_with_key(&parameters, self.options.require_key()?, request.sign_type())?;
        parameters.insert(SIGN_FIELD, sign);
        Ok(parameters)
    }

    /// Sign newer protocol SDK parameters (`paySign`) for a client-side
    /// invocation.
    pub fn execute_v3_sdk<R: V3SdkRequest>(&self, request: &R) -> Result<V3SdkParameters> {
        let app_id = self.options.require_app_id()?;
        let private_key = rsa_sha256::load_private_key(self.options.require_private_key()?)?;

        let time_stamp = signing::timestamp_now();
        let nonce_str = signing::generate_nonce();
        let package = request.package();
        let source = rsa_sha256::sdk_source(app_id, &time_stamp, &nonce_str, &package);
        let pay_sign = rsa_sha256::sign_sha256_rsa(&private_key, &source)?;

        Ok(V3SdkParameters {
            app_id: app_id.to_string(),
            time_stamp,
            nonce_str,
            package,
            sign_type: "RSA".to_string(),
            pay_sign,
        })
    }

    fn validate_v2(&self) -> Result<()> {
        self.options.require_app_id()?;
        self.options.require_mch_id()?;
        self.options.require_key()?;
        Ok(())
    }

    /// The merchant's client certificate, parsed once and cached under its
    /// resolved serial: the configured `certificate_serial_no`, or the
    /// certificate's own serial when none is configured.
    fn client_certificate(&self) -> Result<(String, Arc<CertificateRecord>)> {
        if let Some(serial_no) = self.client_serial_no.get() {
            if let Some(record) = self.client_certificates.try_get(serial_no) {
                return Ok((serial_no.clone(), record));
            }
        }

        let record = CertificateRecord::from_pem(self.options.require_certificate()?.as_bytes())?;
        let serial_no = if self.options.certificate_serial_no.is_empty() {
            record.serial_no().to_string()
        } else {
            self.options.certificate_serial_no.clone()
        };
        self.client_certificates.try_insert_if_absent(serial_no.as_str(), record);
        let serial_no = self.client_serial_no.get_or_init(|| serial_no).clone();
        match self.client_certificates.try_get(&serial_no) {
            Some(record) => Ok((serial_no, record)),
            None => Err(PaygateError::CertificateUnavailable { serial_no }),
        }
    }

    /// Check an older protocol reply signature.
    ///
    /// Replies whose `return_code` is not `SUCCESS` are not signed by the
    /// gateway and carry no business data; they pass unchecked.
    fn check_v2_sign(&self, parameters: &ParameterSet, sign_type: SignType) -> Result<()> {
        if parameters.get("return_code") != Some(RETURN_SUCCESS) {
            tracing::debug!(
                return_code = parameters.get("return_code").unwrap_or_default(),
                "unsigned v2 reply accepted"
            );
            return Ok(());
        }
        let Some(received) = parameters.get(SIGN_FIELD) else {
            tracing::warn!("v2 reply without sign rejected");
            return Err(PaygateError::SignatureVerification(
                "reply carries no sign".to_string(),
            ));
        };
        if !signing::verify_with_key(parameters, self.options.require_key()?, sign_type, received)? {
            tracing::warn!(%sign_type, "v2 reply sign mismatch");
            return Err(PaygateError::SignatureVerification(
                "reply sign does not match".to_string(),
            ));
        }
        Ok(())
    }
}

impl<T> GatewayClient<T>
where
    T: GatewayTransport + Send + Sync,
{
    /// Execute an older protocol call.
    #[tracing::instrument(skip(self, request), fields(url = %request.request_url()))]
    pub async fn execute_v2<R: V2Request>(&self, request: &R) -> Result<V2Response<R::Response>> {
        self.validate_v2()?;
        let client_serial_no;
        let identity = match request.auth_mode() {
            AuthMode::Plain => TransportIdentity::Anonymous,
            AuthMode::Certificate => {
                let certificate_pem = self.options.require_certificate()?;
                let private_key_pem = self.options.require_private_key()?;
                let (serial_no, _record) = self.client_certificate()?;
                client_serial_no = serial_no;
                TransportIdentity::Certificate {
                    serial_no: client_serial_no.as_str(),
                    certificate_pem,
                    private_key_pem,
                }
            }
        };

        let parameters = request.prepare(&self.options)?;
        let body = parameters.to_xml().map_err(PaygateError::Serialization)?;
        tracing::debug!(?identity, fields = parameters.len(), "sending v2 request");

        let raw = self
            .transport
            .post_v2(identity, request.request_url(), body)
            .await?;
        let response = response::parse_v2(raw)?;

        if request.needs_check_sign() {
            self.check_v2_sign(&response.parameters, request.sign_type())?;
        }
        Ok(response)
    }

    /// Execute a newer protocol call.
    #[tracing::instrument(skip(self, request), fields(method = %request.method(), url = %request.request_url()))]
    pub async fn execute_v3<R: V3Request>(&self, request: &R) -> Result<V3Response<R::Response>> {
        let raw = self.dispatch_v3(request).await?;
        let response = response::parse_v3(&raw)?;

        if request.needs_check_sign() {
            self.verify_signature(&raw.serial_no, &raw.timestamp, &raw.nonce, &raw.signature, &raw.body)
                .await?;
        }
        Ok(response)
    }

    /// Verify and decrypt an inbound gateway callback.
    #[tracing::instrument(skip(self, headers, body), fields(serial_no = %headers.serial_no))]
    pub async fn verify_notification<D: DeserializeOwned>(
        &self,
        headers: &NotificationHeaders,
        body: &str,
    ) -> Result<Notification<D>> {
        let v3_key = self.options.require_v3_key()?;
        let envelope: NotificationEnvelope =
            serde_json::from_str(body).map_err(|e| PaygateError::response_parse(200, body, e))?;

        self.verify_signature(&headers.serial_no, &headers.timestamp, &headers.nonce, &headers.signature, body)
            .await?;

        let plaintext = envelope.resource.decrypt(v3_key)?;
        let data = serde_json::from_str(&plaintext)
            .map_err(|e| PaygateError::response_parse(200, body, e))?;
        tracing::debug!(id = %envelope.id, event_type = %envelope.event_type, "notification verified");
        Ok(Notification { envelope, data })
    }

    /// Download the platform certificate list, decrypt every entry and cache
    /// it. Returns the records named by the list, as cached.
    ///
    /// The list is all-or-nothing: every entry is decrypted and checked
    /// before any is cached, so one bad entry leaves the cache untouched.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_platform_certificates(&self) -> Result<Vec<Arc<CertificateRecord>>> {
        let v3_key = self.options.require_v3_key()?;
        let raw = self.dispatch_v3(&CertificatesRequest).await?;
        let list: PlatformCertificateList = response::parse_v3(&raw)?.into_result()?;

        let mut decrypted = Vec::with_capacity(list.data.len());
        for entry in list.data {
            let record = entry.encrypt_certificate.decrypt_record(v3_key)?;
            if !record.serial_no().eq_ignore_ascii_case(&entry.serial_no) {
                tracing::warn!(serial_no = %entry.serial_no, "certificate list entry rejected");
                return Err(PaygateError::Certificate(format!(
                    "list entry {} holds certificate {}",
                    entry.serial_no,
                    record.serial_no()
                )));
            }
            decrypted.push((entry.serial_no, record));
        }

        let mut records = Vec::with_capacity(decrypted.len());
        for (serial_no, record) in decrypted {
            if self
                .platform_certificates
                .try_insert_if_absent(serial_no.as_str(), record)
            {
                tracing::info!(%serial_no, "platform certificate cached");
            }
            if let Some(record) = self.platform_certificates.try_get(&serial_no) {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Resolve a platform certificate, refreshing the cache at most once.
    pub async fn load_platform_certificate(&self, serial_no: &str) -> Result<Arc<CertificateRecord>> {
        if let Some(record) = self.platform_certificates.try_get(serial_no) {
            return Ok(record);
        }

        let _refresh = self.refresh.lock().await;
        // Another call may have refreshed while this one waited.
        if let Some(record) = self.platform_certificates.try_get(serial_no) {
            return Ok(record);
        }

        tracing::debug!(serial_no, "platform certificate miss, refreshing");
        self.refresh_platform_certificates().await?;
        self.platform_certificates.try_get(serial_no).ok_or_else(|| {
            tracing::warn!(serial_no, "platform certificate unavailable after refresh");
            PaygateError::CertificateUnavailable {
                serial_no: serial_no.to_string(),
            }
        })
    }

    /// Validate, then hand a newer protocol request to the transport.
    /// Nothing is verified here.
    async fn dispatch_v3<R: V3Request>(&self, request: &R) -> Result<V3RawResponse> {
        self.options.require_mch_id()?;
        self.options.require_certificate()?;
        self.options.require_private_key()?;
        if request.needs_check_sign() {
            self.options.require_v3_key()?;
        }

        let http_request = V3HttpRequest {
            method: request.method(),
            url: request.request_url(),
            body: request.body()?,
        };
        self.transport.send_v3(&http_request, &self.options).await
    }

    async fn verify_signature(
        &self,
        serial_no: &str,
        timestamp: &str,
        nonce: &str,
        signature: &str,
        body: &str,
    ) -> Result<()> {
        if serial_no.is_empty() || signature.is_empty() {
            tracing::warn!("reply carries no signature headers");
            return Err(PaygateError::SignatureVerification(
                "signature headers missing".to_string(),
            ));
        }

        let certificate = self.load_platform_certificate(serial_no).await?;
        let source = rsa_sha256::response_source(timestamp, nonce, body);
        if !rsa_sha256::verify_sha256_rsa(certificate.public_key(), &source, signature) {
            tracing::warn!(serial_no, "v3 signature mismatch");
            return Err(PaygateError::SignatureVerification(format!(
                "signature does not match platform certificate {serial_no}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requests::v2::{
        AppPaySdkRequest, EntrustWebRequest, OrderQueryRequest, RefundRequest, V2ApiRequest,
    };
    use crate::requests::v3::{JsApiSdkRequest, Transaction, TransactionQueryRequest, V3ApiRequest};
    use crate::signing::aead;
    use crate::test_utils::fixtures::{
        platform_a_record, test_options, CLIENT_SERIAL_NO, PLATFORM_A_CERT_PEM, PLATFORM_A_KEY_PEM,
        PLATFORM_A_SERIAL_NO, PLATFORM_B_CERT_PEM, PLATFORM_B_KEY_PEM, PLATFORM_B_SERIAL_NO,
        TEST_APP_ID, TEST_KEY, TEST_V3_KEY,
    };
    use crate::test_utils::MockGateway;
    use tokio::task::JoinSet;

    const QUERY_PATH: &str = "/v3/pay/transactions/out-trade-no/T1001";
    const QUERY_BODY: &str = r#"{"appid":"wxd930ea5d5a258f4f","mchid":"1900000109","out_trade_no":"T1001","trade_state":"SUCCESS","amount":{"total":100}}"#;

    fn query() -> TransactionQueryRequest {
        TransactionQueryRequest {
            mch_id: "1900000109".to_string(),
            out_trade_no: "T1001".to_string(),
        }
    }

    fn client() -> GatewayClient<MockGateway> {
        let mock = MockGateway::default();
        mock.route_v3(QUERY_PATH, 200, QUERY_BODY);
        GatewayClient::new(mock, test_options())
    }

    // `TransactionQueryRequest` appends the mchid query; the mock routes on
    // the path alone.
    #[tokio::test]
    async fn test_v3_bootstraps_certificates_then_verifies() {
        let client = client();
        assert!(client.platform_certificates().is_empty());

        let response = client.execute_v3(&query()).await.unwrap();
        let transaction: Transaction = response.into_result().unwrap();
        assert_eq!(transaction.trade_state, "SUCCESS");
        assert_eq!(transaction.amount.unwrap().total, 100);

        assert_eq!(client.transport().certificate_downloads(), 1);
        assert!(client.platform_certificates().contains(PLATFORM_A_SERIAL_NO));

        // Cached now: no further download.
        client.execute_v3(&query()).await.unwrap();
        assert_eq!(client.transport().certificate_downloads(), 1);
    }

    #[tokio::test]
    async fn test_v3_tampered_body_fails_closed() {
        let client = client();
        client.transport().tamper("\"total\":100", "\"total\":900");

        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(err.is_verification_failure());
    }

    #[tokio::test]
    async fn test_v3_single_byte_change_fails() {
        let client = client();
        client.transport().tamper("T1001", "T1002");
        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::SignatureVerification(_)));
    }

    #[tokio::test]
    async fn test_v3_rotation_triggers_refresh() {
        let client = client();
        client.execute_v3(&query()).await.unwrap();

        client.transport().publish_certificate(PLATFORM_B_CERT_PEM);
        client.transport().serve_as(PLATFORM_B_SERIAL_NO, PLATFORM_B_KEY_PEM);

        client.execute_v3(&query()).await.unwrap();
        assert_eq!(client.transport().certificate_downloads(), 2);
        assert_eq!(
            client.platform_certificates().serial_numbers(),
            vec![PLATFORM_B_SERIAL_NO.to_string(), PLATFORM_A_SERIAL_NO.to_string()]
        );
    }

    #[tokio::test]
    async fn test_v3_unknown_serial_is_terminal() {
        let client = client();
        // Signs with B but only A is downloadable.
        client.transport().serve_as(PLATFORM_B_SERIAL_NO, PLATFORM_B_KEY_PEM);

        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(
            matches!(err, PaygateError::CertificateUnavailable { ref serial_no } if serial_no == PLATFORM_B_SERIAL_NO)
        );
        assert_eq!(client.transport().certificate_downloads(), 1);
    }

    #[tokio::test]
    async fn test_v3_wrong_serial_key_pair_fails_verification() {
        let client = client();
        client.transport().publish_certificate(PLATFORM_B_CERT_PEM);
        // Claims serial A but signs with B's key.
        client.transport().serve_as(PLATFORM_A_SERIAL_NO, PLATFORM_B_KEY_PEM);

        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(err.is_verification_failure());
    }

    #[tokio::test]
    async fn test_v3_error_reply_is_verified_then_surfaced() {
        let client = client();
        client.transport().route_v3(QUERY_PATH, 404, r#"{"code":"ORDER_NOT_EXIST","message":"order not found"}"#);

        let response = client.execute_v3(&query()).await.unwrap();
        assert_eq!(response.status_code, 404);
        assert_eq!(response.error.as_ref().unwrap().code, "ORDER_NOT_EXIST");
        assert!(matches!(response.into_result(), Err(PaygateError::Gateway { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_v3_parse_failure_reports_body() {
        let client = client();
        client.transport().route_v3(QUERY_PATH, 200, "{\"trade_state\": [");

        match client.execute_v3(&query()).await.unwrap_err() {
            PaygateError::ResponseParse { status, body, .. } => {
                assert_eq!(status, 200);
                assert!(body.starts_with("{\"trade_state\""));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_v3_missing_options_fail_before_io() {
        for field in ["mch_id", "certificate", "private_key", "v3_key"] {
            let mut options = test_options();
            match field {
                "mch_id" => options.mch_id.clear(),
                "certificate" => options.certificate.clear(),
                "private_key" => options.private_key.clear(),
                _ => options.v3_key.clear(),
            }
            let client = GatewayClient::new(MockGateway::default(), options);
            let err = client.execute_v3(&query()).await.unwrap_err();
            assert!(matches!(err, PaygateError::Configuration { field: f } if f == field));
            assert_eq!(client.transport().total_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_v3_unverified_call_skips_v3_key() {
        let mut options = test_options();
        options.v3_key.clear();
        let mock = MockGateway::default();
        mock.route_v3("/v3/merchant/media", 200, r#"{"media_id":"m1"}"#);
        let client = GatewayClient::new(mock, options);

        let request: V3ApiRequest = V3ApiRequest::get("/v3/merchant/media").without_sign_check();
        let value = client.execute_v3(&request).await.unwrap().into_result().unwrap();
        assert_eq!(value["media_id"], "m1");
        assert_eq!(client.transport().certificate_downloads(), 0);
    }

    #[tokio::test]
    async fn test_v3_unknown_algorithm_in_list() {
        let client = client();
        let list = serde_json::json!({"data": [{
            "serial_no": PLATFORM_A_SERIAL_NO,
            "encrypt_certificate": {
                "algorithm": "AEAD_SM4_GCM",
                "nonce": "61f9c719728a",
                "associated_data": "certificate",
                "ciphertext": aead::encrypt(TEST_V3_KEY, "61f9c719728a", "certificate", PLATFORM_A_CERT_PEM.as_bytes()).unwrap()
            }
        }]});
        client.transport().route_v3("/v3/certificates", 200, &list.to_string());

        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::UnsupportedAlgorithm(ref a) if a == "AEAD_SM4_GCM"));
        assert!(client.platform_certificates().is_empty());
    }

    #[tokio::test]
    async fn test_bootstrap_error_reply_surfaces_as_gateway_error() {
        let client = client();
        client.transport().route_v3(
            "/v3/certificates",
            401,
            r#"{"code":"SIGN_ERROR","message":"invalid authorization"}"#,
        );

        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::Gateway { status: 401, ref code, .. } if code == "SIGN_ERROR"));
    }

    #[tokio::test]
    async fn test_list_entry_serial_mismatch_rejected() {
        let client = client();
        let entry = |serial_no: &str, cert_pem: &str| {
            serde_json::json!({
                "serial_no": serial_no,
                "encrypt_certificate": {
                    "algorithm": "AEAD_AES_256_GCM",
                    "nonce": "61f9c719728a",
                    "associated_data": "certificate",
                    "ciphertext": aead::encrypt(TEST_V3_KEY, "61f9c719728a", "certificate", cert_pem.as_bytes()).unwrap()
                }
            })
        };
        // A valid entry ahead of the bad one must not be cached either.
        let list = serde_json::json!({"data": [
            entry(PLATFORM_A_SERIAL_NO, PLATFORM_A_CERT_PEM),
            entry(PLATFORM_B_SERIAL_NO, PLATFORM_A_CERT_PEM),
        ]});
        client.transport().route_v3("/v3/certificates", 200, &list.to_string());

        let err = client.refresh_platform_certificates().await.unwrap_err();
        assert!(matches!(err, PaygateError::Certificate(_)));
        assert!(client.platform_certificates().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_with_wrong_v3_key_fails() {
        let mock = MockGateway::new(TEST_KEY, "ffffffffffffffffffffffffffffffff");
        mock.route_v3(QUERY_PATH, 200, QUERY_BODY);
        let client = GatewayClient::new(mock, test_options());

        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::Crypto(_)));
        assert!(client.platform_certificates().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let client = client();
        client.transport().fail_transport(true);
        let err = client.execute_v3(&query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::Transport(_)));
    }

    #[tokio::test]
    async fn test_preloaded_cache_skips_download() {
        let platform = Arc::new(CertificateCache::new());
        platform.try_insert_if_absent(PLATFORM_A_SERIAL_NO, platform_a_record());
        let mock = MockGateway::default();
        mock.route_v3(QUERY_PATH, 200, QUERY_BODY);
        let client = GatewayClient::with_caches(mock, test_options(), Arc::default(), platform);

        client.execute_v3(&query()).await.unwrap();
        assert_eq!(client.transport().certificate_downloads(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_converge() {
        let client = Arc::new(client());
        let mut tasks = JoinSet::new();
        for _ in 0..16 {
            let client = Arc::clone(&client);
            tasks.spawn(async move { client.execute_v3(&query()).await.map(|r| r.status_code) });
        }
        while let Some(result) = tasks.join_next().await {
            assert_eq!(result.unwrap().unwrap(), 200);
        }

        assert_eq!(client.transport().certificate_downloads(), 1);
        assert_eq!(client.platform_certificates().len(), 1);
    }

    #[tokio::test]
    async fn test_verify_notification() {
        let client = client();
        let resource = r#"{"out_trade_no":"T1001","trade_state":"SUCCESS"}"#;
        let body = serde_json::json!({
            "id": "EV-2018022511223320873",
            "create_time": "2015-05-20T13:29:35+08:00",
            "event_type": "TRANSACTION.SUCCESS",
            "resource_type": "encrypt-resource",
            "summary": "payment succeeded",
            "resource": {
                "algorithm": "AEAD_AES_256_GCM",
                "original_type": "transaction",
                "associated_data": "transaction",
                "nonce": "fdasflkja484",
                "ciphertext": aead::encrypt(TEST_V3_KEY, "fdasflkja484", "transaction", resource.as_bytes()).unwrap(),
            }
        })
        .to_string();

        let key = rsa_sha256::load_private_key(PLATFORM_A_KEY_PEM).unwrap();
        let signature =
            rsa_sha256::sign_sha256_rsa(&key, &rsa_sha256::response_source("1700000000", "n1", &body)).unwrap();
        let headers = NotificationHeaders::new(PLATFORM_A_SERIAL_NO, "1700000000", "n1", signature);

        let notification: Notification<Transaction> = client.verify_notification(&headers, &body).await.unwrap();
        assert_eq!(notification.envelope.event_type, "TRANSACTION.SUCCESS");
        assert_eq!(notification.data.out_trade_no, "T1001");

        let tampered = body.replace("payment succeeded", "payment succeeded!");
        let err = client
            .verify_notification::<Transaction>(&headers, &tampered)
            .await
            .unwrap_err();
        assert!(err.is_verification_failure());
    }

    #[tokio::test]
    async fn test_missing_signature_headers_fail_without_download() {
        let client = client();
        let err = client
            .verify_notification::<Transaction>(&NotificationHeaders::default(), r#"{"id":"1","event_type":"X","resource":{"algorithm":"AEAD_AES_256_GCM","ciphertext":"","nonce":""}}"#)
            .await
            .unwrap_err();
        assert!(err.is_verification_failure());
        assert_eq!(client.transport().certificate_downloads(), 0);
    }

    fn order_query_reply() -> ParameterSet {
        [
            ("result_code", "SUCCESS"),
            ("trade_state", "SUCCESS"),
            ("out_trade_no", "1415757673"),
            ("total_fee", "101"),
        ]
        .into_iter()
        .collect()
    }

    fn order_query() -> OrderQueryRequest {
        OrderQueryRequest {
            out_trade_no: Some("1415757673".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_v2_signed_round_trip() {
        let client = client();
        client.transport().route_v2("pay/orderquery", order_query_reply());

        let response = client.execute_v2(&order_query()).await.unwrap();
        assert!(response.is_business_success());
        assert_eq!(response.data.total_fee.as_deref(), Some("101"));

        let calls = client.transport().v2_calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].identity_serial.is_none());
        assert_eq!(calls[0].parameters.get("appid"), Some(TEST_APP_ID));
    }

    #[tokio::test]
    async fn test_v2_hmac_round_trip() {
        let client = client();
        client.transport().route_v2("pay/closeorder", order_query_reply());
        let request: V2ApiRequest = V2ApiRequest::new("pay/closeorder")
            .param("out_trade_no", "1415757673")
            .with_sign_type(SignType::HmacSha256);

        let response = client.execute_v2(&request).await.unwrap();
        assert_eq!(response.data.get("sign_type"), Some("HMAC-SHA256"));
    }

    #[tokio::test]
    async fn test_v2_tampered_reply_fails_closed() {
        let client = client();
        client.transport().route_v2("pay/orderquery", order_query_reply());
        client.transport().tamper("101", "901");

        let err = client.execute_v2(&order_query()).await.unwrap_err();
        assert!(err.is_verification_failure());
    }

    #[tokio::test]
    async fn test_v2_forged_sign_fails_closed() {
        let client = client();
        client.transport().route_v2_raw(
            "pay/orderquery",
            "<xml><return_code>SUCCESS</return_code><result_code>SUCCESS</result_code><sign>0123</sign></xml>",
        );
        let err = client.execute_v2(&order_query()).await.unwrap_err();
        assert!(err.is_verification_failure());
    }

    #[tokio::test]
    async fn test_v2_success_without_sign_fails() {
        let client = client();
        client
            .transport()
            .route_v2_raw("pay/orderquery", "<xml><return_code>SUCCESS</return_code></xml>");
        let err = client.execute_v2(&order_query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::SignatureVerification(_)));
    }

    #[tokio::test]
    async fn test_v2_fail_reply_returned_unverified() {
        let client = client();
        client.transport().route_v2_raw(
            "pay/orderquery",
            "<xml><return_code>FAIL</return_code><return_msg>invalid appid</return_msg></xml>",
        );
        let response = client.execute_v2(&order_query()).await.unwrap();
        assert!(!response.is_success());
        assert_eq!(response.return_msg(), Some("invalid appid"));
        assert_eq!(response.data.return_code, "FAIL");
    }

    #[tokio::test]
    async fn test_v2_empty_body_is_parse_error() {
        let client = client();
        client.transport().route_v2_raw("pay/orderquery", "");
        let err = client.execute_v2(&order_query()).await.unwrap_err();
        assert!(matches!(err, PaygateError::ResponseParse { .. }));
    }

    #[tokio::test]
    async fn test_v2_certificate_mode_selects_identity() {
        let client = client();
        client.transport().route_v2("secapi/pay/refund", order_query_reply());
        let request = RefundRequest {
            out_trade_no: "1415757673".to_string(),
            out_refund_no: "R1".to_string(),
            total_fee: 101,
            refund_fee: 101,
            refund_desc: None,
        };

        client.execute_v2(&request).await.unwrap();
        client.execute_v2(&request).await.unwrap();

        let calls = client.transport().v2_calls();
        assert_eq!(calls[0].identity_serial.as_deref(), Some(CLIENT_SERIAL_NO));
        assert_eq!(client.client_certificates().serial_numbers(), vec![CLIENT_SERIAL_NO.to_string()]);
    }

    #[tokio::test]
    async fn test_v2_configured_serial_names_identity() {
        let options = test_options().with_certificate_serial_no("CONFIGURED");
        let client = GatewayClient::new(MockGateway::default(), options);
        client.transport().route_v2("secapi/pay/refund", order_query_reply());
        let request = RefundRequest {
            out_trade_no: "1415757673".to_string(),
            out_refund_no: "R1".to_string(),
            total_fee: 101,
            refund_fee: 101,
            refund_desc: None,
        };

        client.execute_v2(&request).await.unwrap();
        client.execute_v2(&request).await.unwrap();

        let calls = client.transport().v2_calls();
        assert!(calls
            .iter()
            .all(|call| call.identity_serial.as_deref() == Some("CONFIGURED")));
        assert_eq!(client.client_certificates().serial_numbers(), vec!["CONFIGURED".to_string()]);
        assert_eq!(client.options().client_serial_no().unwrap(), "CONFIGURED");
    }

    #[tokio::test]
    async fn test_v2_reply_value_spaces_are_signed_verbatim() {
        let client = client();
        let reply: ParameterSet = [
            ("return_code", "SUCCESS"),
            ("return_msg", " OK "),
            ("result_code", "SUCCESS"),
            ("trade_state", "NOTPAY"),
        ]
        .into_iter()
        .collect();
        let sign = signing::sign_with_key(&reply, TEST_KEY, SignType::Md5).unwrap();
        let body = format!(
            "<xml>\n<return_code>SUCCESS</return_code>\n<return_msg> OK </return_msg>\n\
             <result_code>SUCCESS</result_code>\n<trade_state>NOTPAY</trade_state>\n\
             <sign>{sign}</sign>\n</xml>"
        );
        client.transport().route_v2_raw("pay/orderquery", &body);

        let response = client.execute_v2(&order_query()).await.unwrap();
        assert_eq!(response.return_msg(), Some(" OK "));
        assert_eq!(response.data.trade_state.as_deref(), Some("NOTPAY"));
    }

    #[tokio::test]
    async fn test_v2_certificate_mode_requires_certificate() {
        let mut options = test_options();
        options.certificate.clear();
        let client = GatewayClient::new(MockGateway::default(), options);
        let request = RefundRequest {
            out_trade_no: "T".to_string(),
            out_refund_no: "R".to_string(),
            total_fee: 1,
            refund_fee: 1,
            refund_desc: None,
        };

        let err = client.execute_v2(&request).await.unwrap_err();
        assert!(matches!(err, PaygateError::Configuration { field: "certificate" }));
        assert_eq!(client.transport().total_calls(), 0);

        // Plain calls do not need it.
        client.transport().route_v2("pay/orderquery", order_query_reply());
        client.execute_v2(&order_query()).await.unwrap();
    }

    #[tokio::test]
    async fn test_v2_missing_key_fails_before_io() {
        let mut options = test_options();
        options.key.clear();
        let client = GatewayClient::new(MockGateway::default(), options);
        let err = client.execute_v2(&order_query()).await.unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(client.transport().total_calls(), 0);
    }

    #[test]
    fn test_page_execute_builds_redirect() {
        let client = client();
        let request = EntrustWebRequest {
            plan_id: "12535".to_string(),
            contract_code: "100000".to_string(),
            request_serial: 1000,
            contract_display_account: "Alice & Bob".to_string(),
            notify_url: "https://merchant.test/notify".to_string(),
        };

        let url = client.page_execute_v2(&request, |url| url).unwrap();
        assert!(url.starts_with("https://api.mch.weixin.qq.com/papay/entrustweb?appid="));
        assert!(url.contains("contract_display_account=Alice%20%26%20Bob"));
        assert!(url.contains("&sign="));
        assert_eq!(client.transport().total_calls(), 0);

        #[derive(Debug)]
        struct Redirect {
            location: String,
        }
        let request: V2ApiRequest = V2ApiRequest::new("https://pay.test/page?from=app");
        let redirect = client
            .page_execute_v2(&request, |location| Redirect { location })
            .unwrap();
        assert!(redirect.location.starts_with("https://pay.test/page?from=app&appid="));
    }

    #[test]
    fn test_v2_sdk_parameters_signed() {
        let client = client();
        let parameters = client
            .execute_v2_sdk(&AppPaySdkRequest {
                prepay_id: "wx201410272009395522657a690389285100".to_string(),
            })
            .unwrap();

        assert_eq!(parameters.get("package"), Some("Sign=WXPay"));
        assert_eq!(parameters.get("partnerid"), Some("1900000109"));
        let sign = parameters.get(SIGN_FIELD).unwrap();
        assert!(signing::verify_with_key(&parameters, TEST_KEY, SignType::Md5, sign).unwrap());
    }

    #[test]
    fn test_v3_sdk_pay_sign_verifies() {
        let client = client();
        let parameters = client
            .execute_v3_sdk(&JsApiSdkRequest {
                prepay_id: "wx201410272009395522657a690389285100".to_string(),
            })
            .unwrap();

        assert_eq!(parameters.sign_type, "RSA");
        let client_record = CertificateRecord::from_pem(client.options().certificate.as_bytes()).unwrap();
        let source = rsa_sha256::sdk_source(
            &parameters.app_id,
            &parameters.time_stamp,
            &parameters.nonce_str,
            &parameters.package,
        );
        assert!(rsa_sha256::verify_sha256_rsa(client_record.public_key(), &source, &parameters.pay_sign));
    }
}
