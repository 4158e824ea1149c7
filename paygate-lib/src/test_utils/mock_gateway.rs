//! In-memory gateway for pipeline tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::certificates::{
    CertificateRecord, EncryptedCertificatePayload, PlatformCertificateEntry, PlatformCertificateList,
};
use crate::signing::{self, aead, rsa_sha256, SignType, SIGN_FIELD, SIGN_TYPE_FIELD};
use crate::transport::{
    GatewayTransport, RawResponse, TransportIdentity, V3HttpRequest, V3RawResponse,
};
use crate::{GatewayOptions, ParameterSet, PaygateError, Result};

use super::fixtures::{
    PLATFORM_A_CERT_PEM, PLATFORM_A_KEY_PEM, PLATFORM_A_SERIAL_NO, TEST_KEY, TEST_V3_KEY,
};

/// Path of the platform certificate list endpoint.
const CERTIFICATES_PATH: &str = "/v3/certificates";

/// One older protocol call as the mock received it.
#[derive(Clone, Debug)]
pub struct RecordedV2Call {
    /// Client certificate serial when mutual TLS was requested.
    pub identity_serial: Option<String>,
    pub url: String,
    pub parameters: ParameterSet,
}

#[derive(Clone)]
enum V2Reply {
    Signed(ParameterSet),
    Raw(String),
}

/// A [`GatewayTransport`] that plays the gateway's part in memory.
///
/// Newer protocol replies are signed with the key of the serving platform
/// certificate and carry its serial. `/v3/certificates` returns every
/// published certificate, AEAD-wrapped with the mock's v3 key. Older protocol
/// replies are signed with the mock's shared secret using the algorithm the
/// request declared; requests with a bad signature get a `FAIL` reply.
pub struct MockGateway {
    v2_key: String,
    v3_key: String,
    serving: Mutex<(String, String)>,
    published: Mutex<Vec<String>>,
    v3_routes: Mutex<HashMap<String, (u16, String)>>,
    v2_routes: Mutex<HashMap<String, V2Reply>>,
    tamper: Mutex<Option<(String, String)>>,
    fail_transport: AtomicBool,
    certificate_downloads: AtomicUsize,
    v3_calls: Mutex<Vec<V3HttpRequest>>,
    v2_calls: Mutex<Vec<RecordedV2Call>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new(TEST_KEY, TEST_V3_KEY)
    }
}

impl MockGateway {
    /// Mock serving and publishing platform certificate A.
    pub fn new(v2_key: &str, v3_key: &str) -> Self {
        Self {
            v2_key: v2_key.to_string(),
            v3_key: v3_key.to_string(),
            serving: Mutex::new((PLATFORM_A_SERIAL_NO.to_string(), PLATFORM_A_KEY_PEM.to_string())),
            published: Mutex::new(vec![PLATFORM_A_CERT_PEM.to_string()]),
            v3_routes: Mutex::new(HashMap::new()),
            v2_routes: Mutex::new(HashMap::new()),
            tamper: Mutex::new(None),
            fail_transport: AtomicBool::new(false),
            certificate_downloads: AtomicUsize::new(0),
            v3_calls: Mutex::new(Vec::new()),
            v2_calls: Mutex::new(Vec::new()),
        }
    }

    /// Sign subsequent newer protocol replies as `serial_no` with `key_pem`.
    pub fn serve_as(&self, serial_no: &str, key_pem: &str) {
        *self.serving.lock().unwrap() = (serial_no.to_string(), key_pem.to_string());
    }

    /// Add a certificate to the downloadable list.
    pub fn publish_certificate(&self, cert_pem: &str) {
        self.published.lock().unwrap().push(cert_pem.to_string());
    }

    /// Replace the downloadable list.
    pub fn set_published_certificates(&self, cert_pems: &[&str]) {
        *self.published.lock().unwrap() = cert_pems.iter().map(|pem| pem.to_string()).collect();
    }

    /// Answer newer protocol calls to `path` with `status` and `body`.
    /// A route for `/v3/certificates` replaces the generated list.
    pub fn route_v3(&self, path: &str, status: u16, body: &str) {
        self.v3_routes
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    /// Answer older protocol calls to `url` with a signed reply built from
    /// `reply`. `return_code=SUCCESS` is added unless present.
    pub fn route_v2(&self, url: &str, reply: ParameterSet) {
        self.v2_routes
            .lock()
            .unwrap()
            .insert(url.to_string(), V2Reply::Signed(reply));
    }

    /// Answer older protocol calls to `url` with `body` verbatim.
    pub fn route_v2_raw(&self, url: &str, body: &str) {
        self.v2_routes
            .lock()
            .unwrap()
            .insert(url.to_string(), V2Reply::Raw(body.to_string()));
    }

    /// Replace `from` with `to` in every reply body after it has been signed.
    pub fn tamper(&self, from: &str, to: &str) {
        *self.tamper.lock().unwrap() = Some((from.to_string(), to.to_string()));
    }

    /// Make every call fail at the transport layer.
    pub fn fail_transport(&self, fail: bool) {
        self.fail_transport.store(fail, Ordering::SeqCst);
    }

    /// Number of certificate list downloads served.
    pub fn certificate_downloads(&self) -> usize {
        self.certificate_downloads.load(Ordering::SeqCst)
    }

    /// Newer protocol calls received, certificate downloads included.
    pub fn v3_calls(&self) -> Vec<V3HttpRequest> {
        self.v3_calls.lock().unwrap().clone()
    }

    /// Older protocol calls received.
    pub fn v2_calls(&self) -> Vec<RecordedV2Call> {
        self.v2_calls.lock().unwrap().clone()
    }

    /// Total calls of either generation.
    pub fn total_calls(&self) -> usize {
        self.v3_calls.lock().unwrap().len() + self.v2_calls.lock().unwrap().len()
    }

    fn apply_tamper(&self, body: String) -> String {
        match self.tamper.lock().unwrap().as_ref() {
            Some((from, to)) => body.replacen(from.as_str(), to, 1),
            None => body,
        }
    }

    fn certificate_list(&self) -> String {
        let data = self
            .published
            .lock()
            .unwrap()
            .iter()
            .map(|pem| {
                let record = CertificateRecord::from_pem(pem.as_bytes()).unwrap();
                let nonce = signing::generate_nonce()[..12].to_string();
                PlatformCertificateEntry {
                    serial_no: record.serial_no().to_string(),
                    effective_time: Some(record.not_before().to_rfc3339()),
                    expire_time: Some(record.not_after().to_rfc3339()),
                    encrypt_certificate: EncryptedCertificatePayload {
                        algorithm: aead::AEAD_AES_256_GCM.to_string(),
                        ciphertext: aead::encrypt(&self.v3_key, &nonce, "certificate", pem.as_bytes())
                            .unwrap(),
                        nonce,
                        associated_data: "certificate".to_string(),
                    },
                }
            })
            .collect();
        serde_json::to_string(&PlatformCertificateList { data }).unwrap()
    }

    fn v2_reply(&self, request: &ParameterSet, reply: Option<V2Reply>) -> String {
        let sign_type = request
            .get(SIGN_TYPE_FIELD)
            .map(|s| SignType::from_str(s).unwrap())
            .unwrap_or_default();
        let request_signed = request
            .get(SIGN_FIELD)
            .map(|sign| signing::verify_with_key(request, &self.v2_key, sign_type, sign).unwrap())
            .unwrap_or(false);

        let mut reply = match reply {
            Some(V2Reply::Raw(body)) => return body,
            Some(V2Reply::Signed(reply)) if request_signed => reply,
            Some(_) => fail_reply("signature error"),
            None => fail_reply("unknown endpoint"),
        };
        if !reply.contains_key("return_code") {
            reply.insert("return_code", "SUCCESS");
        }
        if reply.get("return_code") == Some("SUCCESS") {
            reply.insert("nonce_str", signing::generate_nonce());
            if sign_type != SignType::Md5 {
                reply.insert(SIGN_TYPE_FIELD, sign_type.as_str());
            }
            let sign = signing::sign_with_key(&reply, &self.v2_key, sign_type).unwrap();
            reply.insert(SIGN_FIELD, sign);
        }
        reply.to_xml().unwrap()
    }
}

fn fail_reply(message: &str) -> ParameterSet {
    let mut reply = ParameterSet::new();
    reply.insert("return_code", "FAIL").insert("return_msg", message);
    reply
}

/// Path of `url` without scheme, host or query.
fn path_of(url: &str) -> &str {
    let path = match url.find("://") {
        Some(scheme) => {
            let rest = &url[scheme + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => url,
    };
    path.split('?').next().unwrap_or(path)
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl GatewayTransport for MockGateway {
    async fn post_v2(
        &self,
        identity: TransportIdentity<'_>,
        url: &str,
        body: String,
    ) -> Result<RawResponse> {
        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(PaygateError::Transport("post_v2: connection refused".to_string()));
        }
        let parameters = ParameterSet::from_xml(&body).unwrap();
        let identity_serial = match identity {
            TransportIdentity::Anonymous => None,
            TransportIdentity::Certificate { serial_no, .. } => Some(serial_no.to_string()),
        };
        self.v2_calls.lock().unwrap().push(RecordedV2Call {
            identity_serial,
            url: url.to_string(),
            parameters: parameters.clone(),
        });

        let route = self.v2_routes.lock().unwrap().get(url).cloned();
        let body = self.v2_reply(&parameters, route);
        Ok(RawResponse {
            status: 200,
            body: self.apply_tamper(body),
        })
    }

    async fn send_v3(&self, request: &V3HttpRequest, options: &GatewayOptions) -> Result<V3RawResponse> {
        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(PaygateError::Transport("send_v3: connection refused".to_string()));
        }
        // The real transport cannot authorize without these.
        options.require_mch_id()?;
        options.require_private_key()?;
        self.v3_calls.lock().unwrap().push(request.clone());

        let path = path_of(&request.url);
        let route = self.v3_routes.lock().unwrap().get(path).cloned();
        if path == CERTIFICATES_PATH {
            self.certificate_downloads.fetch_add(1, Ordering::SeqCst);
        }
        let (status, body) = match route {
            Some(route) => route,
            None if path == CERTIFICATES_PATH => (200, self.certificate_list()),
            None => (
                404,
                r#"{"code":"RESOURCE_NOT_EXISTS","message":"no route"}"#.to_string(),
            ),
        };

        let (serial_no, key_pem) = self.serving.lock().unwrap().clone();
        let key = rsa_sha256::load_private_key(&key_pem).unwrap();
        let timestamp = signing::timestamp_now();
        let nonce = signing::generate_nonce();
        let signature =
            rsa_sha256::sign_sha256_rsa(&key, &rsa_sha256::response_source(&timestamp, &nonce, &body)).unwrap();

        Ok(V3RawResponse {
            serial_no,
            timestamp,
            nonce,
            signature,
            body: self.apply_tamper(body),
            status,
        })
    }
}
