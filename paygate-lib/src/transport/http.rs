//! reqwest-backed gateway transport.
//!
//! Connects to the gateway over HTTPS (rustls). Older protocol calls that
//! need mutual authentication run on a client built from the merchant
//! certificate; those clients are kept per certificate serial.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Identity, Url};

use super::traits::{
    GatewayTransport, HttpMethod, RawResponse, TransportIdentity, V3HttpRequest, V3RawResponse,
};
use crate::config::HttpTransportConfig;
use crate::signing::{self, RequestAuthorization};
use crate::{GatewayOptions, PaygateError, Result};

const HEADER_SERIAL: &str = "Wechatpay-Serial";
const HEADER_TIMESTAMP: &str = "Wechatpay-Timestamp";
const HEADER_NONCE: &str = "Wechatpay-Nonce";
const HEADER_SIGNATURE: &str = "Wechatpay-Signature";

/// HTTP transport for both protocol generations.
pub struct HttpTransport {
    config: HttpTransportConfig,
    anonymous: Client,
    identities: RwLock<HashMap<String, Client>>,
}

impl HttpTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(PaygateError::Configuration { field: "base_url" });
        }
        let anonymous = builder(&config)
            .build()
            .map_err(|e| PaygateError::Transport(format!("build client: {e}")))?;
        Ok(Self {
            config,
            anonymous,
            identities: RwLock::new(HashMap::new()),
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn client_for(&self, identity: TransportIdentity<'_>) -> Result<Client> {
        let TransportIdentity::Certificate {
            serial_no,
            certificate_pem,
            private_key_pem,
        } = identity
        else {
            return Ok(self.anonymous.clone());
        };

        if let Some(client) = self
            .identities
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(serial_no)
        {
            return Ok(client.clone());
        }

        let pem = format!("{}\n{}", private_key_pem.trim(), certificate_pem.trim());
        let identity = Identity::from_pem(pem.as_bytes())
            .map_err(|e| PaygateError::Certificate(format!("client identity: {e}")))?;
        let client = builder(&self.config)
            .identity(identity)
            .build()
            .map_err(|e| PaygateError::Transport(format!("build client: {e}")))?;

        // A racing builder may have stored one first; keep that one.
        let mut identities = self.identities.write().unwrap_or_else(|e| e.into_inner());
        Ok(identities
            .entry(serial_no.to_string())
            .or_insert(client)
            .clone())
    }

    fn authorization(&self, request: &V3HttpRequest, url: &Url, options: &GatewayOptions) -> Result<String> {
        let private_key = signing::load_private_key(options.require_private_key()?)?;
        let serial_no = options.client_serial_no()?;
        let path_and_query = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let authorization = RequestAuthorization::sign(
            &private_key,
            options.require_mch_id()?,
            &serial_no,
            request.method.as_str(),
            &path_and_query,
            request.body.as_deref().unwrap_or_default(),
            &signing::timestamp_now(),
            &signing::generate_nonce(),
        )?;
        Ok(authorization.header_value())
    }
}

fn builder(config: &HttpTransportConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .user_agent(config.user_agent.clone())
        .use_rustls_tls()
}

fn header(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl GatewayTransport for HttpTransport {
    #[tracing::instrument(skip(self, body), fields(body_len = body.len()))]
    async fn post_v2(
        &self,
        identity: TransportIdentity<'_>,
        url: &str,
        body: String,
    ) -> Result<RawResponse> {
        let client = self.client_for(identity)?;
        let response = client
            .post(self.config.url(url))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| PaygateError::Transport(format!("post_v2: {e}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PaygateError::Transport(format!("post_v2 body: {e}")))?;
        Ok(RawResponse { status, body })
    }

    #[tracing::instrument(skip(self, request, options), fields(method = %request.method, url = %request.url))]
    async fn send_v3(&self, request: &V3HttpRequest, options: &GatewayOptions) -> Result<V3RawResponse> {
        let url = Url::parse(&self.config.url(&request.url))
            .map_err(|e| PaygateError::Transport(format!("send_v3 url: {e}")))?;
        let authorization = self.authorization(request, &url, options)?;

        let builder = match request.method {
            HttpMethod::Get => self.anonymous.get(url),
            HttpMethod::Post => self.anonymous.post(url),
        };
        let mut builder = builder
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json");
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PaygateError::Transport(format!("send_v3: {e}")))?;

        let status = response.status().as_u16();
        let headers = response.headers();
        let serial_no = header(headers, HEADER_SERIAL);
        let timestamp = header(headers, HEADER_TIMESTAMP);
        let nonce = header(headers, HEADER_NONCE);
        let signature = header(headers, HEADER_SIGNATURE);
        let body = response
            .text()
            .await
            .map_err(|e| PaygateError::Transport(format!("send_v3 body: {e}")))?;

        Ok(V3RawResponse {
            serial_no,
            timestamp,
            nonce,
            signature,
            body,
            status,
        })
    }
}
