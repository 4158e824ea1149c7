//! CLI command implementations

pub mod call;
pub mod certificates;
pub mod sign;
pub mod verify;

use std::path::Path;

use anyhow::{Context, Result};
use paygate_lib::transport::HttpTransport;
use paygate_lib::{GatewayClient, GatewayOptions, HttpTransportConfig, ParameterSet};

/// Load merchant options from a JSON file, or from `PAYGATE_*` env vars
pub fn load_options(path: Option<&Path>) -> Result<GatewayOptions> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid options file {}", path.display()))
        }
        None => Ok(GatewayOptions::from_env()?),
    }
}

/// Build a client over the reqwest transport
pub fn build_client(
    options_path: Option<&Path>,
    base_url: &str,
) -> Result<GatewayClient<HttpTransport>> {
    let options = load_options(options_path)?;
    let transport = HttpTransport::new(HttpTransportConfig::new(base_url))?;
    tracing::debug!(base_url, mch_id = %options.mch_id, "client ready");
    Ok(GatewayClient::new(transport, options))
}

/// Parse `key=value` arguments into a parameter set
pub fn parse_pairs(pairs: &[String]) -> Result<ParameterSet> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .filter(|(k, _)| !k.is_empty())
                .ok_or_else(|| anyhow::anyhow!("Expected key=value, got '{}'", pair))
        })
        .collect()
}
