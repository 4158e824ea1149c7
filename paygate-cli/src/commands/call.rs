//! Call commands - verified requests to newer protocol endpoints

use anyhow::{bail, Context, Result};
use paygate_lib::requests::v3::V3ApiRequest;
use paygate_lib::transport::HttpTransport;
use paygate_lib::{GatewayClient, V3Response};
use serde_json::Value;
use std::path::Path;

use crate::ui;

pub async fn get(options_path: Option<&Path>, base_url: &str, path: &str) -> Result<()> {
    let client = super::build_client(options_path, base_url)?;
    execute(&client, V3ApiRequest::get(path)).await
}

pub async fn post(options_path: Option<&Path>, base_url: &str, path: &str, body: &str) -> Result<()> {
    let body: Value = serde_json::from_str(body).context("Request body is not valid JSON")?;
    let client = super::build_client(options_path, base_url)?;
    execute(&client, V3ApiRequest::post(path, body)).await
}

async fn execute(client: &GatewayClient<HttpTransport>, request: V3ApiRequest) -> Result<()> {
    let spinner = ui::spinner("Calling gateway...");
    let result = client.execute_v3(&request).await;
    spinner.finish_and_clear();
    report(result?)
}

fn report(response: V3Response<Value>) -> Result<()> {
    if let Some(error) = &response.error {
        ui::gateway_error(response.status_code, error);
        bail!("gateway returned status {}", response.status_code);
    }
    ui::reply(response.status_code, response.data.as_ref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paygate_lib::V3ErrorDetail;

    #[test]
    fn test_report_error_reply_fails() {
        let response = V3Response::<Value> {
            status_code: 404,
            body: r#"{"code":"ORDER_NOT_EXIST","message":"order not found"}"#.to_string(),
            data: None,
            error: Some(V3ErrorDetail {
                code: "ORDER_NOT_EXIST".to_string(),
                message: "order not found".to_string(),
                detail: None,
            }),
        };
        let err = report(response).unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_report_success() {
        let response = V3Response {
            status_code: 200,
            body: r#"{"trade_state":"SUCCESS"}"#.to_string(),
            data: Some(serde_json::json!({"trade_state": "SUCCESS"})),
            error: None,
        };
        assert!(report(response).is_ok());
    }
}
