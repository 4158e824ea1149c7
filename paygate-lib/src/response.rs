//! Verified results returned by the executor.
//!
//! Values of these types are only constructed inside the pipeline after the
//! reply passed its signature check (or the request opted out of it), so
//! holding one means the payload is safe to act on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::params::ParameterSet;
use crate::transport::{RawResponse, V3RawResponse};
use crate::{PaygateError, Result};

/// Value of `return_code` on a successful older protocol reply.
pub const RETURN_SUCCESS: &str = "SUCCESS";

/// An older protocol reply.
#[derive(Clone, Debug)]
pub struct V2Response<T> {
    pub status_code: u16,
    /// Raw XML body.
    pub body: String,
    /// Every field of the reply.
    pub parameters: ParameterSet,
    pub data: T,
}

impl<T> V2Response<T> {
    pub fn return_code(&self) -> Option<&str> {
        self.parameters.get("return_code")
    }

    pub fn return_msg(&self) -> Option<&str> {
        self.parameters.get("return_msg")
    }

    /// Whether the gateway accepted the call at the communication level.
    pub fn is_success(&self) -> bool {
        self.return_code() == Some(RETURN_SUCCESS)
    }

    /// Whether the business operation succeeded as well.
    pub fn is_business_success(&self) -> bool {
        self.is_success() && self.parameters.get("result_code") == Some(RETURN_SUCCESS)
    }
}

pub(crate) fn parse_v2<T: DeserializeOwned>(raw: RawResponse) -> Result<V2Response<T>> {
    if raw.body.trim().is_empty() {
        return Err(PaygateError::response_parse(raw.status, &raw.body, "empty body"));
    }
    let parameters = ParameterSet::from_xml(&raw.body)
        .map_err(|e| PaygateError::response_parse(raw.status, &raw.body, e))?;
    let data = parameters
        .deserialize_into()
        .map_err(|e| PaygateError::response_parse(raw.status, &raw.body, e))?;
    Ok(V2Response {
        status_code: raw.status,
        body: raw.body,
        parameters,
        data,
    })
}

/// Error body of a non-2xx newer protocol reply.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// A newer protocol reply.
///
/// Exactly one of `data` (2xx) and `error` (anything else) is set.
#[derive(Clone, Debug)]
pub struct V3Response<T> {
    pub status_code: u16,
    /// Raw JSON body, as signed by the gateway.
    pub body: String,
    pub data: Option<T>,
    pub error: Option<V3ErrorDetail>,
}

impl<T> V3Response<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// The decoded body, or the gateway's error as [`PaygateError::Gateway`].
    pub fn into_result(self) -> Result<T> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(error)) => Err(PaygateError::Gateway {
                status: self.status_code,
                code: error.code,
                message: error.message,
            }),
            (None, None) => Err(PaygateError::response_parse(self.status_code, &self.body, "no body")),
        }
    }
}

pub(crate) fn parse_v3<T: DeserializeOwned>(raw: &V3RawResponse) -> Result<V3Response<T>> {
    let body = if raw.body.trim().is_empty() { "null" } else { raw.body.as_str() };
    let mut response = V3Response {
        status_code: raw.status,
        body: raw.body.clone(),
        data: None,
        error: None,
    };
    if (200..300).contains(&raw.status) {
        let data = serde_json::from_str(body)
            .map_err(|e| PaygateError::response_parse(raw.status, &raw.body, e))?;
        response.data = Some(data);
    } else {
        let error = serde_json::from_str(body)
            .map_err(|e| PaygateError::response_parse(raw.status, &raw.body, e))?;
        response.error = Some(error);
    }
    Ok(response)
}
