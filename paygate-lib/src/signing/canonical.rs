//! Canonical signing string for the older protocol.

use crate::params::ParameterSet;

/// Field that carries the signature.
pub const SIGN_FIELD: &str = "sign";

/// Field that carries the signature algorithm tag.
pub const SIGN_TYPE_FIELD: &str = "sign_type";

/// Build `k1=v1&k2=v2&...`, optionally followed by `&key=<secret>`.
///
/// Keys are in ascending code-point order; empty values and the
/// [`SIGN_FIELD`] / [`SIGN_TYPE_FIELD`] fields are dropped. With no
/// remaining fields the result is just `key=<secret>` (or empty).
pub fn canonical_string(params: &ParameterSet, secret: Option<&str>) -> String {
    let mut canonical = params
        .iter()
        .filter(|(key, value)| !value.is_empty() && !is_reserved(key))
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    if let Some(secret) = secret {
        if !canonical.is_empty() {
            canonical.push('&');
        }
        canonical.push_str("key=");
        canonical.push_str(secret);
    }

    canonical
}

fn is_reserved(key: &str) -> bool {
    key == SIGN_FIELD || key == SIGN_TYPE_FIELD
}
