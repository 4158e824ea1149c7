//! Sign command - sign an older protocol parameter set

use anyhow::{bail, Result};
use paygate_lib::signing::{canonical_string, sign_with_key, SignType};
use paygate_lib::ParameterSet;
use std::path::Path;

use crate::ui;

pub async fn run(
    options_path: Option<&Path>,
    sign_type: &str,
    key: Option<String>,
    pairs: &[String],
    verbose: bool,
) -> Result<()> {
    let sign_type: SignType = sign_type.parse()?;
    let key = match key {
        Some(key) => key,
        None => super::load_options(options_path)?.key.clone(),
    };
    if key.is_empty() {
        bail!("No signing key. Pass --key or set PAYGATE_KEY");
    }

    let params = super::parse_pairs(pairs)?;
    let sign = sign(&params, &key, sign_type)?;

    let canonical = verbose.then(|| masked_canonical(&params));
    ui::signature(sign_type.as_str(), &sign, canonical.as_deref());
    Ok(())
}

pub fn sign(params: &ParameterSet, key: &str, sign_type: SignType) -> Result<String> {
    Ok(sign_with_key(params, key, sign_type)?)
}

fn masked_canonical(params: &ParameterSet) -> String {
    canonical_string(params, Some("***"))
}
