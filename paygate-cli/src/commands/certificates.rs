//! Certificates command - download the gateway's platform certificates

use anyhow::Result;
use chrono::Utc;
use std::path::Path;

use crate::ui;

pub async fn run(options_path: Option<&Path>, base_url: &str) -> Result<()> {
    let client = super::build_client(options_path, base_url)?;

    let spinner = ui::spinner("Downloading platform certificates...");
    let result = client.refresh_platform_certificates().await;
    spinner.finish_and_clear();
    let records = result?;

    if records.is_empty() {
        ui::caution("Gateway returned no certificates");
        return Ok(());
    }

    ui::title(&format!("Platform Certificates ({})", records.len()));
    let now = Utc::now();
    for record in &records {
        ui::certificate(record, now);
    }
    tracing::info!(count = records.len(), "platform certificates cached");
    Ok(())
}
