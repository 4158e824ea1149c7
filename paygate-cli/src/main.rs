//! Paygate CLI
//!
//! Command-line interface for signing, verifying and calling the payment gateway.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use paygate_lib::config::DEFAULT_BASE_URL;

mod commands;
mod ui;

#[derive(Parser)]
#[command(name = "paygate")]
#[command(about = "Paygate CLI - Sign, verify and call the payment gateway", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON file with merchant options (falls back to PAYGATE_* env vars)
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    /// Gateway base URL
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign an older protocol parameter set
    SignV2 {
        /// Signature algorithm (MD5 or HMAC-SHA256)
        #[arg(short, long, default_value = "MD5")]
        sign_type: String,

        /// Signing secret (defaults to the configured key)
        #[arg(short, long)]
        key: Option<String>,

        /// Parameters as key=value pairs
        #[arg(required = true)]
        params: Vec<String>,
    },

    /// Verify a newer protocol reply signature offline
    VerifyV3 {
        /// Platform certificate (PEM file)
        #[arg(long)]
        certificate: PathBuf,

        /// Wechatpay-Timestamp header value
        #[arg(long)]
        timestamp: String,

        /// Wechatpay-Nonce header value
        #[arg(long)]
        nonce: String,

        /// Wechatpay-Signature header value
        #[arg(long)]
        signature: String,

        /// File holding the exact reply body
        #[arg(long)]
        body: PathBuf,
    },

    /// Download and show the gateway's platform certificates
    Certificates,

    /// Send a verified GET to a newer protocol endpoint
    Get {
        /// Request path, e.g. /v3/pay/transactions/id/{id}?mchid={mchid}
        path: String,
    },

    /// Send a verified POST to a newer protocol endpoint
    Post {
        /// Request path
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("paygate_cli=debug,paygate_lib=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("paygate_cli=info,paygate_lib=warn")
            .init();
    }

    let options = cli.options.as_deref();

    // Dispatch commands
    match cli.command {
        Commands::SignV2 {
            sign_type,
            key,
            params,
        } => {
            commands::sign::run(options, &sign_type, key, &params, cli.verbose).await?;
        }
        Commands::VerifyV3 {
            certificate,
            timestamp,
            nonce,
            signature,
            body,
        } => {
            commands::verify::run(&certificate, &timestamp, &nonce, &signature, &body).await?;
        }
        Commands::Certificates => {
            commands::certificates::run(options, &cli.base_url).await?;
        }
        Commands::Get { path } => {
            commands::call::get(options, &cli.base_url, &path).await?;
        }
        Commands::Post { path, body } => {
            commands::call::post(options, &cli.base_url, &path, &body).await?;
        }
    }

    Ok(())
}
