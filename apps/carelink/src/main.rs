//! # CareLink
//!
//! Clinical observation records for nurses and patients.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                  apps/carelink (THE BINARY)               │
//! │                                                           │
//! │  ┌───────────┐    ┌────────────┐    ┌──────────────────┐  │
//! │  │   CLI     │    │  HTTP API  │    │    Prediction    │  │
//! │  │  (clap)   │    │   (axum)   │    │ gateway (reqwest)│  │
//! │  └─────┬─────┘    └─────┬──────┘    └────────┬─────────┘  │
//! │        └────────────────┼────────────────────┘            │
//! │                         ▼                                 │
//! │                 ┌───────────────┐                         │
//! │                 │ carelink-core │                         │
//! │                 │  (THE LOGIC)  │                         │
//! │                 └───────────────┘                         │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! carelink server --host 0.0.0.0 --port 8080
//! carelink --config carelink.toml status
//! carelink users --role nurse --json-mode
//! ```

use carelink::cli;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // CARELINK_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("CARELINK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carelink=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!(
        r"
   ___               _    _       _
  / __|__ _ _ _ ___ | |  (_)_ _  | |__
 | (__/ _` | '_/ -_)| |__| | ' \ | / /
  \___\__,_|_| \___||____|_|_||_||_\_\

  Clinical observation records v{}
",
        env!("CARGO_PKG_VERSION")
    );
}
