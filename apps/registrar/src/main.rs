//! # Registrar
//!
//! The main binary for the content-addressed academic record store.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │             apps/registrar (BINARY)           │
//! │                                              │
//! │   ┌─────────────┐        ┌─────────────┐     │
//! │   │    CLI      │        │  HTTP API   │     │
//! │   │   (clap)    │        │   (axum)    │     │
//! │   └──────┬──────┘        └──────┬──────┘     │
//! │          └───────────┬──────────┘            │
//! │                      ▼                       │
//! │             ┌────────────────┐               │
//! │             │ registrar-core │               │
//! │             └────────────────┘               │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! registrar bootstrap
//! registrar transcript -i "Fenerbahce University" -s 190908809
//! registrar server --port 8080
//! ```

use clap::Parser;
use registrar::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // REGISTRAR_LOG_FORMAT=json switches to machine-parseable output.
    let log_format = std::env::var("REGISTRAR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "registrar=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = ?e.kind(), "Error: {}", e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!("registrar v{}", env!("CARGO_PKG_VERSION"));
    println!();
}
