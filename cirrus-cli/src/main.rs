//! cirrus-probe entry point.
//!
//! ```text
//! cirrus-probe                          GET / against the configured endpoint
//! cirrus-probe --endpoint <url>         Override the configured endpoint
//! cirrus-probe -X POST --data '{...}'   Send a body
//! cirrus-probe --config <path>          Load a custom config TOML
//! cirrus-probe --gen-config             Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cirrus_cli::config::ProbeConfig;
use cirrus_cli::probe::{self, ProbeRequest};
use cirrus_core::Method;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "cirrus-probe", about = "Send one request through the cirrus transport")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "cirrus-probe.toml")]
    config: PathBuf,

    /// Endpoint URL, overriding the config file.
    #[arg(short, long)]
    endpoint: Option<String>,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    method: Method,

    /// Request path.
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Extra header, `Name: value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Query parameter, `name=value`. Repeatable.
    #[arg(short, long)]
    query: Vec<String>,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ProbeConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ProbeConfig::load(&cli.config);
    if let Some(endpoint) = cli.endpoint {
        config.endpoint.url = endpoint;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("cirrus-probe v{}", env!("CARGO_PKG_VERSION"));
    info!("endpoint: {}", config.endpoint.url);

    let request = ProbeRequest {
        method: cli.method,
        path: cli.path,
        headers: cli.headers,
        query: cli.query,
        data: cli.data,
    };
    let response = probe::run(&config, &request).await?;
    println!("{}", probe::render(&response));

    Ok(())
}
