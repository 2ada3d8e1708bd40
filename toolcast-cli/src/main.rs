//! toolcast server binary
//!
//! Registers every kind factory, loads the manifest, and serves both wire
//! surfaces. Exits non-zero when the configuration fails to load.

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "toolcast", author, version, about = "Configuration-driven tool and prompt server for AI agents", long_about = None)]
struct Cli {
    /// Manifest file path
    #[arg(short, long, value_name = "FILE", default_value = "tools.yaml", env = "TOOLCAST_CONFIG")]
    config: PathBuf,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1", env = "TOOLCAST_ADDRESS")]
    address: String,

    /// Bind port
    #[arg(short, long, default_value = "5000", env = "TOOLCAST_PORT")]
    port: u16,

    /// Log filter (tracing env-filter syntax)
    #[arg(long, default_value = "info", env = "TOOLCAST_LOG")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    // Kind factories must be in place before the manifest decodes
    toolcast_sources::register_all();
    toolcast_tools::register_all();
    toolcast_auth::register_all();

    let addr: SocketAddr = format!("{}:{}", cli.address, cli.port).parse()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(toolcast_server::serve(addr, cli.config))
}
