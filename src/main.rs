//! Provider plugin entrypoint.
//!
//! Started by the host as a subprocess; prints the handshake line on stdout
//! and serves gRPC until told to stop.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use terraform_provider_coolify::{init_logging_with_default, serve_with_options, CoolifyProvider, ServeOptions};

/// Coolify provider plugin.
#[derive(Debug, Parser)]
#[command(name = "terraform-provider-coolify", version, about)]
struct Cli {
    /// Start in debug mode and print reattach instructions on stderr.
    #[arg(long)]
    debug: bool,

    /// Address to listen on. Defaults to an ephemeral port on 127.0.0.1.
    #[arg(long, env = "COOLIFY_PROVIDER_ADDRESS")]
    address: Option<SocketAddr>,

    /// Seconds to wait for in-flight requests on shutdown.
    #[arg(long, default_value_t = 30)]
    shutdown_timeout: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging_with_default(if cli.debug { "debug" } else { "info" });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut options = ServeOptions::new()
        .with_debug(cli.debug)
        .with_shutdown_timeout(Duration::from_secs(cli.shutdown_timeout));
    if let Some(address) = cli.address {
        options = options.with_address(address);
    }

    match runtime.block_on(serve_with_options(CoolifyProvider::new(), options)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}
