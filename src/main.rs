//! kgate - provision and tunnel to cloud kernel gateways

use clap::Parser;

use kgate_cli::cli::Cli;
use kgate_cli::domain::error::{ConnectError, ProvisionError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e}");
        std::process::exit(exit_code(&e));
    }
}

/// Maps typed domain errors to their per-failure-kind exit codes; anything
/// untyped exits 1. Usage errors exit 2 via clap before we get here.
fn exit_code(e: &anyhow::Error) -> i32 {
    if let Some(err) = e.downcast_ref::<ProvisionError>() {
        err.exit_code()
    } else if let Some(err) = e.downcast_ref::<ConnectError>() {
        err.exit_code()
    } else {
        1
    }
}
