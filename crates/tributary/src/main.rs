//! Tributary CLI: registers S3 assets and lineage in the metadata catalog.

use std::process::ExitCode;

use clap::Parser;

use tributary::{Cli, init_tracing};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
