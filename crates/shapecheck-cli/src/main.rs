//! shapecheck entry point.
//!
//! Validate JSON files against a declared type:
//! ```bash
//! shapecheck --project schemas --module . --type User users/*.json
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = shapecheck_cli::Args::parse();
    let mut stdout = std::io::stdout().lock();
    let all_valid = shapecheck_cli::run(&args, &mut stdout).await?;
    Ok(if all_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
