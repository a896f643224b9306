//! `chronicle`: inspect the records of an event store directory.

use std::error::Error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod error;
mod inspect;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Logs go to stderr so stdout stays valid JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = cli::Cli::parse();
    tracing::debug!(store = %cli.store.display(), command = ?cli.command, "inspecting store");

    let store = inspect::open(&cli.store)?;
    let output = inspect::run(&store, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
