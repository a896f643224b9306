//! Command line arguments.

use std::path::PathBuf;

use chronicle_event_store::config::STORE_DIR_VAR;
use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Inspect the records of a Chronicle event store directory.
#[derive(Debug, Parser)]
#[command(name = "chronicle", version, about)]
pub struct Cli {
    /// Directory holding the `.event` record files.
    #[arg(long, env = STORE_DIR_VAR)]
    pub store: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List every event id in chronological order.
    Events,
    /// Show one event record.
    Record {
        /// Id of the event to show.
        event_id: Uuid,
    },
    /// Dump every record of one aggregate, ordered by version.
    Stream {
        /// Stream key of the aggregate.
        aggregate_key: String,
    },
}
