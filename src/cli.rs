use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "relaybox")]
#[command(about = "Durable store-and-forward relay for captured messages", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (RELAYBOX__* env vars apply on top)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the delivery worker until it idles out or a signal arrives
    Run,
    /// Append one message to the queue (capture stand-in)
    Enqueue(EnqueueArgs),
    /// Print queue diagnostics
    Status,
}

#[derive(clap::Args, Debug)]
pub struct EnqueueArgs {
    /// Originating address
    #[arg(long, default_value = "")]
    pub sender: String,

    /// Message text
    #[arg(long)]
    pub body: String,

    /// Service center address, if known
    #[arg(long)]
    pub service_center: Option<String>,
}
