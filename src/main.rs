mod cli;
mod service;

use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use relaybox::config::RelayConfig;
use relaybox::message::{Message, next_message_id};
use relaybox::queue::MessageStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => service::run(cli.config).await?,
        Commands::Enqueue(args) => {
            let config = RelayConfig::load(cli.config.as_deref())?;
            let store = MessageStore::open(&config.data_dir)?;

            let msg = Message {
                id: next_message_id(),
                sender: args.sender,
                body: args.body,
                captured_at_millis: Utc::now().timestamp_millis(),
                service_center_address: args.service_center,
                protocol_id: 0,
                delivery_status: 0,
                storage_index: -1,
            };
            store.append(&msg)?;
            println!("queued message {}", msg.id);
        }
        Commands::Status => {
            let config = RelayConfig::load(cli.config.as_deref())?;
            let store = MessageStore::open(&config.data_dir)?;
            println!(
                "{} pending message(s) in {}",
                store.count()?,
                config.data_dir.display()
            );
        }
    }

    Ok(())
}
