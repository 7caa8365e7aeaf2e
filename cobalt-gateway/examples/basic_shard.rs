//! Run a single shard and print event names as they arrive.
//!
//! Usage: DISCORD_TOKEN=... cargo run --example basic_shard

use cobalt_gateway::{Shard, ShardConfig};
use cobalt_model::Intents;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let token = std::env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN not set");
    let config = ShardConfig::new(token, Intents::default());
    let shard = Arc::new(Shard::new(0, 1, config));

    let (event_tx, event_rx) = flume::unbounded();

    let runner = Arc::clone(&shard);
    tokio::spawn(async move {
        if let Err(e) = runner.run(event_tx).await {
            eprintln!("shard stopped: {e}");
        }
    });

    while let Ok(event) = event_rx.recv_async().await {
        println!("{}", event.name());
    }

    Ok(())
}
