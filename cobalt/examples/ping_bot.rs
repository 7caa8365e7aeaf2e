//! Minimal ping bot.
//!
//! Usage: DISCORD_TOKEN=... cargo run --example ping_bot

use cobalt::prelude::*;

struct Handler;

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        println!("connected as {}", ready.user.username);
    }

    async fn message_create(&self, ctx: Context, msg: Message) {
        if msg.content == "!ping" {
            if let Err(e) = ctx.send(msg.channel_id, "Pong!").await {
                eprintln!("failed to reply: {e}");
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CobaltError> {
    tracing_subscriber::fmt::init();

    let token = std::env::var("DISCORD_TOKEN").expect("DISCORD_TOKEN not set");

    Client::builder(token)
        .intents(Intents::GUILDS | Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT)
        .event_handler(Handler)
        .build()
        .await?
        .start()
        .await
}
