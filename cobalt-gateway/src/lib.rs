//! Cobalt Gateway - Discord Gateway WebSocket client
#![deny(unsafe_code)]
//!
//! This crate drives the persistent full-duplex connection to Discord's
//! Gateway: the identify/resume handshake, the heartbeat loop, sequence
//! tracking, close-code recovery, and the shard fleet.
//!
//! # Example
//!
//! ```ignore
//! use cobalt_gateway::{Shard, ShardConfig};
//! use cobalt_model::Intents;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ShardConfig::new("your-token", Intents::default());
//!     let shard = Shard::new(0, 1, config);
//!
//!     let (event_tx, event_rx) = flume::unbounded();
//!     shard.run(event_tx).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod event;
pub mod heartbeat;
mod manager;
mod opcode;
mod payload;
mod ratelimit;
mod shard;

pub use error::{CloseCode, GatewayError, ReconnectAction};
pub use event::Event;
pub use manager::{ManagerConfig, ShardManager};
pub use opcode::OpCode;
pub use payload::{
    ConnectionProperties, GatewayPayload, Hello, Identify, Ready, RequestGuildMembers, Resume,
    UpdatePresence, UpdateVoiceState,
};
pub use ratelimit::{CommandRatelimiter, IdentifyRateLimiter};
pub use shard::{Shard, ShardConfig, ShardState};

/// Default gateway URL (overridden by the /gateway/bot response).
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Compute the shard that owns a guild.
///
/// The top 42 bits of a snowflake are its timestamp; shifting them down
/// spreads guilds uniformly over `total` shards. All guild-scoped gateway
/// commands must travel over the owning shard's socket.
#[must_use]
pub fn shard_for(guild_id: cobalt_model::Snowflake, total: u16) -> u16 {
    ((guild_id.get() >> 22) % u64::from(total.max(1))) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobalt_model::Snowflake;

    #[test]
    fn shard_for_is_stable_and_in_range() {
        for total in [1u16, 2, 4, 16, 333] {
            for raw in [0u64, 1, 1 << 22, 123456789012582400, u64::MAX] {
                let id = Snowflake::new(raw);
                let shard = shard_for(id, total);
                assert!(shard < total);
                assert_eq!(shard, shard_for(id, total));
            }
        }
    }

    #[test]
    fn guilds_with_equal_timestamp_share_a_shard() {
        // Same upper 42 bits, different worker/increment bits
        let a = Snowflake::new((77 << 22) | 0x1234);
        let b = Snowflake::new((77 << 22) | 0xABC);
        assert_eq!(shard_for(a, 4), shard_for(b, 4));
    }

    #[test]
    fn known_routing_example() {
        let id = Snowflake::new(123456789012582400);
        assert_eq!(u64::from(shard_for(id, 4)), (123456789012582400 >> 22) % 4);
    }
}
