//! Cobalt - a Discord bot client core
#![deny(unsafe_code)]
//!
//! Cobalt keeps a bot connected to Discord's gateway and mediates its REST
//! traffic through a rate-limit governor:
//!
//! - **[`cobalt_gateway`]** - shards, heartbeats, resume/reidentify policy
//! - **[`cobalt_http`]** - REST with per-route buckets and global lockout
//! - **[`cobalt_cache`]** - in-memory guilds, channels, members, DMs
//! - **[`cobalt_model`]** - the shared entity and wire types
//!
//! This crate ties them together behind [`Client`]: build it with a token,
//! register [`EventHandler`]s, and [`Client::start`] runs the fleet and
//! the dispatch loop.

mod client;
mod context;
mod error;
pub mod prelude;

pub use client::{Client, ClientBuilder, EventHandler, ShardCount};
pub use context::Context;
pub use error::CobaltError;

// Re-export the component crates for direct access.
pub use cobalt_cache as cache;
pub use cobalt_gateway as gateway;
pub use cobalt_http as http;
pub use cobalt_model as model;
