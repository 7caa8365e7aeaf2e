//! Common imports for bot code.
//!
//! ```no_run
//! use cobalt::prelude::*;
//! ```

pub use crate::{Client, ClientBuilder, CobaltError, Context, EventHandler, ShardCount};

pub use async_trait::async_trait;

pub use cobalt_cache::{CachedGuild, InMemoryCache};
pub use cobalt_gateway::{Event, Ready, ShardState, UpdatePresence};
pub use cobalt_http::{CreateMessage, FileUpload, HttpClient, HttpError};
pub use cobalt_model::{
    Activity, ApiVersion, Channel, ChannelType, Guild, GuildMember, Intents, Message, Role,
    Snowflake, StatusType, UnavailableGuild, User, VoiceState,
};
