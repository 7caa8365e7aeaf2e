use crate::snowflake::Snowflake;
use serde::{Deserialize, Serialize};

/// A user's voice connection state within a guild.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceState {
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    /// Channel the user is connected to; `None` means disconnected.
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Voice session ID, distinct from the gateway session.
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub suppress: bool,
}

/// `VOICE_SERVER_UPDATE`: credentials for the voice subsystem.
///
/// Forwarded to the downstream voice consumer untouched; the core does not
/// open UDP transports.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceServerUpdateEvent {
    /// Voice connection token.
    pub token: String,
    pub guild_id: Snowflake,
    /// Voice server host; `None` while the server is being allocated.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_server_update_without_endpoint() {
        let json = r#"{"token":"abc","guild_id":"20","endpoint":null}"#;
        let event: VoiceServerUpdateEvent = serde_json::from_str(json).unwrap();
        assert!(event.endpoint.is_none());
        assert_eq!(event.guild_id.get(), 20);
    }
}
