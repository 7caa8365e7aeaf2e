//! Gateway payload structures.
//!
//! These structures represent the JSON payloads sent and received over the
//! Gateway WebSocket. Inbound frames are parsed in two stages: the envelope
//! first, with the `d` field deferred via `serde_json::value::RawValue`
//! until the opcode and event name are known.

use crate::opcode::OpCode;
use cobalt_model::{Activity, Intents, Snowflake, StatusType, UnavailableGuild, User};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A raw Gateway payload for initial parsing.
#[derive(Debug, Deserialize)]
pub(crate) struct RawGatewayPayload<'a> {
    /// Opcode for the payload.
    pub op: OpCode,

    /// Event data, deferred.
    #[serde(borrow)]
    pub d: Option<&'a serde_json::value::RawValue>,

    /// Sequence number (only on Dispatch frames).
    pub s: Option<u64>,

    /// Event name (only on Dispatch frames).
    pub t: Option<&'a str>,
}

/// A fully typed outbound Gateway payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload<D> {
    /// Opcode for the payload.
    pub op: OpCode,

    /// Payload data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<D>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl<D: Serialize> GatewayPayload<D> {
    /// Create a new payload with only opcode and data.
    pub fn new(op: OpCode, data: D) -> Self {
        Self {
            op,
            d: Some(data),
            s: None,
            t: None,
        }
    }

    /// Serialize to the wire representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// Hello (op 10, received after connection)
// ============================================================================

/// Payload for the Hello opcode.
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    /// Interval (in milliseconds) at which to send heartbeats.
    pub heartbeat_interval: u64,
}

// ============================================================================
// Identify (op 2, sent to authenticate)
// ============================================================================

/// Payload for the Identify opcode.
#[derive(Debug, Clone, Serialize)]
pub struct Identify<'a> {
    /// Authentication token.
    pub token: Cow<'a, str>,

    /// Gateway intents. Required under API v10; ignored by v6 gateways.
    pub intents: Intents,

    /// Connection properties.
    pub properties: ConnectionProperties<'a>,

    /// Threshold above which offline members are not sent (50-250).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u8>,

    /// Shard information: [shard_id, total_shards].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u16; 2]>,

    /// Initial presence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresence>,
}

impl<'a> Identify<'a> {
    /// Create a new Identify payload with required fields.
    pub fn new(token: impl Into<Cow<'a, str>>, intents: Intents) -> Self {
        Self {
            token: token.into(),
            intents,
            properties: ConnectionProperties::default(),
            large_threshold: Some(250),
            shard: None,
            presence: None,
        }
    }

    /// Set shard information.
    pub fn with_shard(mut self, shard_id: u16, total_shards: u16) -> Self {
        self.shard = Some([shard_id, total_shards]);
        self
    }

    /// Set the large-guild threshold.
    pub fn with_large_threshold(mut self, threshold: u8) -> Self {
        self.large_threshold = Some(threshold);
        self
    }
}

/// Connection properties sent with Identify.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionProperties<'a> {
    /// Operating system.
    pub os: Cow<'a, str>,

    /// Library name.
    pub browser: Cow<'a, str>,

    /// Library name (again, for device).
    pub device: Cow<'a, str>,
}

impl Default for ConnectionProperties<'_> {
    fn default() -> Self {
        Self {
            os: Cow::Owned(std::env::consts::OS.to_string()),
            browser: Cow::Borrowed("cobalt"),
            device: Cow::Borrowed("cobalt"),
        }
    }
}

// ============================================================================
// Resume (op 6)
// ============================================================================

/// Payload for the Resume opcode.
#[derive(Debug, Clone, Serialize)]
pub struct Resume<'a> {
    /// Authentication token.
    pub token: Cow<'a, str>,

    /// Session ID from the previous Ready event.
    pub session_id: Cow<'a, str>,

    /// Last sequence number received.
    pub seq: u64,
}

// ============================================================================
// Ready (dispatch, received after successful Identify)
// ============================================================================

/// Payload for the READY dispatch event.
#[derive(Debug, Clone, Deserialize)]
pub struct Ready {
    /// Gateway protocol version.
    pub v: u8,

    /// Current user.
    pub user: User,

    /// Guilds the bot is in, all initially unavailable.
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,

    /// Session ID for resuming.
    pub session_id: String,

    /// URL to use for resuming the session (absent under v6).
    #[serde(default)]
    pub resume_gateway_url: Option<String>,

    /// Shard information: [shard_id, total_shards].
    #[serde(default)]
    pub shard: Option<[u16; 2]>,
}

// ============================================================================
// Client commands (ops 3, 4, 8)
// ============================================================================

/// Payload for the Status Update opcode (op 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePresence {
    /// Unix timestamp (milliseconds) of when the client went idle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub since: Option<u64>,

    /// Activities to display.
    pub activities: Vec<Activity>,

    /// New status.
    pub status: StatusType,

    /// Whether the client is AFK.
    pub afk: bool,
}

impl UpdatePresence {
    /// A simple online presence with one activity.
    pub fn online(activity: Option<Activity>) -> Self {
        Self {
            since: None,
            activities: activity.into_iter().collect(),
            status: StatusType::Online,
            afk: false,
        }
    }
}

/// Payload for the Voice State Update opcode (op 4).
///
/// Joining a channel allocates a voice server; the resulting
/// `VOICE_SERVER_UPDATE` is forwarded to the downstream voice consumer.
/// `channel_id: None` leaves voice.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateVoiceState {
    pub guild_id: Snowflake,
    pub channel_id: Option<Snowflake>,
    pub self_mute: bool,
    pub self_deaf: bool,
}

/// Payload for the Request Guild Members opcode (op 8).
#[derive(Debug, Clone, Serialize)]
pub struct RequestGuildMembers {
    pub guild_id: Snowflake,
    /// Username prefix filter; empty string matches all members.
    pub query: String,
    /// Maximum members to return; 0 for all.
    pub limit: u32,
}

// ============================================================================
// Heartbeat (op 1)
// ============================================================================

/// Create a Heartbeat payload.
///
/// The heartbeat data is just the last dispatch sequence number, or null
/// before any dispatch has been received.
pub(crate) fn heartbeat_payload(sequence: Option<u64>) -> String {
    match sequence {
        Some(seq) => format!(r#"{{"op":1,"d":{seq}}}"#),
        None => r#"{"op":1,"d":null}"#.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_payload() {
        let json = r#"{"heartbeat_interval": 41250}"#;
        let payload: Hello = serde_json::from_str(json).unwrap();
        assert_eq!(payload.heartbeat_interval, 41250);
    }

    #[test]
    fn identify_serialization() {
        let identify = Identify::new("test_token", Intents::GUILDS | Intents::GUILD_MESSAGES)
            .with_shard(0, 1);

        let json = GatewayPayload::new(OpCode::Identify, identify)
            .to_json()
            .unwrap();
        assert!(json.contains(r#""op":2"#));
        assert!(json.contains("test_token"));
        assert!(json.contains(r#""shard":[0,1]"#));
        assert!(json.contains(r#""intents":513"#));
    }

    #[test]
    fn resume_serialization() {
        let resume = Resume {
            token: "X".into(),
            session_id: "s1".into(),
            seq: 42,
        };
        let json = GatewayPayload::new(OpCode::Resume, resume).to_json().unwrap();
        assert!(json.contains(r#""op":6"#));
        assert!(json.contains(r#""session_id":"s1""#));
        assert!(json.contains(r#""seq":42"#));
    }

    #[test]
    fn heartbeat_payloads() {
        assert_eq!(heartbeat_payload(Some(42)), r#"{"op":1,"d":42}"#);
        assert_eq!(heartbeat_payload(None), r#"{"op":1,"d":null}"#);
    }

    #[test]
    fn ready_without_resume_url() {
        // v6 gateways do not send resume_gateway_url
        let json = r#"{
            "v": 6,
            "user": {"id": "10", "username": "bot"},
            "guilds": [{"id": "20", "unavailable": true}],
            "session_id": "s1"
        }"#;
        let ready: Ready = serde_json::from_str(json).unwrap();
        assert_eq!(ready.session_id, "s1");
        assert!(ready.resume_gateway_url.is_none());
        assert!(ready.guilds[0].unavailable);
    }
}
