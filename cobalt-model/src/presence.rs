use crate::snowflake::Snowflake;
use crate::user::PartialUser;
use serde::{Deserialize, Serialize};

/// User status, as sent in presence updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    #[default]
    Online,
    Dnd,
    Idle,
    Invisible,
    Offline,
}

/// Activity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ActivityType {
    /// Playing {name}
    Playing,
    /// Streaming {name}
    Streaming,
    /// Listening to {name}
    Listening,
    /// Watching {name}
    Watching,
    /// {emoji} {name}
    Custom,
    /// Competing in {name}
    Competing,
}

impl From<u8> for ActivityType {
    fn from(value: u8) -> Self {
        match value {
            1 => ActivityType::Streaming,
            2 => ActivityType::Listening,
            3 => ActivityType::Watching,
            4 => ActivityType::Custom,
            5 => ActivityType::Competing,
            _ => ActivityType::Playing,
        }
    }
}

impl From<ActivityType> for u8 {
    fn from(value: ActivityType) -> Self {
        match value {
            ActivityType::Playing => 0,
            ActivityType::Streaming => 1,
            ActivityType::Listening => 2,
            ActivityType::Watching => 3,
            ActivityType::Custom => 4,
            ActivityType::Competing => 5,
        }
    }
}

/// An activity shown on a user's presence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Activity name.
    pub name: String,
    /// Activity type.
    #[serde(rename = "type")]
    pub kind: ActivityType,
    /// Stream URL (only for Streaming).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Activity {
    /// Shorthand for a "Playing {name}" activity.
    pub fn playing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ActivityType::Playing,
            url: None,
        }
    }
}

/// Per-platform status breakdown.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientStatus {
    #[serde(default)]
    pub desktop: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
}

/// `PRESENCE_UPDATE`. Emit-only; the cache does not retain presences.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PresenceUpdateEvent {
    pub user: PartialUser,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub status: StatusType,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub client_status: Option<ClientStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_type_round_trip() {
        let act = Activity::playing("chess");
        let json = serde_json::to_string(&act).unwrap();
        assert!(json.contains(r#""type":0"#));

        let back: Activity = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ActivityType::Playing);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&StatusType::Dnd).unwrap(), r#""dnd""#);
    }
}
