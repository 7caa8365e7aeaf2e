use crate::channel::Channel;
use crate::guild::Guild;
use serde::{Deserialize, Serialize};

/// A guild invite.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Invite {
    /// Invite code (the unique URL suffix).
    pub code: String,
    /// Partial guild the invite points into.
    #[serde(default)]
    pub guild: Option<Guild>,
    /// Partial channel the invite points at.
    #[serde(default)]
    pub channel: Option<Channel>,
    /// Times this invite has been used.
    #[serde(default)]
    pub uses: Option<u32>,
    /// Maximum number of uses; 0 for unlimited.
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// Seconds until expiry; 0 for never.
    #[serde(default)]
    pub max_age: Option<u32>,
    /// Whether the invite grants temporary membership.
    #[serde(default)]
    pub temporary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invite() {
        let invite: Invite = serde_json::from_str(r#"{"code":"abc123"}"#).unwrap();
        assert_eq!(invite.code, "abc123");
        assert!(invite.guild.is_none());
    }
}
