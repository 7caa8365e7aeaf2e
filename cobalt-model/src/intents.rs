//! Discord Gateway Intents
//!
//! Intents are a bitfield that controls which events the gateway sends.
//! Some intents are "privileged" and require approval in the Discord
//! Developer Portal. API v10 requires the bitmask at identify time; under
//! the legacy v6 mode the same mask is sent and simply ignored by older
//! gateway builds.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Gateway Intents control which events Discord sends to your bot.
    ///
    /// See: <https://discord.com/developers/docs/topics/gateway#gateway-intents>
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        /// Guild creation, update, delete, role and channel changes.
        const GUILDS = 1 << 0;

        /// Member joins, updates, removes.
        /// **PRIVILEGED INTENT** - Requires verification for 100+ servers.
        const GUILD_MEMBERS = 1 << 1;

        /// Guild bans.
        const GUILD_MODERATION = 1 << 2;

        /// Emoji and sticker updates.
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;

        /// Integration updates.
        const GUILD_INTEGRATIONS = 1 << 4;

        /// Webhook updates.
        const GUILD_WEBHOOKS = 1 << 5;

        /// Invite creation/deletion.
        const GUILD_INVITES = 1 << 6;

        /// Voice state updates.
        const GUILD_VOICE_STATES = 1 << 7;

        /// User presence updates.
        /// **PRIVILEGED INTENT** - Requires verification for 100+ servers.
        const GUILD_PRESENCES = 1 << 8;

        /// Messages in guilds (not content without MESSAGE_CONTENT).
        const GUILD_MESSAGES = 1 << 9;

        /// Message reactions in guilds.
        const GUILD_MESSAGE_REACTIONS = 1 << 10;

        /// Typing indicators in guilds.
        const GUILD_MESSAGE_TYPING = 1 << 11;

        /// Direct messages.
        const DIRECT_MESSAGES = 1 << 12;

        /// DM reactions.
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;

        /// DM typing indicators.
        const DIRECT_MESSAGE_TYPING = 1 << 14;

        /// Message content in MESSAGE_CREATE events.
        /// **PRIVILEGED INTENT** - Requires verification for 100+ servers.
        const MESSAGE_CONTENT = 1 << 15;

        // ===== Convenience Combinations =====

        /// All non-privileged intents.
        const NON_PRIVILEGED = Self::GUILDS.bits()
            | Self::GUILD_MODERATION.bits()
            | Self::GUILD_EMOJIS_AND_STICKERS.bits()
            | Self::GUILD_INTEGRATIONS.bits()
            | Self::GUILD_WEBHOOKS.bits()
            | Self::GUILD_INVITES.bits()
            | Self::GUILD_VOICE_STATES.bits()
            | Self::GUILD_MESSAGES.bits()
            | Self::GUILD_MESSAGE_REACTIONS.bits()
            | Self::GUILD_MESSAGE_TYPING.bits()
            | Self::DIRECT_MESSAGES.bits()
            | Self::DIRECT_MESSAGE_REACTIONS.bits()
            | Self::DIRECT_MESSAGE_TYPING.bits();

        /// All privileged intents (require approval).
        const PRIVILEGED = Self::GUILD_MEMBERS.bits()
            | Self::GUILD_PRESENCES.bits()
            | Self::MESSAGE_CONTENT.bits();

        /// All intents (requires all privileged intents approved).
        const ALL = Self::NON_PRIVILEGED.bits() | Self::PRIVILEGED.bits();
    }
}

impl Default for Intents {
    fn default() -> Self {
        Self::NON_PRIVILEGED
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Intents::from_bits_truncate(bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_flags() {
        let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
        assert!(intents.contains(Intents::GUILDS));
        assert!(intents.contains(Intents::GUILD_MESSAGES));
        assert!(!intents.contains(Intents::GUILD_MEMBERS));
    }

    #[test]
    fn intent_serialization() {
        let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
        assert_eq!(serde_json::to_string(&intents).unwrap(), "513");

        let back: Intents = serde_json::from_str("513").unwrap();
        assert_eq!(back, intents);
    }
}
