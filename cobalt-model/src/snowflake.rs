//! Snowflake ID type for Discord
//!
//! Discord uses 64-bit unsigned integers for unique identifiers,
//! but serializes them as strings in JSON to avoid precision loss.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01T00:00:00Z).
pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// A Discord Snowflake ID.
///
/// Snowflakes are unique 64-bit unsigned integers. The top 42 bits carry a
/// millisecond timestamp relative to the Discord epoch, which makes them
/// usable for sharding (`id >> 22` modulo shard count) and for age checks
/// such as the bulk-delete 14-day horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Create a new Snowflake from a u64 value.
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Extract the timestamp as milliseconds since the Unix epoch.
    #[inline]
    pub const fn timestamp(self) -> u64 {
        (self.0 >> 22) + DISCORD_EPOCH_MS
    }

    /// The moment this ID was generated.
    pub fn created_at(self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.timestamp())
    }

    /// How long ago this ID was generated.
    ///
    /// Returns a zero duration for IDs from the future (clock skew).
    pub fn age(self) -> Duration {
        SystemTime::now()
            .duration_since(self.created_at())
            .unwrap_or_default()
    }

    /// Extract the internal worker ID.
    #[inline]
    pub const fn worker_id(self) -> u8 {
        ((self.0 & 0x3E0000) >> 17) as u8
    }

    /// Extract the increment (sequence number within the same millisecond).
    #[inline]
    pub const fn increment(self) -> u16 {
        (self.0 & 0xFFF) as u16
    }
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Snowflake {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<Snowflake> for u64 {
    #[inline]
    fn from(snowflake: Snowflake) -> Self {
        snowflake.0
    }
}

impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Always serialize as string to match Discord's format
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Discord sends snowflakes as strings, but we also handle integers
        struct SnowflakeVisitor;

        impl serde::de::Visitor<'_> for SnowflakeVisitor {
            type Value = Snowflake;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer snowflake ID")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Snowflake(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Snowflake(value as u64))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value
                    .parse::<u64>()
                    .map(Snowflake)
                    .map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_any(SnowflakeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflake_parsing() {
        let json_str = r#""175928847299117063""#;
        let snowflake: Snowflake = serde_json::from_str(json_str).unwrap();
        assert_eq!(snowflake.get(), 175928847299117063);

        let from_int: Snowflake = serde_json::from_str("175928847299117063").unwrap();
        assert_eq!(from_int, snowflake);
    }

    #[test]
    fn snowflake_serialization() {
        let snowflake = Snowflake::new(175928847299117063);
        let json = serde_json::to_string(&snowflake).unwrap();
        assert_eq!(json, r#""175928847299117063""#);
    }

    #[test]
    fn snowflake_timestamp() {
        // Known snowflake generated after the Discord epoch
        let snowflake = Snowflake::new(175928847299117063);
        assert!(snowflake.timestamp() > DISCORD_EPOCH_MS);
        assert!(snowflake.created_at() > UNIX_EPOCH);
    }

    #[test]
    fn snowflake_age() {
        // An ID stamped "now" has a near-zero age; one from 20 days ago does not
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let fresh = Snowflake::new((now_ms - DISCORD_EPOCH_MS) << 22);
        assert!(fresh.age() < Duration::from_secs(60));

        let twenty_days = 20 * 24 * 60 * 60 * 1000;
        let old = Snowflake::new((now_ms - DISCORD_EPOCH_MS - twenty_days) << 22);
        assert!(old.age() > Duration::from_secs(14 * 24 * 60 * 60));
    }
}
