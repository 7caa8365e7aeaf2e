//! Route bucket keys and gateway discovery responses.
//!
//! Discord scopes rate limits to `(method, route)` pairs where the "route"
//! keeps its major parameters (the ID directly following `channels`,
//! `guilds`, or `webhooks`) literal and masks every other ID. Two requests
//! that share a bucket key share a quota window.

use reqwest::Method;
use serde::Deserialize;

/// Derive the rate-limit bucket key for a request.
///
/// Any query string is ignored; minor snowflake segments collapse to
/// `{id}`. The method is part of the key, which also gives message
/// deletion its own bucket as the API requires.
pub fn bucket_key(method: &Method, route: &str) -> String {
    let path = route.split('?').next().unwrap_or(route);

    let mut key = String::with_capacity(path.len() + 8);
    key.push_str(method.as_str());
    key.push(' ');

    let mut keep_next_id = false;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        key.push('/');

        let is_id = !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit());
        if is_id && !keep_next_id {
            key.push_str("{id}");
        } else {
            key.push_str(segment);
        }

        keep_next_id = matches!(segment, "channels" | "guilds" | "webhooks");
    }

    key
}

/// Response from GET /gateway/bot.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayBot {
    /// Gateway WebSocket URL.
    pub url: String,

    /// Recommended number of shards.
    pub shards: u16,

    /// Session start limit information (absent on very old API versions).
    #[serde(default)]
    pub session_start_limit: Option<SessionStartLimit>,
}

impl GatewayBot {
    /// Maximum concurrent identifies, defaulting to 1.
    pub fn max_concurrency(&self) -> usize {
        self.session_start_limit
            .as_ref()
            .map(|l| l.max_concurrency as usize)
            .unwrap_or(1)
    }
}

/// Session start limit from /gateway/bot.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStartLimit {
    /// Total number of session starts allowed.
    pub total: u32,

    /// Remaining session starts.
    pub remaining: u32,

    /// Milliseconds until the limit resets.
    pub reset_after: u64,

    /// Maximum number of concurrent identify operations.
    #[serde(default = "default_concurrency")]
    pub max_concurrency: u32,
}

fn default_concurrency() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_parameters_stay_literal() {
        assert_eq!(
            bucket_key(&Method::GET, "/channels/123/messages"),
            "GET /channels/123/messages"
        );
        assert_eq!(
            bucket_key(&Method::GET, "/guilds/42/members"),
            "GET /guilds/42/members"
        );
    }

    #[test]
    fn minor_parameters_are_masked() {
        assert_eq!(
            bucket_key(&Method::GET, "/channels/123/messages/456"),
            "GET /channels/123/messages/{id}"
        );
        assert_eq!(
            bucket_key(&Method::DELETE, "/guilds/42/members/7/roles/9"),
            "DELETE /guilds/42/members/{id}/roles/{id}"
        );
    }

    #[test]
    fn method_distinguishes_buckets() {
        let del = bucket_key(&Method::DELETE, "/channels/123/messages/456");
        let get = bucket_key(&Method::GET, "/channels/123/messages/456");
        assert_ne!(del, get);
    }

    #[test]
    fn query_strings_do_not_split_buckets() {
        assert_eq!(
            bucket_key(&Method::GET, "/channels/123/messages?limit=50"),
            bucket_key(&Method::GET, "/channels/123/messages?limit=100"),
        );
    }

    #[test]
    fn distinct_major_ids_get_distinct_buckets() {
        assert_ne!(
            bucket_key(&Method::PATCH, "/channels/123"),
            bucket_key(&Method::PATCH, "/channels/124"),
        );
    }

    #[test]
    fn gateway_bot_concurrency_defaults() {
        let parsed: GatewayBot =
            serde_json::from_str(r#"{"url":"wss://gateway.discord.gg","shards":2}"#).unwrap();
        assert_eq!(parsed.max_concurrency(), 1);

        let with_limit: GatewayBot = serde_json::from_str(
            r#"{"url":"wss://gateway.discord.gg","shards":2,"session_start_limit":{"total":1000,"remaining":999,"reset_after":1000,"max_concurrency":16}}"#,
        )
        .unwrap();
        assert_eq!(with_limit.max_concurrency(), 16);
    }
}
