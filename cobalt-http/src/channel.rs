//! Channel and message endpoints.

use crate::client::FileUpload;
use crate::error::HttpError;
use crate::HttpClient;
use cobalt_model::{Channel, Embed, Invite, Message, Snowflake};
use serde::Serialize;
use std::time::Duration;

/// Messages older than this cannot be bulk deleted.
const BULK_DELETE_MAX_AGE: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Most ids a single bulk-delete call accepts.
const BULK_DELETE_MAX_IDS: usize = 100;

/// Parameters for creating a message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateMessage {
    /// Text content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether to read the message aloud.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts: Option<bool>,
    /// Rich embeds.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl CreateMessage {
    /// A plain text message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Parameters for editing a channel. Unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EditChannel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nsfw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_per_user: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_limit: Option<u32>,
}

impl HttpClient {
    // =========================================================================
    // Channel operations
    // =========================================================================

    /// Get a channel.
    pub async fn get_channel(&self, channel_id: Snowflake) -> Result<Channel, HttpError> {
        let route = format!("/channels/{channel_id}");
        self.get(&route).await
    }

    /// Edit a channel.
    pub async fn edit_channel(
        &self,
        channel_id: Snowflake,
        params: &EditChannel,
        reason: Option<&str>,
    ) -> Result<Channel, HttpError> {
        let route = format!("/channels/{channel_id}");
        self.patch_with_reason(&route, params, reason).await
    }

    /// Delete a channel, or close a DM.
    pub async fn delete_channel(
        &self,
        channel_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<Channel, HttpError> {
        let route = format!("/channels/{channel_id}");
        self.delete(&route, reason).await
    }

    /// Create an invite for a channel.
    pub async fn create_invite(
        &self,
        channel_id: Snowflake,
        max_age: Option<u32>,
        max_uses: Option<u32>,
        reason: Option<&str>,
    ) -> Result<Invite, HttpError> {
        #[derive(Serialize)]
        struct CreateInvite {
            #[serde(skip_serializing_if = "Option::is_none")]
            max_age: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            max_uses: Option<u32>,
        }

        let route = format!("/channels/{channel_id}/invites");
        self.post_with_reason(&route, &CreateInvite { max_age, max_uses }, reason)
            .await
    }

    // =========================================================================
    // Message operations
    // =========================================================================

    /// Get a single message.
    pub async fn get_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<Message, HttpError> {
        let route = format!("/channels/{channel_id}/messages/{message_id}");
        self.get(&route).await
    }

    /// Get recent messages in a channel, newest first.
    pub async fn get_messages(
        &self,
        channel_id: Snowflake,
        limit: u8,
    ) -> Result<Vec<Message>, HttpError> {
        let route = format!("/channels/{channel_id}/messages?limit={limit}");
        self.get(&route).await
    }

    /// Create a message.
    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        params: &CreateMessage,
    ) -> Result<Message, HttpError> {
        let route = format!("/channels/{channel_id}/messages");
        self.post(&route, params).await
    }

    /// Create a message with file attachments (multipart upload).
    pub async fn create_message_with_files(
        &self,
        channel_id: Snowflake,
        params: &CreateMessage,
        files: Vec<FileUpload>,
    ) -> Result<Message, HttpError> {
        let route = format!("/channels/{channel_id}/messages");
        self.post_with_files(&route, params, files).await
    }

    /// Send a simple text message.
    pub async fn send_message(
        &self,
        channel_id: Snowflake,
        content: impl Into<String>,
    ) -> Result<Message, HttpError> {
        self.create_message(channel_id, &CreateMessage::text(content))
            .await
    }

    /// Edit a message.
    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        content: impl Into<String>,
    ) -> Result<Message, HttpError> {
        #[derive(Serialize)]
        struct EditMessage {
            content: String,
        }

        let route = format!("/channels/{channel_id}/messages/{message_id}");
        self.patch(
            &route,
            &EditMessage {
                content: content.into(),
            },
        )
        .await
    }

    /// Delete a message.
    pub async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/channels/{channel_id}/messages/{message_id}");
        self.delete(&route, reason).await
    }

    /// Delete multiple messages in one call.
    ///
    /// The whole batch is validated against the 14-day snowflake horizon
    /// before anything is sent; a single too-old ID fails the call without
    /// touching the network.
    pub async fn bulk_delete_messages(
        &self,
        channel_id: Snowflake,
        message_ids: &[Snowflake],
    ) -> Result<(), HttpError> {
        if message_ids.len() > BULK_DELETE_MAX_IDS {
            return Err(HttpError::Client(format!(
                "bulk delete accepts at most {BULK_DELETE_MAX_IDS} ids, got {}",
                message_ids.len()
            )));
        }

        for id in message_ids {
            if id.age() > BULK_DELETE_MAX_AGE {
                return Err(HttpError::MessageTooOld { id: *id });
            }
        }

        #[derive(Serialize)]
        struct BulkDelete<'a> {
            messages: &'a [Snowflake],
        }

        let route = format!("/channels/{channel_id}/messages/bulk-delete");
        self.post(
            &route,
            &BulkDelete {
                messages: message_ids,
            },
        )
        .await
    }

    // =========================================================================
    // Pins
    // =========================================================================

    /// Get pinned messages in a channel.
    pub async fn get_pinned_messages(
        &self,
        channel_id: Snowflake,
    ) -> Result<Vec<Message>, HttpError> {
        let route = format!("/channels/{channel_id}/pins");
        self.get(&route).await
    }

    /// Pin a message.
    pub async fn pin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), HttpError> {
        let route = format!("/channels/{channel_id}/pins/{message_id}");
        self.put(&route, None).await
    }

    /// Unpin a message.
    pub async fn unpin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> Result<(), HttpError> {
        let route = format!("/channels/{channel_id}/pins/{message_id}");
        self.delete(&route, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cobalt_model::snowflake::DISCORD_EPOCH_MS;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn snowflake_from_age(age: Duration) -> Snowflake {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        Snowflake::new((now_ms - DISCORD_EPOCH_MS - age.as_millis() as u64) << 22)
    }

    #[tokio::test]
    async fn bulk_delete_rejects_old_ids_before_any_io() {
        let client = HttpClient::new("test_token").unwrap();

        let fresh = snowflake_from_age(Duration::from_secs(60));
        let stale = snowflake_from_age(Duration::from_secs(20 * 24 * 60 * 60));

        let err = client
            .bulk_delete_messages(Snowflake::new(123), &[fresh, stale])
            .await
            .unwrap_err();

        match err {
            HttpError::MessageTooOld { id } => assert_eq!(id, stale),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn bulk_delete_rejects_oversized_batches() {
        let client = HttpClient::new("test_token").unwrap();
        let ids = vec![snowflake_from_age(Duration::from_secs(1)); 101];

        let err = client
            .bulk_delete_messages(Snowflake::new(123), &ids)
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Client(_)));
    }

    #[test]
    fn create_message_skips_empty_fields() {
        let json = serde_json::to_string(&CreateMessage::text("hi")).unwrap();
        assert_eq!(json, r#"{"content":"hi"}"#);
    }
}
