//! Webhook endpoints.

use crate::error::HttpError;
use crate::HttpClient;
use cobalt_model::{Snowflake, Webhook};
use serde::Serialize;

/// Parameters for executing a webhook.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecuteWebhook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl HttpClient {
    /// Create a webhook on a channel.
    pub async fn create_webhook(
        &self,
        channel_id: Snowflake,
        name: impl Into<String>,
        reason: Option<&str>,
    ) -> Result<Webhook, HttpError> {
        #[derive(Serialize)]
        struct CreateWebhook {
            name: String,
        }

        let route = format!("/channels/{channel_id}/webhooks");
        self.post_with_reason(&route, &CreateWebhook { name: name.into() }, reason)
            .await
    }

    /// List a channel's webhooks.
    pub async fn get_channel_webhooks(
        &self,
        channel_id: Snowflake,
    ) -> Result<Vec<Webhook>, HttpError> {
        let route = format!("/channels/{channel_id}/webhooks");
        self.get(&route).await
    }

    /// Get a webhook by ID.
    pub async fn get_webhook(&self, webhook_id: Snowflake) -> Result<Webhook, HttpError> {
        let route = format!("/webhooks/{webhook_id}");
        self.get(&route).await
    }

    /// Delete a webhook.
    pub async fn delete_webhook(
        &self,
        webhook_id: Snowflake,
        reason: Option<&str>,
    ) -> Result<(), HttpError> {
        let route = format!("/webhooks/{webhook_id}");
        self.delete(&route, reason).await
    }

    /// Execute a webhook with its token. No bot authorization is required
    /// by the API, but the shared client still sends it; the server
    /// ignores it on this route.
    pub async fn execute_webhook(
        &self,
        webhook_id: Snowflake,
        token: &str,
        params: &ExecuteWebhook,
    ) -> Result<(), HttpError> {
        let route = format!("/webhooks/{webhook_id}/{token}");
        self.post(&route, params).await
    }
}
