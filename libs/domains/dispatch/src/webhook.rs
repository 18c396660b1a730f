use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::DispatchResult;

/// Outbound delivery call. Abstracted so the delivery/retry services are
/// testable without a live HTTP endpoint. Takes an already-encoded JSON
/// body: encoding failures are deterministic and handled by the caller
/// before a webhook call is ever attempted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WebhookClient: Send + Sync {
    /// Returns the provider-assigned `messageId` on success.
    async fn send(&self, body: &str) -> DispatchResult<String>;
}

#[derive(Clone)]
pub struct ReqwestWebhookClient {
    client: Client,
    url: String,
}

impl ReqwestWebhookClient {
    pub fn new(url: String, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl WebhookClient for ReqwestWebhookClient {
    async fn send(&self, body: &str) -> DispatchResult<String> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await?
            .error_for_status()?
            .json::<crate::models::WebhookResponse>()
            .await?;
        Ok(response.message_id)
    }
}
