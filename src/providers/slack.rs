use async_trait::async_trait;
use log::info;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use super::Notifier;
use crate::error::{ReportError, Result};
use crate::periodics::Block;

/// Posts messages to an incoming webhook.
pub struct SlackWebhook {
    client: Client,
    url: Url,
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    blocks: Option<&'a [Block]>,
}

impl SlackWebhook {
    pub fn new(webhook_url: &str) -> Result<Self> {
        let url = Url::parse(webhook_url)
            .map_err(|e| ReportError::Config(format!("Invalid webhook URL: {e}")))?;

        Ok(Self {
            client: Client::new(),
            url,
        })
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    async fn post_message(&self, text: &str, blocks: Option<&[Block]>) -> Result<()> {
        let payload = WebhookPayload { text, blocks };

        let response = self
            .client
            .post(self.url.clone())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ReportError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        info!("Message delivered ({status}): {body}");
        Ok(())
    }
}
