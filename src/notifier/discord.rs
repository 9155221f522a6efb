use reqwest::multipart::Form;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::Credentials;
use crate::model::SinkError;
use crate::notifier::{chart_part, http_client, send_form, Publisher};
use crate::utils::truncate_chars;

const SINK: &str = "discord";
/// Message content limit of a webhook post.
pub const CONTENT_LIMIT: usize = 2000;

#[derive(Serialize)]
struct WebhookPayload {
    content: String,
}

/// Posts the chart to a channel webhook with the caption as message content.
pub struct DiscordPublisher {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordPublisher {
    pub fn from_credentials(creds: &Credentials, request_timeout: Duration) -> Result<Self, SinkError> {
        let webhook = creds.discord_webhook_url.clone().ok_or(SinkError::MissingCredential {
            sink: SINK,
            variable: "DISCORD_WEBHOOK_URL",
        })?;
        Ok(Self {
            webhook,
            client: http_client(SINK, request_timeout)?,
            timeout: request_timeout,
        })
    }
}

fn payload_json(caption: &str) -> Result<String, SinkError> {
    serde_json::to_string(&WebhookPayload {
        content: truncate_chars(caption, CONTENT_LIMIT),
    })
    .map_err(|e| SinkError::Api {
        sink: SINK,
        detail: e.to_string(),
    })
}

#[async_trait::async_trait]
impl Publisher for DiscordPublisher {
    fn name(&self) -> &'static str {
        SINK
    }

    async fn publish(&self, chart: &Path, caption: &str) -> Result<(), SinkError> {
        let file = chart_part(SINK, chart).await?;
        let form = Form::new()
            .text("payload_json", payload_json(caption)?)
            .part("files[0]", file);

        info!("📤 Posting chart to Discord webhook...");
        send_form(SINK, &self.client, &self.webhook, form, self.timeout).await
    }
}
