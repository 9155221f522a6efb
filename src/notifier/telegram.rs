use reqwest::multipart::Form;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::Credentials;
use crate::model::SinkError;
use crate::notifier::{chart_part, http_client, send_form, Publisher};
use crate::utils::truncate_utf16;

const SINK: &str = "telegram";
/// Caption limit for media messages, in UTF-16 code units.
pub const CAPTION_LIMIT: usize = 1024;

/// Sends the chart as a document with the caption attached.
pub struct TelegramPublisher {
    bot_token: String,
    chat_id: String,
    client: Client,
    timeout: Duration,
}

impl TelegramPublisher {
    pub fn from_credentials(creds: &Credentials, request_timeout: Duration) -> Result<Self, SinkError> {
        let bot_token = creds.telegram_bot_token.clone().ok_or(SinkError::MissingCredential {
            sink: SINK,
            variable: "TELEGRAM_BOT_TOKEN",
        })?;
        let chat_id = creds.telegram_chat_id.clone().ok_or(SinkError::MissingCredential {
            sink: SINK,
            variable: "TELEGRAM_CHAT_ID",
        })?;
        Ok(Self {
            bot_token,
            chat_id,
            client: http_client(SINK, request_timeout)?,
            timeout: request_timeout,
        })
    }

    fn url(&self) -> String {
        format!("https://api.telegram.org/bot{}/sendDocument", self.bot_token)
    }
}

#[async_trait::async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &'static str {
        SINK
    }

    async fn publish(&self, chart: &Path, caption: &str) -> Result<(), SinkError> {
        let document = chart_part(SINK, chart).await?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption_field(caption))
            .part("document", document);

        info!("📤 Sending chart to Telegram chat {}...", self.chat_id);
        send_form(SINK, &self.client, &self.url(), form, self.timeout).await
    }
}

fn caption_field(caption: &str) -> String {
    truncate_utf16(caption, CAPTION_LIMIT)
}
