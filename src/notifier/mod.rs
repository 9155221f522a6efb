// Publishers: push the chart and caption to a channel.

pub mod discord;
pub mod telegram;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::{Credentials, PublishConfig};
use crate::model::SinkError;

pub use discord::DiscordPublisher;
pub use telegram::TelegramPublisher;

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn publish(&self, chart: &Path, caption: &str) -> Result<(), SinkError>;
}

/// Enabled publishers whose credentials are present. The rest are skipped with a warning.
pub fn build_publishers(
    publish: &PublishConfig,
    creds: &Credentials,
    request_timeout: Duration,
) -> Vec<Arc<dyn Publisher>> {
    let mut out: Vec<Arc<dyn Publisher>> = Vec::new();
    if publish.telegram {
        match TelegramPublisher::from_credentials(creds, request_timeout) {
            Ok(p) => out.push(Arc::new(p)),
            Err(e) => warn!("⚠️ Telegram publishing skipped: {}", e),
        }
    }
    if publish.discord {
        match DiscordPublisher::from_credentials(creds, request_timeout) {
            Ok(p) => out.push(Arc::new(p)),
            Err(e) => warn!("⚠️ Discord publishing skipped: {}", e),
        }
    }
    out
}

pub(crate) fn http_client(sink: &'static str, request_timeout: Duration) -> Result<Client, SinkError> {
    Client::builder()
        .timeout(request_timeout)
        .build()
        .map_err(|e| SinkError::Api {
            sink,
            detail: format!("client setup failed: {}", e),
        })
}

/// Reads the chart into an upload part.
pub(crate) async fn chart_part(sink: &'static str, chart: &Path) -> Result<Part, SinkError> {
    let bytes = tokio::fs::read(chart)
        .await
        .map_err(|source| SinkError::Io { sink, source })?;
    let file_name = chart
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trend_chart.svg".to_string());
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/svg+xml")
        .map_err(|e| SinkError::Api {
            sink,
            detail: e.to_string(),
        })
}

/// Posts a multipart form, bounded by `limit`.
pub(crate) async fn send_form(
    sink: &'static str,
    client: &Client,
    url: &str,
    form: Form,
    limit: Duration,
) -> Result<(), SinkError> {
    let response = match timeout(limit, client.post(url).multipart(form).send()).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(e)) => {
            warn!("❌ {} send() failed: {:?}", sink, e);
            return Err(SinkError::Api {
                sink,
                detail: format!("send failed: {}", e),
            });
        }
        Err(_) => {
            warn!("⏳ {} send() timed out", sink);
            return Err(SinkError::Unreachable { sink });
        }
    };
    let status = response.status();
    let body = response.text().await.unwrap_or_else(|_| "unknown".into());
    if !status.is_success() {
        warn!("❌ {} API responded [{}]: {}", sink, status, body);
        return Err(SinkError::Api {
            sink,
            detail: format!("status {}", status.as_u16()),
        });
    }
    info!("✅ {} response [{}]", sink, status);
    Ok(())
}
