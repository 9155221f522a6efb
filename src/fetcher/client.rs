use crate::fetcher::traits::{HttpFetch, HttpRequest, Method};
use crate::model::FetchError;

use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const DEFAULT_AGENT: &str = "TrendCaptionBot/0.1";

pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(DEFAULT_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, req: &HttpRequest) -> Result<String, FetchError> {
        let mut builder = match &req.method {
            Method::Get => self.client.get(&req.url),
            Method::PostJson(body) => self.client.post(&req.url).json(body),
        };
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }
        if let Some(agent) = req.user_agent {
            builder = builder.header(reqwest::header::USER_AGENT, agent);
        }
        if let Some(token) = &req.bearer {
            builder = builder.bearer_auth(token);
        }

        debug!("➡️ {}", req.url);
        let response = builder.send().await.map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(map_transport)
    }
}

fn map_transport(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e.to_string())
    }
}
