use crate::model::FetchError;
use serde::de::DeserializeOwned;

#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    Get,
    PostJson(serde_json::Value),
}

/// One outbound call, described independently of the HTTP client.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub user_agent: Option<&'static str>,
    pub bearer: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            user_agent: None,
            bearer: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::PostJson(body),
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn user_agent(mut self, agent: &'static str) -> Self {
        self.user_agent = Some(agent);
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    #[cfg(test)]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Returns the body of a 2xx response; any other status is an error.
#[async_trait::async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, req: &HttpRequest) -> Result<String, FetchError>;
}

pub async fn fetch_json<T: DeserializeOwned>(
    fetcher: &dyn HttpFetch,
    req: &HttpRequest,
) -> Result<T, FetchError> {
    let body = fetcher.fetch(req).await?;
    serde_json::from_str(&body).map_err(|e| FetchError::Payload(e.to_string()))
}
