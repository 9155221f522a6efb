// News enrichment: a short narrative on why a topic is moving. Best-effort.

use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::fetcher::{fetch_json, HttpFetch, HttpRequest};
use crate::model::TopicDescriptor;

const GNEWS_URL: &str = "https://gnews.io/api/v4/search";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const GROQ_MODEL: &str = "llama-3.1-8b-instant";
const MAX_ARTICLES: usize = 3;

/// Why no narrative was produced. Never fatal for a run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnrichmentUnavailable {
    #[error("dry run")]
    DryRun,
    #[error("missing credential {0}")]
    MissingCredential(&'static str),
    #[error("source is not enriched")]
    NotApplicable,
    #[error("no recent articles")]
    NoArticles,
    #[error("request failed: {0}")]
    Request(String),
    #[error("empty answer")]
    EmptyAnswer,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Enrichment {
    Narrative(String),
    Unavailable(EnrichmentUnavailable),
}

impl Enrichment {
    pub fn narrative(&self) -> Option<&str> {
        match self {
            Enrichment::Narrative(text) => Some(text),
            Enrichment::Unavailable(_) => None,
        }
    }
}

impl fmt::Display for Enrichment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Enrichment::Narrative(text) => f.write_str(text),
            Enrichment::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    /// `query` is the search phrase, usually the topic's display name.
    async fn enrich(&self, topic: &TopicDescriptor, query: &str, language: &str) -> Enrichment;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

/// Searches recent headlines and asks a language model to summarize them.
pub struct NewsEnricher {
    fetcher: Arc<dyn HttpFetch>,
    gnews_key: Option<String>,
    groq_key: Option<String>,
    dry_run: bool,
}

impl NewsEnricher {
    pub fn new(
        fetcher: Arc<dyn HttpFetch>,
        gnews_key: Option<String>,
        groq_key: Option<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            fetcher,
            gnews_key,
            groq_key,
            dry_run,
        }
    }

    async fn headlines(
        &self,
        key: &str,
        query: &str,
        language: &str,
    ) -> Result<Vec<Article>, EnrichmentUnavailable> {
        let req = HttpRequest::get(GNEWS_URL)
            .query("q", query)
            .query("lang", language)
            .query("max", MAX_ARTICLES)
            .query("apikey", key);
        let body: SearchResponse = fetch_json(self.fetcher.as_ref(), &req)
            .await
            .map_err(|e| EnrichmentUnavailable::Request(e.to_string()))?;
        if body.articles.is_empty() {
            return Err(EnrichmentUnavailable::NoArticles);
        }
        Ok(body.articles)
    }

    async fn summarize(&self, key: &str, prompt: String) -> Result<String, EnrichmentUnavailable> {
        let payload = json!({
            "model": GROQ_MODEL,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0.7,
            "max_tokens": 150,
        });
        let req = HttpRequest::post_json(GROQ_URL, payload).bearer(key);
        let body: ChatResponse = fetch_json(self.fetcher.as_ref(), &req)
            .await
            .map_err(|e| EnrichmentUnavailable::Request(e.to_string()))?;

        let answer = body
            .choices
            .into_iter()
            .next()
            .map(|c| strip_quotes(&c.message.content))
            .unwrap_or_default();
        if answer.is_empty() {
            return Err(EnrichmentUnavailable::EmptyAnswer);
        }
        Ok(answer)
    }
}

#[async_trait::async_trait]
impl Enricher for NewsEnricher {
    async fn enrich(&self, topic: &TopicDescriptor, query: &str, language: &str) -> Enrichment {
        if self.dry_run {
            return Enrichment::Unavailable(EnrichmentUnavailable::DryRun);
        }
        let Some(gnews_key) = self.gnews_key.as_deref() else {
            warn!("⚠️ GNEWS_API_KEY missing, skipping news enrichment");
            return Enrichment::Unavailable(EnrichmentUnavailable::MissingCredential("GNEWS_API_KEY"));
        };
        let Some(groq_key) = self.groq_key.as_deref() else {
            warn!("⚠️ GROQ_API_KEY missing, skipping news enrichment");
            return Enrichment::Unavailable(EnrichmentUnavailable::MissingCredential("GROQ_API_KEY"));
        };

        info!("📰 Looking up news for '{}'...", query);
        let result = match self.headlines(gnews_key, query, language).await {
            Ok(articles) => {
                info!("🧠 Summarizing {} headlines...", articles.len());
                self.summarize(groq_key, build_prompt(&topic.display_name, &articles))
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                info!("✅ News narrative: {}", text);
                Enrichment::Narrative(text)
            }
            Err(reason) => {
                warn!("⚠️ News enrichment unavailable: {}", reason);
                Enrichment::Unavailable(reason)
            }
        }
    }
}

fn build_prompt(topic: &str, articles: &[Article]) -> String {
    let headlines: String = articles
        .iter()
        .take(MAX_ARTICLES)
        .enumerate()
        .map(|(i, a)| match a.description.as_deref() {
            Some(desc) if !desc.trim().is_empty() => format!("{}. {} - {}\n", i + 1, a.title, desc),
            _ => format!("{}. {}\n", i + 1, a.title),
        })
        .collect();
    format!(
        "You write social media posts. The topic '{}' is trending right now. \
         These are the latest headlines about it:\n\n{}\n\
         Based on these headlines, explain in at most two short sentences WHY the topic is trending. \
         Make it fit directly into a post, one emoji is fine. \
         Reply ONLY with the sentences, no introduction and no sign-off.",
        topic, headlines
    )
}

fn strip_quotes(answer: &str) -> String {
    let trimmed = answer.trim();
    trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}
