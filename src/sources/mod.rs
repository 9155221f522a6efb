// Source adapters: one per upstream API, all producing a CanonicalSeries.

pub mod coingecko;
pub mod fred;
pub mod frankfurter;
pub mod nasa;
pub mod open_meteo;
pub mod wikipedia;

use crate::analyzer::ChangeKind;
use crate::config::{AppConfig, Credentials, PacingConfig, SourceKind};
use crate::fetcher::{fetch_json, HttpFetch, HttpRequest, RetryPolicy};
use crate::model::{CanonicalSeries, NoDataError, TopicDescriptor};

use chrono::{Days, NaiveDate};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::sleep;

pub use coingecko::CoinGeckoSource;
pub use fred::FredSource;
pub use frankfurter::FrankfurterSource;
pub use nasa::NasaNeoSource;
pub use open_meteo::OpenMeteoSource;
pub use wikipedia::WikipediaSource;

/// Drives the caption opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCategory {
    Trend,
    Market,
    Environmental,
    Celestial,
}

impl SourceCategory {
    pub fn opener(self) -> &'static str {
        match self {
            SourceCategory::Trend => "🔍 Today's trend check!",
            SourceCategory::Market => "💹 Market pulse!",
            SourceCategory::Environmental => "🌦️ Weather watch!",
            SourceCategory::Celestial => "☄️ Asteroid watch!",
        }
    }
}

/// Requested span: `days` days up to and including `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub end: NaiveDate,
    pub days: u32,
}

impl FetchWindow {
    pub fn new(end: NaiveDate, days: u32) -> Self {
        Self { end, days }
    }

    pub fn start(&self) -> NaiveDate {
        self.end - Days::new(u64::from(self.days))
    }
}

#[async_trait::async_trait]
pub trait Source: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Name used in chart titles and log lines.
    fn name(&self) -> &'static str;

    fn category(&self) -> SourceCategory;

    fn change_kind(&self) -> ChangeKind {
        ChangeKind::Relative
    }

    fn caption_opener(&self) -> &'static str {
        self.category().opener()
    }

    /// Fixed hashtag appended after the topic tags, with `#`.
    fn hashtag_suffix(&self) -> &'static str;

    fn y_axis_label(&self) -> &'static str;

    /// Decimals shown for values in captions.
    fn value_decimals(&self) -> usize {
        2
    }

    fn unit(&self) -> Option<&'static str> {
        None
    }

    /// Query for news enrichment, `None` when the source is not enriched.
    fn enrichment_query(&self, topic: &TopicDescriptor) -> Option<String>;

    /// Topic of this run; static for every source but the ranked one.
    async fn resolve_topic(&self, today: NaiveDate) -> Result<TopicDescriptor, NoDataError>;

    async fn fetch(
        &self,
        topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError>;
}

/// Shared plumbing for adapters: the HTTP seam, pacing and retry policy.
#[derive(Clone)]
pub struct AdapterContext {
    pub fetcher: Arc<dyn HttpFetch>,
    pub pacing: PacingConfig,
    pub retry: RetryPolicy,
}

impl AdapterContext {
    pub fn new(fetcher: Arc<dyn HttpFetch>, pacing: PacingConfig, retry: RetryPolicy) -> Self {
        Self {
            fetcher,
            pacing,
            retry,
        }
    }

    /// Historical pull: waits the series delay, then retries transient failures.
    pub async fn pull_series<T>(&self, source_name: &str, req: &HttpRequest) -> Result<T, NoDataError>
    where
        T: DeserializeOwned + Send,
    {
        sleep(self.pacing.series_delay()).await;
        self.retry
            .run(source_name, || fetch_json::<T>(self.fetcher.as_ref(), req))
            .await
            .map_err(|e| NoDataError::from_fetch(source_name, e))
    }

    /// Lightweight lookup: shorter delay, single attempt.
    pub async fn pull_light<T>(&self, source_name: &str, req: &HttpRequest) -> Result<T, NoDataError>
    where
        T: DeserializeOwned + Send,
    {
        sleep(self.pacing.light_delay()).await;
        fetch_json::<T>(self.fetcher.as_ref(), req)
            .await
            .map_err(|e| NoDataError::from_fetch(source_name, e))
    }
}

pub fn build_series(
    source_name: &str,
    label: &str,
    points: Vec<(NaiveDate, f64)>,
) -> Result<CanonicalSeries, NoDataError> {
    CanonicalSeries::from_points(label, points).map_err(|_| NoDataError::empty(source_name))
}

/// Configuration-driven lookup of the adapters of one run.
pub struct SourceRegistry {
    sources: HashMap<SourceKind, Arc<dyn Source>>,
}

impl SourceRegistry {
    pub fn empty() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    pub fn from_config(config: &AppConfig, creds: &Credentials, fetcher: Arc<dyn HttpFetch>) -> Self {
        let ctx = AdapterContext::new(fetcher, config.pacing.clone(), config.retry.policy());
        let mut registry = Self::empty();
        registry.register(Arc::new(WikipediaSource::new(ctx.clone(), config.wikipedia.clone())));
        registry.register(Arc::new(CoinGeckoSource::new(ctx.clone(), config.crypto.clone())));
        registry.register(Arc::new(FredSource::new(
            ctx.clone(),
            config.fred.clone(),
            creds.fred_api_key.clone(),
        )));
        registry.register(Arc::new(OpenMeteoSource::new(ctx.clone(), config.weather.clone())));
        registry.register(Arc::new(FrankfurterSource::new(ctx.clone(), config.exchange.clone())));
        registry.register(Arc::new(NasaNeoSource::new(ctx, creds.nasa_api_key.clone())));
        registry
    }

    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.kind(), source);
    }

    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn Source>> {
        self.sources.get(&kind).cloned()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::ScriptedFetcher;

    #[test]
    fn window_start_counts_back_from_end() {
        let window = FetchWindow::new(testing::date(2025, 3, 31), 30);
        assert_eq!(window.start(), testing::date(2025, 3, 1));
    }

    #[test]
    fn registry_holds_every_kind() {
        let registry = SourceRegistry::from_config(
            &AppConfig::default(),
            &Credentials::default(),
            Arc::new(ScriptedFetcher::new()),
        );
        for kind in [
            SourceKind::Wikipedia,
            SourceKind::Crypto,
            SourceKind::Fred,
            SourceKind::Weather,
            SourceKind::Exchange,
            SourceKind::Nasa,
        ] {
            let source = registry.get(kind).unwrap();
            assert_eq!(source.kind(), kind);
            assert!(source.hashtag_suffix().starts_with('#'));
        }
        let weather = registry.get(SourceKind::Weather).unwrap();
        assert_eq!(weather.change_kind(), ChangeKind::Absolute);
        assert_eq!(weather.category(), SourceCategory::Environmental);
    }
}
