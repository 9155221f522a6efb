use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::info;

use crate::config::{CryptoConfig, SourceKind};
use crate::fetcher::HttpRequest;
use crate::model::{CanonicalSeries, NoDataError, TopicDescriptor};
use crate::sources::{build_series, AdapterContext, FetchWindow, Source, SourceCategory};

const NAME: &str = "CoinGecko";
const BASE_URL: &str = "https://api.coingecko.com/api/v3/coins";

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<(f64, f64)>,
}

pub struct CoinGeckoSource {
    ctx: AdapterContext,
    cfg: CryptoConfig,
}

impl CoinGeckoSource {
    pub fn new(ctx: AdapterContext, cfg: CryptoConfig) -> Self {
        Self { ctx, cfg }
    }

    fn label(&self) -> String {
        format!("price_{}", self.cfg.vs_currency.to_lowercase())
    }
}

/// `bitcoin` -> `Bitcoin`, `usd-coin` -> `Usd Coin`.
fn coin_display_name(coin_id: &str) -> String {
    coin_id
        .split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait::async_trait]
impl Source for CoinGeckoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Crypto
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Market
    }

    fn hashtag_suffix(&self) -> &'static str {
        "#Crypto"
    }

    fn y_axis_label(&self) -> &'static str {
        "Price"
    }

    fn enrichment_query(&self, topic: &TopicDescriptor) -> Option<String> {
        Some(format!("{} crypto market", topic.display_name))
    }

    async fn resolve_topic(&self, _today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
        Ok(TopicDescriptor::new(
            self.cfg.coin_id.clone(),
            coin_display_name(&self.cfg.coin_id),
        ))
    }

    async fn fetch(
        &self,
        topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError> {
        info!("📡 Loading {} prices for {} days...", topic.id, window.days);
        let req = HttpRequest::get(format!("{}/{}/market_chart", BASE_URL, topic.id))
            .query("vs_currency", &self.cfg.vs_currency)
            .query("days", window.days)
            .query("interval", "daily");

        let chart: MarketChart = self.ctx.pull_series(NAME, &req).await?;
        if chart.prices.is_empty() {
            return Err(NoDataError::empty(NAME));
        }

        // Several points may share a day (the last one is "now"); the later one wins.
        let points = chart
            .prices
            .into_iter()
            .filter_map(|(millis, price)| {
                DateTime::from_timestamp_millis(millis as i64).map(|ts| (ts.date_naive(), price))
            })
            .filter(|(date, _)| *date <= window.end)
            .collect();
        build_series(NAME, &self.label(), points)
    }
}
