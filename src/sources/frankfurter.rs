use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::config::{ExchangeConfig, SourceKind};
use crate::fetcher::HttpRequest;
use crate::model::{CanonicalSeries, NoDataError, TopicDescriptor};
use crate::sources::{build_series, AdapterContext, FetchWindow, Source, SourceCategory};
use crate::utils::parse_iso_date;

const NAME: &str = "Frankfurter";
const BASE_URL: &str = "https://api.frankfurter.app";

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    rates: BTreeMap<String, HashMap<String, f64>>,
}

/// ECB reference rates; business days only.
pub struct FrankfurterSource {
    ctx: AdapterContext,
    cfg: ExchangeConfig,
}

impl FrankfurterSource {
    pub fn new(ctx: AdapterContext, cfg: ExchangeConfig) -> Self {
        Self { ctx, cfg }
    }

    fn base(&self) -> String {
        self.cfg.base.to_uppercase()
    }

    fn target(&self) -> String {
        self.cfg.target.to_uppercase()
    }
}

#[async_trait::async_trait]
impl Source for FrankfurterSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Exchange
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Market
    }

    fn hashtag_suffix(&self) -> &'static str {
        "#Forex"
    }

    fn y_axis_label(&self) -> &'static str {
        "Exchange rate"
    }

    fn value_decimals(&self) -> usize {
        4
    }

    fn enrichment_query(&self, _topic: &TopicDescriptor) -> Option<String> {
        Some(format!("{} {} exchange rate", self.base(), self.target()))
    }

    async fn resolve_topic(&self, _today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
        let (base, target) = (self.base(), self.target());
        Ok(TopicDescriptor::new(
            format!("{}/{}", base, target),
            format!("{} {}", base, target),
        ))
    }

    async fn fetch(
        &self,
        topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError> {
        info!("📡 Loading {} rates...", topic.id);
        let target = self.target();
        let req = HttpRequest::get(format!("{}/{}..{}", BASE_URL, window.start(), window.end))
            .query("from", self.base())
            .query("to", &target);

        let body: TimeSeriesResponse = self.ctx.pull_series(NAME, &req).await?;
        if body.rates.is_empty() {
            return Err(NoDataError::empty(NAME));
        }

        let mut points = Vec::with_capacity(body.rates.len());
        for (day, quotes) in body.rates {
            let Some(rate) = quotes.get(&target) else {
                continue;
            };
            let date = parse_iso_date(&day)
                .ok_or_else(|| NoDataError::malformed(NAME, format!("invalid date '{}'", day)))?;
            points.push((date, *rate));
        }
        build_series(NAME, "rate", points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::ScriptedFetcher;
    use crate::sources::testing::{context, date};
    use std::sync::Arc;

    #[tokio::test]
    async fn rates_for_the_target_currency_are_extracted() {
        let body = r#"{"amount":1.0,"base":"EUR","start_date":"2025-03-03","end_date":"2025-03-05",
            "rates":{"2025-03-05":{"USD":1.0795},"2025-03-03":{"USD":1.0486},"2025-03-04":{"GBP":0.83}}}"#;
        let fetcher = Arc::new(ScriptedFetcher::new().ok("frankfurter.app/2025-02-13..2025-03-15", body));
        let src = FrankfurterSource::new(context(fetcher.clone()), ExchangeConfig::default());

        let topic = src.resolve_topic(date(2025, 3, 15)).await.unwrap();
        assert_eq!(topic.id, "EUR/USD");
        assert_eq!(topic.display_name, "EUR USD");

        let series = src
            .fetch(&topic, FetchWindow::new(date(2025, 3, 15), 30))
            .await
            .unwrap();
        assert_eq!(
            series.points(),
            &[(date(2025, 3, 3), 1.0486), (date(2025, 3, 5), 1.0795)]
        );
        assert_eq!(fetcher.requests()[0].query_value("to"), Some("USD"));
    }

    #[tokio::test]
    async fn empty_rates_is_no_data() {
        let fetcher = Arc::new(ScriptedFetcher::new().ok("frankfurter", r#"{"rates":{}}"#));
        let src = FrankfurterSource::new(context(fetcher), ExchangeConfig::default());
        let err = src
            .fetch(
                &TopicDescriptor::new("EUR/USD", "EUR USD"),
                FetchWindow::new(date(2025, 3, 15), 30),
            )
            .await
            .unwrap_err();
        assert_eq!(err, NoDataError::empty(NAME));
    }
}
