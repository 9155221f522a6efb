//! FRED API integration for daily rate series (e.g. 10-year treasury yield).

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::config::{FredConfig, SourceKind};
use crate::fetcher::HttpRequest;
use crate::model::{CanonicalSeries, NoDataError, TopicDescriptor};
use crate::sources::{build_series, AdapterContext, FetchWindow, Source, SourceCategory};
use crate::utils::parse_iso_date;

const NAME: &str = "FRED";
const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";
const API_KEY_VAR: &str = "FRED_API_KEY";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Vec<Observation>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    date: String,
    value: String,
}

pub struct FredSource {
    ctx: AdapterContext,
    cfg: FredConfig,
    api_key: Option<String>,
}

impl FredSource {
    pub fn new(ctx: AdapterContext, cfg: FredConfig, api_key: Option<String>) -> Self {
        Self { ctx, cfg, api_key }
    }
}

/// FRED marks missing observations with ".".
fn parse_value(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed == "." || trimmed.is_empty() {
        return None;
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

#[async_trait::async_trait]
impl Source for FredSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Fred
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Market
    }

    fn hashtag_suffix(&self) -> &'static str {
        "#InterestRates"
    }

    fn y_axis_label(&self) -> &'static str {
        "Yield (%)"
    }

    fn enrichment_query(&self, _topic: &TopicDescriptor) -> Option<String> {
        Some("US Federal Reserve interest rates economy".to_string())
    }

    async fn resolve_topic(&self, _today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
        Ok(TopicDescriptor::from_id(self.cfg.series_id.clone()))
    }

    async fn fetch(
        &self,
        topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NoDataError::MissingCredential {
                source_name: NAME.to_string(),
                variable: API_KEY_VAR,
            })?;

        info!("📡 Loading FRED series {}...", topic.id);
        let req = HttpRequest::get(BASE_URL)
            .query("series_id", &topic.id)
            .query("api_key", api_key)
            .query("file_type", "json")
            .query("observation_start", window.start())
            .query("observation_end", window.end);

        let body: ObservationsResponse = self.ctx.pull_series(NAME, &req).await?;
        if body.observations.is_empty() {
            return Err(NoDataError::empty(NAME));
        }

        let mut points = Vec::with_capacity(body.observations.len());
        for obs in body.observations {
            let Some(value) = parse_value(&obs.value) else {
                continue;
            };
            let date = parse_iso_date(&obs.date)
                .ok_or_else(|| NoDataError::malformed(NAME, format!("invalid date '{}'", obs.date)))?;
            points.push((date, value));
        }
        build_series(NAME, "percent", points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::ScriptedFetcher;
    use crate::sources::testing::{context, date};
    use std::sync::Arc;

    #[test]
    fn missing_markers_are_skipped() {
        assert_eq!(parse_value("."), None);
        assert_eq!(parse_value(" "), None);
        assert_eq!(parse_value("4.21"), Some(4.21));
        assert_eq!(parse_value("NaN"), None);
    }

    #[tokio::test]
    async fn missing_key_aborts_without_request() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let src = FredSource::new(context(fetcher.clone()), FredConfig::default(), None);
        let topic = src.resolve_topic(date(2025, 3, 15)).await.unwrap();

        let err = src
            .fetch(&topic, FetchWindow::new(date(2025, 3, 15), 30))
            .await
            .unwrap_err();

        assert!(matches!(err, NoDataError::MissingCredential { variable: "FRED_API_KEY", .. }));
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn observations_become_a_series() {
        let body = r#"{"observations":[
            {"date":"2025-03-12","value":"4.31"},
            {"date":"2025-03-13","value":"."},
            {"date":"2025-03-14","value":"4.27"}]}"#;
        let fetcher = Arc::new(ScriptedFetcher::new().ok("fred/series/observations", body));
        let src = FredSource::new(context(fetcher.clone()), FredConfig::default(), Some("k".into()));

        let series = src
            .fetch(&TopicDescriptor::from_id("DGS10"), FetchWindow::new(date(2025, 3, 15), 30))
            .await
            .unwrap();

        assert_eq!(series.label(), "percent");
        assert_eq!(
            series.points(),
            &[(date(2025, 3, 12), 4.31), (date(2025, 3, 14), 4.27)]
        );
        let req = &fetcher.requests()[0];
        assert_eq!(req.query_value("observation_start"), Some("2025-02-13"));
        assert_eq!(req.query_value("series_id"), Some("DGS10"));
    }

    #[tokio::test]
    async fn only_missing_markers_is_no_data() {
        let body = r#"{"observations":[{"date":"2025-03-13","value":"."}]}"#;
        let fetcher = Arc::new(ScriptedFetcher::new().ok("observations", body));
        let src = FredSource::new(context(fetcher), FredConfig::default(), Some("k".into()));
        let err = src
            .fetch(&TopicDescriptor::from_id("DGS10"), FetchWindow::new(date(2025, 3, 15), 30))
            .await
            .unwrap_err();
        assert_eq!(err, NoDataError::empty(NAME));
    }
}
