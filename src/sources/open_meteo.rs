use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use crate::analyzer::ChangeKind;
use crate::config::{SourceKind, WeatherConfig};
use crate::fetcher::HttpRequest;
use crate::model::{CanonicalSeries, NoDataError, TopicDescriptor};
use crate::sources::{build_series, AdapterContext, FetchWindow, Source, SourceCategory};
use crate::utils::parse_iso_date;

const NAME: &str = "Open-Meteo";
const BASE_URL: &str = "https://api.open-meteo.com/v1/forecast";
/// Upper bound of `past_days` accepted by the forecast endpoint.
const MAX_PAST_DAYS: u32 = 92;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: Option<Daily>,
}

#[derive(Debug, Deserialize)]
struct Daily {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    temperature_2m_mean: Vec<Option<f64>>,
}

/// Daily mean temperature of one city.
pub struct OpenMeteoSource {
    ctx: AdapterContext,
    cfg: WeatherConfig,
}

impl OpenMeteoSource {
    pub fn new(ctx: AdapterContext, cfg: WeatherConfig) -> Self {
        Self { ctx, cfg }
    }
}

#[async_trait::async_trait]
impl Source for OpenMeteoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Weather
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Environmental
    }

    fn change_kind(&self) -> ChangeKind {
        ChangeKind::Absolute
    }

    fn hashtag_suffix(&self) -> &'static str {
        "#Weather"
    }

    fn y_axis_label(&self) -> &'static str {
        "Temperature (°C)"
    }

    fn value_decimals(&self) -> usize {
        1
    }

    fn unit(&self) -> Option<&'static str> {
        Some("°C")
    }

    fn enrichment_query(&self, _topic: &TopicDescriptor) -> Option<String> {
        None
    }

    async fn resolve_topic(&self, _today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
        Ok(TopicDescriptor::new(self.cfg.city.clone(), self.cfg.city.clone()))
    }

    async fn fetch(
        &self,
        topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError> {
        info!("📡 Loading temperatures for {}...", topic.display_name);
        let req = HttpRequest::get(BASE_URL)
            .query("latitude", self.cfg.latitude)
            .query("longitude", self.cfg.longitude)
            .query("daily", "temperature_2m_mean")
            .query("past_days", window.days.min(MAX_PAST_DAYS))
            .query("forecast_days", 1)
            .query("timezone", "UTC");

        let body: ForecastResponse = self.ctx.pull_series(NAME, &req).await?;
        let daily = body.daily.ok_or_else(|| NoDataError::empty(NAME))?;
        if daily.time.len() != daily.temperature_2m_mean.len() {
            return Err(NoDataError::malformed(NAME, "time and value arrays differ in length"));
        }

        let mut points = Vec::with_capacity(daily.time.len());
        for (day, value) in daily.time.iter().zip(daily.temperature_2m_mean) {
            let Some(value) = value else {
                continue;
            };
            let date = parse_iso_date(day)
                .ok_or_else(|| NoDataError::malformed(NAME, format!("invalid date '{}'", day)))?;
            if date <= window.end {
                points.push((date, value));
            }
        }
        build_series(NAME, "temperature_c", points)
    }
}
