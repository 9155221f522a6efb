use chrono::{Days, NaiveDate};
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::info;

use crate::config::SourceKind;
use crate::fetcher::HttpRequest;
use crate::model::{CanonicalSeries, NoDataError, TopicDescriptor};
use crate::sources::{build_series, AdapterContext, FetchWindow, Source, SourceCategory};
use crate::utils::parse_iso_date;

const NAME: &str = "NASA";
const BASE_URL: &str = "https://api.nasa.gov/neo/rest/v1/feed";
/// Public key with a low hourly quota, used when no personal key is configured.
const DEMO_KEY: &str = "DEMO_KEY";
/// The feed rejects spans longer than seven days.
const MAX_SPAN_DAYS: u64 = 7;

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    near_earth_objects: HashMap<String, Vec<IgnoredAny>>,
}

/// Daily count of near-earth object close approaches.
pub struct NasaNeoSource {
    ctx: AdapterContext,
    api_key: Option<String>,
}

impl NasaNeoSource {
    pub fn new(ctx: AdapterContext, api_key: Option<String>) -> Self {
        Self { ctx, api_key }
    }

    fn api_key(&self) -> &str {
        self.api_key.as_deref().unwrap_or(DEMO_KEY)
    }
}

/// Splits `[start, end]` into inclusive chunks the feed accepts.
fn chunks(start: NaiveDate, end: NaiveDate) -> Vec<(NaiveDate, NaiveDate)> {
    let mut out = Vec::new();
    let mut cursor = start;
    while cursor <= end {
        let chunk_end = cursor
            .checked_add_days(Days::new(MAX_SPAN_DAYS - 1))
            .map_or(end, |d| d.min(end));
        out.push((cursor, chunk_end));
        match chunk_end.checked_add_days(Days::new(1)) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    out
}

#[async_trait::async_trait]
impl Source for NasaNeoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Nasa
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Celestial
    }

    fn hashtag_suffix(&self) -> &'static str {
        "#NASA"
    }

    fn y_axis_label(&self) -> &'static str {
        "Close approaches"
    }

    fn value_decimals(&self) -> usize {
        0
    }

    fn enrichment_query(&self, _topic: &TopicDescriptor) -> Option<String> {
        None
    }

    async fn resolve_topic(&self, _today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
        Ok(TopicDescriptor::new("near-earth-objects", "Near-Earth Objects"))
    }

    async fn fetch(
        &self,
        _topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError> {
        let spans = chunks(window.start(), window.end);
        info!("📡 Loading near-earth objects in {} chunks...", spans.len());

        let mut points = Vec::new();
        for (start, end) in spans {
            let req = HttpRequest::get(BASE_URL)
                .query("start_date", start)
                .query("end_date", end)
                .query("api_key", self.api_key());
            let feed: FeedResponse = self.ctx.pull_series(NAME, &req).await?;
            for (day, objects) in feed.near_earth_objects {
                let date = parse_iso_date(&day)
                    .ok_or_else(|| NoDataError::malformed(NAME, format!("invalid date '{}'", day)))?;
                points.push((date, objects.len() as f64));
            }
        }
        if points.is_empty() {
            return Err(NoDataError::empty(NAME));
        }
        build_series(NAME, "objects", points)
    }
}
