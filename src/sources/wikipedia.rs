//! Wikimedia pageviews: daily rank lookup, per-article series and article summary.

use chrono::{Days, NaiveDate};
use reqwest::Url;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{SourceKind, WikipediaConfig};
use crate::fetcher::{fetch_json, HttpRequest, RetryPolicy};
use crate::model::{CanonicalSeries, FetchError, NoDataError, TopicDescriptor};
use crate::resolver::TopicResolver;
use crate::sources::{build_series, AdapterContext, FetchWindow, Source, SourceCategory};
use crate::utils::{parse_compact_hour, truncate_chars};

const NAME: &str = "Wikipedia";
/// Wikimedia blocks clients without a descriptive agent.
pub const USER_AGENT: &str =
    "TrendCaptionBot/0.1 (https://github.com/trend-caption/trend-caption; bot@trend-caption.dev)";
const API_ROOT: &str = "https://wikimedia.org/api/rest_v1/metrics/pageviews";
const SUMMARY_MAX_CHARS: usize = 180;

#[derive(Debug, Deserialize)]
struct TopResponse {
    #[serde(default)]
    items: Vec<TopItem>,
}

#[derive(Debug, Deserialize)]
struct TopItem {
    #[serde(default)]
    articles: Vec<RankedArticle>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RankedArticle {
    pub article: String,
    #[serde(default)]
    pub views: u64,
}

#[derive(Debug, Deserialize)]
struct PerArticleResponse {
    #[serde(default)]
    items: Vec<PerArticleItem>,
}

#[derive(Debug, Deserialize)]
struct PerArticleItem {
    timestamp: String,
    views: f64,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    extract: Option<String>,
}

pub struct WikipediaSource {
    ctx: AdapterContext,
    cfg: WikipediaConfig,
    resolver: TopicResolver,
}

impl WikipediaSource {
    pub fn new(ctx: AdapterContext, cfg: WikipediaConfig) -> Self {
        let resolver = TopicResolver::from_config(&cfg);
        Self { ctx, cfg, resolver }
    }

    fn project(&self) -> String {
        format!("{}.wikipedia", self.cfg.language)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, NoDataError> {
        let mut url = Url::parse(API_ROOT).map_err(|e| NoDataError::malformed(NAME, e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| NoDataError::malformed(NAME, "base url cannot carry a path"))?
            .extend(segments);
        Ok(url)
    }

    /// Most viewed articles of yesterday, falling back to the day before.
    ///
    /// Both dates failing (any non-2xx, transport error or empty listing)
    /// is reported as [`NoDataError`].
    pub async fn top_articles(&self, today: NaiveDate) -> Result<Vec<RankedArticle>, NoDataError> {
        let project = self.project();
        let dates: Vec<NaiveDate> = [1, 2]
            .into_iter()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .collect();

        let mut requests = Vec::with_capacity(dates.len());
        for date in &dates {
            let url = self.endpoint(&[
                "top",
                &project,
                "all-access",
                &date.format("%Y").to_string(),
                &date.format("%m").to_string(),
                &date.format("%d").to_string(),
            ])?;
            requests.push(RankRequest {
                date: *date,
                req: HttpRequest::get(url.as_str()).user_agent(USER_AGENT),
            });
        }

        info!("🔍 Looking up yesterday's top trend ({})...", project);
        tokio::time::sleep(self.ctx.pacing.light_delay()).await;
        let fetcher = self.ctx.fetcher.clone();
        RetryPolicy::single()
            .run_with_fallbacks("rank lookup", &requests, self.ctx.pacing.fallback_delay(), |rank| {
                let fetcher = fetcher.clone();
                async move {
                    let body: TopResponse = fetch_json(fetcher.as_ref(), &rank.req).await?;
                    let articles: Vec<RankedArticle> =
                        body.items.into_iter().flat_map(|item| item.articles).collect();
                    if articles.is_empty() {
                        return Err(FetchError::Empty);
                    }
                    Ok(articles)
                }
            })
            .await
            .map_err(|e| NoDataError::from_fetch(NAME, e))
    }

    /// First paragraph of the article, shortened for social posts.
    /// Best-effort: any failure yields `None`.
    pub async fn summary(&self, title: &str) -> Option<String> {
        let mut url = Url::parse(&format!(
            "https://{}.wikipedia.org/api/rest_v1/page/summary",
            self.cfg.language
        ))
        .ok()?;
        url.path_segments_mut().ok()?.push(title);

        let req = HttpRequest::get(url.as_str()).user_agent(USER_AGENT);
        match self.ctx.pull_light::<SummaryResponse>(NAME, &req).await {
            Ok(resp) => resp
                .extract
                .map(|text| truncate_chars(text.trim(), SUMMARY_MAX_CHARS))
                .filter(|text| !text.is_empty()),
            Err(e) => {
                warn!("⚠️ Could not load summary for {}: {}", title, e);
                None
            }
        }
    }
}

#[derive(Clone)]
struct RankRequest {
    date: NaiveDate,
    req: HttpRequest,
}

impl std::fmt::Display for RankRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date)
    }
}

#[async_trait::async_trait]
impl Source for WikipediaSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Wikipedia
    }

    fn name(&self) -> &'static str {
        NAME
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Trend
    }

    fn caption_opener(&self) -> &'static str {
        "🔍 The daily Wikipedia trend!"
    }

    fn hashtag_suffix(&self) -> &'static str {
        "#Wikipedia"
    }

    fn y_axis_label(&self) -> &'static str {
        "Page views"
    }

    fn value_decimals(&self) -> usize {
        0
    }

    fn enrichment_query(&self, topic: &TopicDescriptor) -> Option<String> {
        Some(topic.display_name.clone())
    }

    async fn resolve_topic(&self, today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
        let title = match self.top_articles(today).await {
            Ok(articles) => self.resolver.resolve(articles.iter().map(|a| a.article.as_str())),
            Err(e) => {
                warn!("❌ Rank lookup failed: {}", e);
                self.resolver.resolve(std::iter::empty::<&str>())
            }
        };
        let summary = self.summary(&title).await;
        Ok(TopicDescriptor::from_id(title).with_summary(summary))
    }

    async fn fetch(
        &self,
        topic: &TopicDescriptor,
        window: FetchWindow,
    ) -> Result<CanonicalSeries, NoDataError> {
        info!("📡 Loading page views for {}...", topic.id);
        let project = format!("{}.org", self.project());
        let url = self.endpoint(&[
            "per-article",
            &project,
            "all-access",
            "all-agents",
            &topic.id,
            "daily",
            &window.start().format("%Y%m%d").to_string(),
            &window.end.format("%Y%m%d").to_string(),
        ])?;
        let req = HttpRequest::get(url.as_str()).user_agent(USER_AGENT);

        let body: PerArticleResponse = self.ctx.pull_series(NAME, &req).await?;
        if body.items.is_empty() {
            return Err(NoDataError::empty(NAME));
        }

        let mut points = Vec::with_capacity(body.items.len());
        for item in body.items {
            let date = parse_compact_hour(&item.timestamp).ok_or_else(|| {
                NoDataError::malformed(NAME, format!("bad timestamp {}", item.timestamp))
            })?;
            points.push((date, item.views));
        }
        build_series(NAME, "views", points)
    }
}
