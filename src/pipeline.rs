// Orchestrator: one run from topic resolution to publishing.

use chrono::NaiveDate;
use futures::future::join_all;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::analyzer::{Analyzer, PeriodChange, TrendAnalyzer, TrendReport};
use crate::caption::{compose, Caption, CaptionStyle};
use crate::chart::{ChartRenderer, ChartRequest};
use crate::config::{AppConfig, SourceKind};
use crate::enrichment::{Enricher, Enrichment, EnrichmentUnavailable};
use crate::model::{CanonicalSeries, NoDataError, SinkError, TopicDescriptor};
use crate::notifier::Publisher;
use crate::sources::{FetchWindow, Source, SourceRegistry};

/// States of a run, in order. `Aborted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    TopicResolved,
    SeriesFetched,
    Analyzed,
    Captioned,
    Rendered,
    Published,
    Aborted,
}

impl RunPhase {
    fn enter(self) -> Self {
        debug!("➡️ {}", self);
        self
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::TopicResolved => "topic resolved",
            RunPhase::SeriesFetched => "series fetched",
            RunPhase::Analyzed => "analyzed",
            RunPhase::Captioned => "captioned",
            RunPhase::Rendered => "rendered",
            RunPhase::Published => "published",
            RunPhase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AbortCause {
    #[error("no adapter registered for {0:?}")]
    UnknownSource(SourceKind),
    #[error(transparent)]
    NoData(#[from] NoDataError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// A run that stopped early. `phase` is the last state reached.
#[derive(Debug, Error)]
#[error("run aborted after '{phase}': {cause}")]
pub struct PipelineAbort {
    pub phase: RunPhase,
    pub cause: AbortCause,
}

impl PipelineAbort {
    fn new(phase: RunPhase, cause: impl Into<AbortCause>) -> Self {
        let abort = Self {
            phase,
            cause: cause.into(),
        };
        error!("🛑 {} -> {}: {}", phase, RunPhase::Aborted, abort.cause);
        abort
    }
}

#[derive(Debug)]
pub struct RunOutcome {
    /// `Rendered` for dry runs, `Published` otherwise.
    pub phase: RunPhase,
    pub topic: TopicDescriptor,
    pub report: TrendReport,
    pub enrichment: Enrichment,
    pub caption: Caption,
    pub chart: PathBuf,
    pub published: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

impl RunOutcome {
    /// One-line account of the run for the final log entry.
    pub fn summary(&self) -> String {
        let change = match self.report.change() {
            PeriodChange::Measured(m) => format!("{:+.1} ({})", m.change, m.class().label(m.kind)),
            PeriodChange::InsufficientData { available } => format!("n/a ({} points)", available),
        };
        format!(
            "{} [{}] change {}, latest {:.2} {}, enrichment: {}, chart {}, caption {} chars, published: {}, failed: {}",
            self.topic.display_name,
            self.phase,
            change,
            self.report.latest_value,
            self.report.label,
            self.enrichment,
            self.chart.display(),
            self.caption.as_str().chars().count(),
            sink_list(&self.published),
            sink_list(&self.failed),
        )
    }
}

fn sink_list(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

pub struct Pipeline {
    config: Arc<AppConfig>,
    registry: SourceRegistry,
    analyzer: TrendAnalyzer,
    enricher: Arc<dyn Enricher>,
    renderer: Arc<dyn ChartRenderer>,
    publishers: Vec<Arc<dyn Publisher>>,
}

impl Pipeline {
    pub fn new(
        config: Arc<AppConfig>,
        registry: SourceRegistry,
        enricher: Arc<dyn Enricher>,
        renderer: Arc<dyn ChartRenderer>,
        publishers: Vec<Arc<dyn Publisher>>,
    ) -> Self {
        Self {
            config,
            registry,
            analyzer: TrendAnalyzer::new(),
            enricher,
            renderer,
            publishers,
        }
    }

    fn source(&self, kind: SourceKind, phase: RunPhase) -> Result<Arc<dyn Source>, PipelineAbort> {
        self.registry
            .get(kind)
            .ok_or_else(|| PipelineAbort::new(phase, AbortCause::UnknownSource(kind)))
    }

    /// Resolves and fetches the comparison series, if one is configured.
    async fn comparison(
        &self,
        today: NaiveDate,
        window: FetchWindow,
    ) -> Result<Option<(&'static str, CanonicalSeries)>, PipelineAbort> {
        let Some(kind) = self.config.compare_with else {
            return Ok(None);
        };
        let other = self.source(kind, RunPhase::TopicResolved)?;
        info!("🔀 Fetching comparison series from {}...", other.name());
        let topic = other
            .resolve_topic(today)
            .await
            .map_err(|e| PipelineAbort::new(RunPhase::TopicResolved, e))?;
        let series = other
            .fetch(&topic, window)
            .await
            .map_err(|e| PipelineAbort::new(RunPhase::TopicResolved, e))?;
        Ok(Some((other.name(), series)))
    }

    pub async fn run(&self, today: NaiveDate) -> Result<RunOutcome, PipelineAbort> {
        let source = self.source(self.config.source, RunPhase::Idle)?;
        info!("🚀 Run started for {} ({})", source.name(), today);

        let topic = source
            .resolve_topic(today)
            .await
            .map_err(|e| PipelineAbort::new(RunPhase::Idle, e))?;
        info!("🎯 Topic: {} ({})", topic.display_name, topic.id);
        let phase = RunPhase::TopicResolved.enter();

        let window = FetchWindow::new(today, self.config.window_days());
        let series = source
            .fetch(&topic, window)
            .await
            .map_err(|e| PipelineAbort::new(phase, e))?;
        let comparison = self.comparison(today, window).await?;
        RunPhase::SeriesFetched.enter();
        info!(
            "📦 Series fetched: {} points ({} to {})",
            series.len(),
            series.first_date(),
            series.last_date()
        );

        let report = self.analyzer.analyze(
            &series,
            source.change_kind(),
            comparison.as_ref().map(|(_, s)| s),
        );
        RunPhase::Analyzed.enter();
        match report.change() {
            PeriodChange::Measured(m) => info!(
                "📊 Weekly mean {:.2} vs {:.2}: {:+.2} ({})",
                m.recent_mean,
                m.previous_mean,
                m.change,
                m.class().label(m.kind)
            ),
            PeriodChange::InsufficientData { available } => {
                info!("📊 Only {} points, skipping the weekly comparison", available)
            }
        }
        if let Some(class) = report.correlation.as_ref().and_then(|c| c.class()) {
            info!("🔗 Correlation with comparison series: {}", class.label());
        }

        let enrichment = match source.enrichment_query(&topic) {
            Some(query) => self.enricher.enrich(&topic, &query, &self.config.language).await,
            None => Enrichment::Unavailable(EnrichmentUnavailable::NotApplicable),
        };

        let style = CaptionStyle::for_source(source.as_ref());
        let caption = compose(
            &topic,
            &report,
            enrichment.narrative(),
            &style,
            comparison.as_ref().map(|(name, _)| *name),
        );
        info!("📝 Caption composed ({} chars)", caption.as_str().chars().count());
        let phase = RunPhase::Captioned.enter();

        let chart = self
            .renderer
            .render(&ChartRequest {
                series: &series,
                rolling: &report.rolling,
                peak: report.peak,
                topic: &topic,
                source_name: source.name(),
                y_label: source.y_axis_label(),
                decimals: style.decimals,
            })
            .map_err(|e| PipelineAbort::new(phase, e))?;
        let phase = RunPhase::Rendered.enter();

        if self.config.dry_run {
            info!("🧪 Dry run, nothing published. Caption:\n{}", caption);
            return Ok(RunOutcome {
                phase,
                topic,
                report,
                enrichment,
                caption,
                chart,
                published: Vec::new(),
                failed: Vec::new(),
            });
        }

        let (published, failed) = self.publish(&chart, &caption).await;
        let phase = RunPhase::Published.enter();
        info!(
            "🏁 Run finished: {} published, {} failed",
            published.len(),
            failed.len()
        );
        Ok(RunOutcome {
            phase,
            topic,
            report,
            enrichment,
            caption,
            chart,
            published,
            failed,
        })
    }

    /// Invokes every publisher; one failing does not stop the others.
    async fn publish(
        &self,
        chart: &Path,
        caption: &Caption,
    ) -> (Vec<&'static str>, Vec<&'static str>) {
        if self.publishers.is_empty() {
            warn!("⚠️ No publisher enabled, chart stays at {}", chart.display());
        }
        let results = join_all(self.publishers.iter().map(|p| async move {
            (p.name(), p.publish(chart, caption.as_str()).await)
        }))
        .await;

        let mut published = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(()) => published.push(name),
                Err(e) => {
                    warn!("❌ Publishing to {} failed: {}", name, e);
                    failed.push(name);
                }
            }
        }
        (published, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ChangeKind;
    use crate::config::WikipediaConfig;
    use crate::fetcher::testing::ScriptedFetcher;
    use crate::model::FetchError;
    use crate::sources::testing::{context, date};
    use crate::sources::{SourceCategory, WikipediaSource};
    use chrono::Days;
    use std::sync::Mutex;

    struct FakeSource {
        kind: SourceKind,
        name: &'static str,
        series: Result<CanonicalSeries, NoDataError>,
    }

    #[async_trait::async_trait]
    impl Source for FakeSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }
        fn name(&self) -> &'static str {
            self.name
        }
        fn category(&self) -> SourceCategory {
            SourceCategory::Market
        }
        fn hashtag_suffix(&self) -> &'static str {
            "#Crypto"
        }
        fn y_axis_label(&self) -> &'static str {
            "Price (USD)"
        }
        fn enrichment_query(&self, topic: &TopicDescriptor) -> Option<String> {
            Some(format!("{} crypto market", topic.display_name))
        }
        async fn resolve_topic(&self, _today: NaiveDate) -> Result<TopicDescriptor, NoDataError> {
            Ok(TopicDescriptor::new("bitcoin", "Bitcoin"))
        }
        async fn fetch(
            &self,
            _topic: &TopicDescriptor,
            _window: FetchWindow,
        ) -> Result<CanonicalSeries, NoDataError> {
            self.series.clone()
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ChartRenderer for RecordingRenderer {
        fn render(&self, request: &ChartRequest<'_>) -> Result<PathBuf, SinkError> {
            self.calls.lock().unwrap().push(request.title());
            if self.fail {
                return Err(SinkError::Render {
                    sink: "chart",
                    detail: "disk full".into(),
                });
            }
            Ok(PathBuf::from("output/trend_chart.svg"))
        }
    }

    struct RecordingPublisher {
        name: &'static str,
        fail: bool,
        captions: Mutex<Vec<String>>,
    }

    impl RecordingPublisher {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                captions: Mutex::new(Vec::new()),
            })
        }

        fn count(&self) -> usize {
            self.captions.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl Publisher for RecordingPublisher {
        fn name(&self) -> &'static str {
            self.name
        }
        async fn publish(&self, _chart: &Path, caption: &str) -> Result<(), SinkError> {
            self.captions.lock().unwrap().push(caption.to_string());
            if self.fail {
                return Err(SinkError::Unreachable { sink: self.name });
            }
            Ok(())
        }
    }

    struct FixedEnricher(Enrichment);

    #[async_trait::async_trait]
    impl Enricher for FixedEnricher {
        async fn enrich(&self, _topic: &TopicDescriptor, _query: &str, _language: &str) -> Enrichment {
            self.0.clone()
        }
    }

    fn series(values: &[f64]) -> CanonicalSeries {
        let start = date(2025, 3, 1);
        CanonicalSeries::from_points(
            "price_usd",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + Days::new(i as u64), *v)),
        )
        .unwrap()
    }

    fn rising() -> CanonicalSeries {
        let mut values = vec![100.0; 7];
        values.extend(vec![150.0; 7]);
        series(&values)
    }

    fn registry(sources: Vec<FakeSource>) -> SourceRegistry {
        let mut registry = SourceRegistry::empty();
        for s in sources {
            registry.register(Arc::new(s));
        }
        registry
    }

    fn crypto(series: Result<CanonicalSeries, NoDataError>) -> FakeSource {
        FakeSource {
            kind: SourceKind::Crypto,
            name: "CoinGecko",
            series,
        }
    }

    fn config(dry_run: bool) -> Arc<AppConfig> {
        Arc::new(AppConfig {
            source: SourceKind::Crypto,
            dry_run,
            ..AppConfig::default()
        })
    }

    fn narrative() -> Arc<dyn Enricher> {
        Arc::new(FixedEnricher(Enrichment::Narrative("🚀 ETF inflows.".into())))
    }

    #[tokio::test]
    async fn successful_run_publishes_everywhere() {
        let renderer = Arc::new(RecordingRenderer::default());
        let telegram = RecordingPublisher::new("telegram", false);
        let discord = RecordingPublisher::new("discord", false);
        let pipeline = Pipeline::new(
            config(false),
            registry(vec![crypto(Ok(rising()))]),
            narrative(),
            renderer.clone(),
            vec![telegram.clone(), discord.clone()],
        );

        let outcome = pipeline.run(date(2025, 3, 14)).await.unwrap();

        assert_eq!(outcome.phase, RunPhase::Published);
        assert_eq!(outcome.published, vec!["telegram", "discord"]);
        assert!(outcome.failed.is_empty());
        assert_eq!(
            renderer.calls.lock().unwrap().as_slice(),
            ["CoinGecko Trend: Bitcoin".to_string()]
        );
        let caption = &telegram.captions.lock().unwrap()[0];
        assert!(caption.contains("🚀 ETF inflows."));
        assert!(caption.contains("50.0%"));
        assert_eq!(outcome.report.change_kind, ChangeKind::Relative);
        assert_eq!(discord.count(), 1);
    }

    #[tokio::test]
    async fn dry_run_renders_but_does_not_publish() {
        let telegram = RecordingPublisher::new("telegram", false);
        let pipeline = Pipeline::new(
            config(true),
            registry(vec![crypto(Ok(rising()))]),
            narrative(),
            Arc::new(RecordingRenderer::default()),
            vec![telegram.clone()],
        );
        let outcome = pipeline.run(date(2025, 3, 14)).await.unwrap();
        assert_eq!(outcome.phase, RunPhase::Rendered);
        assert_eq!(telegram.count(), 0);
    }

    #[tokio::test]
    async fn missing_data_aborts_before_any_sink() {
        let renderer = Arc::new(RecordingRenderer::default());
        let telegram = RecordingPublisher::new("telegram", false);
        let pipeline = Pipeline::new(
            config(false),
            registry(vec![crypto(Err(NoDataError::empty("CoinGecko")))]),
            narrative(),
            renderer.clone(),
            vec![telegram.clone()],
        );

        let abort = pipeline.run(date(2025, 3, 14)).await.unwrap_err();
        assert_eq!(abort.phase, RunPhase::TopicResolved);
        assert!(matches!(abort.cause, AbortCause::NoData(NoDataError::Empty { .. })));
        assert!(renderer.calls.lock().unwrap().is_empty());
        assert_eq!(telegram.count(), 0);
    }

    #[tokio::test]
    async fn failed_rank_and_series_lookups_abort_the_run() {
        let fetcher = Arc::new(
            ScriptedFetcher::new().route("wikimedia.org", vec![Err(FetchError::Status(503))]),
        );
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(WikipediaSource::new(
            context(fetcher.clone()),
            WikipediaConfig::default(),
        )));
        let renderer = Arc::new(RecordingRenderer::default());
        let telegram = RecordingPublisher::new("telegram", false);
        let pipeline = Pipeline::new(
            Arc::new(AppConfig::default()),
            registry,
            narrative(),
            renderer.clone(),
            vec![telegram.clone()],
        );

        let abort = pipeline.run(date(2025, 3, 14)).await.unwrap_err();

        assert_eq!(fetcher.count_matching("pageviews/top"), 2);
        assert!(matches!(
            abort.cause,
            AbortCause::NoData(NoDataError::Exhausted {
                cause: FetchError::Status(503),
                ..
            })
        ));
        assert!(renderer.calls.lock().unwrap().is_empty());
        assert_eq!(telegram.count(), 0);
    }

    #[tokio::test]
    async fn render_failure_blocks_publishing() {
        let renderer = Arc::new(RecordingRenderer {
            fail: true,
            ..RecordingRenderer::default()
        });
        let telegram = RecordingPublisher::new("telegram", false);
        let pipeline = Pipeline::new(
            config(false),
            registry(vec![crypto(Ok(rising()))]),
            narrative(),
            renderer,
            vec![telegram.clone()],
        );
        let abort = pipeline.run(date(2025, 3, 14)).await.unwrap_err();
        assert_eq!(abort.phase, RunPhase::Captioned);
        assert!(matches!(abort.cause, AbortCause::Sink(SinkError::Render { .. })));
        assert_eq!(telegram.count(), 0);
    }

    #[tokio::test]
    async fn one_failing_publisher_does_not_stop_the_other() {
        let telegram = RecordingPublisher::new("telegram", true);
        let discord = RecordingPublisher::new("discord", false);
        let pipeline = Pipeline::new(
            config(false),
            registry(vec![crypto(Ok(rising()))]),
            narrative(),
            Arc::new(RecordingRenderer::default()),
            vec![telegram.clone(), discord.clone()],
        );
        let outcome = pipeline.run(date(2025, 3, 14)).await.unwrap();
        assert_eq!(outcome.published, vec!["discord"]);
        assert_eq!(outcome.failed, vec!["telegram"]);
        assert_eq!(telegram.count(), 1);
        assert_eq!(discord.count(), 1);

        let summary = outcome.summary();
        assert!(summary.starts_with("Bitcoin [published] change +50.0 (strong increase)"), "{summary}");
        assert!(summary.contains("latest 150.00 price_usd"));
        assert!(summary.contains("enrichment: 🚀 ETF inflows."));
        assert!(summary.contains("chart output/trend_chart.svg"));
        assert!(summary.ends_with("published: discord, failed: telegram"));
    }

    #[tokio::test]
    async fn dry_run_summary_names_no_sinks() {
        let pipeline = Pipeline::new(
            config(true),
            registry(vec![crypto(Ok(series(&[1.0, 2.0, 3.0])))]),
            narrative(),
            Arc::new(RecordingRenderer::default()),
            Vec::new(),
        );
        let outcome = pipeline.run(date(2025, 3, 14)).await.unwrap();
        let summary = outcome.summary();
        assert!(summary.contains("[rendered] change n/a (3 points)"), "{summary}");
        assert!(summary.ends_with("published: none, failed: none"));
    }

    #[tokio::test]
    async fn unavailable_enrichment_is_not_fatal() {
        let telegram = RecordingPublisher::new("telegram", false);
        let pipeline = Pipeline::new(
            config(false),
            registry(vec![crypto(Ok(rising()))]),
            Arc::new(FixedEnricher(Enrichment::Unavailable(
                EnrichmentUnavailable::Request("timeout".into()),
            ))),
            Arc::new(RecordingRenderer::default()),
            vec![telegram.clone()],
        );
        let outcome = pipeline.run(date(2025, 3, 14)).await.unwrap();
        assert_eq!(outcome.phase, RunPhase::Published);
        assert!(!telegram.captions.lock().unwrap()[0].contains("ETF"));
    }

    #[tokio::test]
    async fn comparison_adds_a_correlation_sentence() {
        let fred = FakeSource {
            kind: SourceKind::Fred,
            name: "FRED",
            series: Ok(rising()),
        };
        let config = Arc::new(AppConfig {
            source: SourceKind::Crypto,
            compare_with: Some(SourceKind::Fred),
            dry_run: true,
            ..AppConfig::default()
        });
        let pipeline = Pipeline::new(
            config,
            registry(vec![crypto(Ok(rising())), fred]),
            narrative(),
            Arc::new(RecordingRenderer::default()),
            Vec::new(),
        );
        let outcome = pipeline.run(date(2025, 3, 14)).await.unwrap();
        assert!(outcome
            .caption
            .as_str()
            .contains("🔗 Correlation with FRED: r = 1.00 (strong positive)."));
    }

    #[tokio::test]
    async fn unregistered_source_aborts_idle() {
        let pipeline = Pipeline::new(
            config(false),
            SourceRegistry::empty(),
            narrative(),
            Arc::new(RecordingRenderer::default()),
            Vec::new(),
        );
        let abort = pipeline.run(date(2025, 3, 14)).await.unwrap_err();
        assert_eq!(abort.phase, RunPhase::Idle);
        assert!(matches!(abort.cause, AbortCause::UnknownSource(SourceKind::Crypto)));
    }
}
