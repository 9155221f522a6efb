// Analyzer module: rolling trend, week-over-week change and correlation.

pub mod correlation;
pub mod trend;

use crate::model::CanonicalSeries;
use chrono::NaiveDate;

pub use correlation::{Correlation, CorrelationClass};
pub use trend::{ChangeClass, ChangeKind, PeriodChange, TREND_WINDOW};
use trend::MeasuredChange;

/// Statistics of one run, consumed by the caption generator and the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendReport {
    pub label: String,
    pub change_kind: ChangeKind,
    /// Number of observations analyzed.
    pub observations: usize,
    /// Mean of the last trend window.
    pub current_value: Option<f64>,
    /// Mean of the trend window before the last one.
    pub previous_period_value: Option<f64>,
    pub latest_value: f64,
    /// Single observation one trend window before the latest one.
    pub value_week_ago: Option<f64>,
    /// Rolling mean aligned with the series points.
    pub rolling: Vec<f64>,
    pub peak: (NaiveDate, f64),
    /// Present only when a second series was compared.
    pub correlation: Option<Correlation>,
}

impl TrendReport {
    /// Week-over-week change of the window means.
    pub fn change(&self) -> PeriodChange {
        match (self.previous_period_value, self.current_value) {
            (Some(previous), Some(current)) => {
                PeriodChange::Measured(MeasuredChange::between(self.change_kind, previous, current))
            }
            _ => PeriodChange::InsufficientData {
                available: self.observations,
            },
        }
    }

    /// Latest value minus the value one trend window earlier.
    pub fn week_delta(&self) -> Option<f64> {
        self.value_week_ago
            .map(|week_ago| self.latest_value - week_ago)
    }
}

/// Trait defining the interface for a series analyzer.
pub trait Analyzer {
    fn analyze(
        &self,
        series: &CanonicalSeries,
        kind: ChangeKind,
        compare_with: Option<&CanonicalSeries>,
    ) -> TrendReport;
}

pub struct TrendAnalyzer;

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for TrendAnalyzer {
    fn analyze(
        &self,
        series: &CanonicalSeries,
        kind: ChangeKind,
        compare_with: Option<&CanonicalSeries>,
    ) -> TrendReport {
        let values = series.values();
        let points = series.points();

        let means = trend::window_means(&values);
        let value_week_ago = values
            .len()
            .checked_sub(TREND_WINDOW + 1)
            .map(|idx| values[idx]);

        let peak = points
            .iter()
            .copied()
            .fold(points[0], |best, p| if p.1 > best.1 { p } else { best });

        TrendReport {
            label: series.label().to_string(),
            change_kind: kind,
            observations: values.len(),
            current_value: means.map(|(_, recent)| recent),
            previous_period_value: means.map(|(previous, _)| previous),
            latest_value: series.latest(),
            value_week_ago,
            rolling: trend::rolling_mean(&values, TREND_WINDOW),
            peak,
            correlation: compare_with.map(|other| correlation::correlate(series, other)),
        }
    }
}
