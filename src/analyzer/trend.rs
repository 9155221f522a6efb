use crate::utils::mean;

/// Observations averaged by the rolling trend.
pub const TREND_WINDOW: usize = 7;
/// Points needed to compare two contiguous weeks.
pub const COMPARISON_POINTS: usize = 2 * TREND_WINDOW;
pub const STRONG_RELATIVE_PCT: f64 = 20.0;
pub const STRONG_ABSOLUTE_DELTA: f64 = 2.0;

/// How two periods of a series are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Percentage change, for counts and prices.
    Relative,
    /// Plain difference in the series unit, for quantities that cross zero.
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    StrongIncrease,
    SlightIncrease,
    Unchanged,
    SlightDecline,
    StrongDecline,
}

impl ChangeClass {
    pub fn label(self, kind: ChangeKind) -> &'static str {
        match (kind, self) {
            (ChangeKind::Relative, ChangeClass::StrongIncrease) => "strong increase",
            (ChangeKind::Relative, ChangeClass::SlightIncrease) => "slight increase",
            (ChangeKind::Relative, ChangeClass::SlightDecline) => "slight decline",
            (ChangeKind::Relative, ChangeClass::StrongDecline) => "strong decline",
            (ChangeKind::Absolute, ChangeClass::StrongIncrease) => "much higher",
            (ChangeKind::Absolute, ChangeClass::SlightIncrease) => "slightly higher",
            (ChangeKind::Absolute, ChangeClass::SlightDecline) => "slightly lower",
            (ChangeKind::Absolute, ChangeClass::StrongDecline) => "much lower",
            (_, ChangeClass::Unchanged) => "unchanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredChange {
    pub kind: ChangeKind,
    pub recent_mean: f64,
    pub previous_mean: f64,
    /// Percent for [`ChangeKind::Relative`], series units otherwise.
    pub change: f64,
}

impl MeasuredChange {
    /// Change from `previous_mean` to `recent_mean`. A relative change from a
    /// non-positive baseline is 0.
    pub fn between(kind: ChangeKind, previous_mean: f64, recent_mean: f64) -> Self {
        let change = match kind {
            ChangeKind::Absolute => recent_mean - previous_mean,
            ChangeKind::Relative if previous_mean > 0.0 => {
                (recent_mean - previous_mean) / previous_mean * 100.0
            }
            ChangeKind::Relative => 0.0,
        };
        Self {
            kind,
            recent_mean,
            previous_mean,
            change,
        }
    }

    pub fn class(&self) -> ChangeClass {
        let strong = match self.kind {
            ChangeKind::Relative => STRONG_RELATIVE_PCT,
            ChangeKind::Absolute => STRONG_ABSOLUTE_DELTA,
        };
        if self.change > strong {
            ChangeClass::StrongIncrease
        } else if self.change < -strong {
            ChangeClass::StrongDecline
        } else if self.change > 0.0 {
            ChangeClass::SlightIncrease
        } else if self.change < 0.0 {
            ChangeClass::SlightDecline
        } else {
            ChangeClass::Unchanged
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeriodChange {
    InsufficientData { available: usize },
    Measured(MeasuredChange),
}

impl PeriodChange {
    pub fn measured(&self) -> Option<&MeasuredChange> {
        match self {
            PeriodChange::Measured(m) => Some(m),
            PeriodChange::InsufficientData { .. } => None,
        }
    }
}

/// Moving average whose window shrinks at the start of the series.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Means of the week before the last one and of the last week, in that order.
pub fn window_means(values: &[f64]) -> Option<(f64, f64)> {
    let start = values.len().checked_sub(COMPARISON_POINTS)?;
    let (previous, recent) = values[start..].split_at(TREND_WINDOW);
    Some((mean(previous)?, mean(recent)?))
}
