use crate::model::CanonicalSeries;
use std::collections::BTreeMap;

/// Aligned points required before a coefficient is reported.
pub const MIN_OVERLAP: usize = 2;
pub const STRONG_CORRELATION: f64 = 0.7;
pub const WEAK_CORRELATION: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    Coefficient { r: f64, overlap: usize },
    InsufficientOverlap { overlap: usize },
    ZeroVariance { overlap: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationClass {
    Strong(Direction),
    Weak(Direction),
    NoRelationship,
}

impl CorrelationClass {
    pub fn of(r: f64) -> Self {
        let direction = if r < 0.0 {
            Direction::Negative
        } else {
            Direction::Positive
        };
        let magnitude = r.abs();
        if magnitude > STRONG_CORRELATION {
            CorrelationClass::Strong(direction)
        } else if magnitude > WEAK_CORRELATION {
            CorrelationClass::Weak(direction)
        } else {
            CorrelationClass::NoRelationship
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CorrelationClass::Strong(Direction::Positive) => "strong positive",
            CorrelationClass::Strong(Direction::Negative) => "strong negative",
            CorrelationClass::Weak(Direction::Positive) => "weak positive",
            CorrelationClass::Weak(Direction::Negative) => "weak negative",
            CorrelationClass::NoRelationship => "no relationship",
        }
    }
}

impl Correlation {
    pub fn coefficient(&self) -> Option<f64> {
        match self {
            Correlation::Coefficient { r, .. } => Some(*r),
            _ => None,
        }
    }

    pub fn class(&self) -> Option<CorrelationClass> {
        self.coefficient().map(CorrelationClass::of)
    }
}

/// Value pairs for the dates present in both series.
pub fn align(a: &CanonicalSeries, b: &CanonicalSeries) -> Vec<(f64, f64)> {
    let other: BTreeMap<_, _> = b.points().iter().copied().collect();
    a.points()
        .iter()
        .filter_map(|(date, x)| other.get(date).map(|y| (*x, *y)))
        .collect()
}

/// Calculates the Pearson correlation coefficient between two slices.
/// Returns None if slices have different lengths, are empty or have no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;
    let numerator: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - mean_x) * (yi - mean_y))
        .sum();
    let denominator_x: f64 = x.iter().map(|xi| (xi - mean_x).powi(2)).sum();
    let denominator_y: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();
    let denominator = (denominator_x * denominator_y).sqrt();
    if denominator == 0.0 {
        None
    } else {
        Some((numerator / denominator).clamp(-1.0, 1.0))
    }
}

pub fn correlate(a: &CanonicalSeries, b: &CanonicalSeries) -> Correlation {
    let pairs = align(a, b);
    let overlap = pairs.len();
    if overlap < MIN_OVERLAP {
        return Correlation::InsufficientOverlap { overlap };
    }
    let (x, y): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
    match pearson(&x, &y) {
        Some(r) => Correlation::Coefficient { r, overlap },
        None => Correlation::ZeroVariance { overlap },
    }
}
