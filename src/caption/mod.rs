// Caption generator: statistics and context in, post text out. No I/O.

pub mod hashtags;

use crate::analyzer::{
    ChangeClass, ChangeKind, Correlation, CorrelationClass, TrendReport,
};
use crate::model::TopicDescriptor;
use crate::sources::Source;
use std::fmt;

pub const DOMAIN_HASHTAG: &str = "#Trend";
const CALL_TO_ACTION: &str = "What do you make of this development?";

/// Source-specific parts of a caption.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionStyle {
    pub opener: &'static str,
    pub hashtag: &'static str,
    pub decimals: usize,
    /// Unit appended to absolute changes, e.g. `°C`.
    pub unit: Option<&'static str>,
}

impl CaptionStyle {
    pub fn for_source(source: &dyn Source) -> Self {
        Self {
            opener: source.caption_opener(),
            hashtag: source.hashtag_suffix(),
            decimals: source.value_decimals(),
            unit: source.unit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    text: String,
}

impl Caption {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Caption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Builds the post text.
///
/// Sections, in order: opener and topic, context summary (optional),
/// external narrative (optional), trend insight, call to action, hashtags.
/// `compared_with` names the second source when the report carries a
/// correlation.
pub fn compose(
    topic: &TopicDescriptor,
    report: &TrendReport,
    external_context: Option<&str>,
    style: &CaptionStyle,
    compared_with: Option<&str>,
) -> Caption {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!("{}\n\nTopic: {}", style.opener, topic.display_name));

    if let Some(summary) = non_empty(topic.context_summary.as_deref()) {
        sections.push(format!("ℹ️ {}", summary));
    }
    if let Some(narrative) = non_empty(external_context) {
        sections.push(narrative.to_string());
    }

    let mut insight = trend_insight(report, style);
    if let Some(latest) = latest_line(report, style) {
        insight.push('\n');
        insight.push_str(&latest);
    }
    if let (Some(correlation), Some(other)) = (&report.correlation, compared_with) {
        insight.push('\n');
        insight.push_str(&correlation_line(correlation, other));
    }
    sections.push(insight);

    sections.push(CALL_TO_ACTION.to_string());
    sections.push(hashtags::hashtag_line(
        &topic.display_name,
        style.hashtag,
        DOMAIN_HASHTAG,
    ));

    Caption {
        text: sections.join("\n\n"),
    }
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// One sentence describing the week-over-week change.
pub fn trend_insight(report: &TrendReport, style: &CaptionStyle) -> String {
    let change = report.change();
    let Some(measured) = change.measured() else {
        return "📊 Here is how the numbers developed recently.".to_string();
    };
    let magnitude = measured.change.abs();

    match measured.kind {
        ChangeKind::Relative => match measured.class() {
            ChangeClass::StrongIncrease => format!(
                "📈 Strong increase! The last 7 days averaged {:.1}% more than the week before.",
                magnitude
            ),
            ChangeClass::SlightIncrease => format!(
                "↗️ Slight increase: up {:.1}% compared to the previous week.",
                magnitude
            ),
            ChangeClass::Unchanged => "➡️ Unchanged compared to the previous week.".to_string(),
            ChangeClass::SlightDecline => format!(
                "↘️ Slight decline: down {:.1}% compared to the previous week.",
                magnitude
            ),
            ChangeClass::StrongDecline => format!(
                "📉 Strong decline! The last 7 days averaged {:.1}% less than the week before.",
                magnitude
            ),
        },
        ChangeKind::Absolute => {
            let amount = with_unit(format!("{:.1}", magnitude), style.unit);
            match measured.class() {
                ChangeClass::StrongIncrease => format!(
                    "🔥 Much higher: the last 7 days averaged {} more than the week before.",
                    amount
                ),
                ChangeClass::SlightIncrease => {
                    format!("↗️ Slightly higher: up {} compared to the previous week.", amount)
                }
                ChangeClass::Unchanged => "➡️ Unchanged compared to the previous week.".to_string(),
                ChangeClass::SlightDecline => {
                    format!("↘️ Slightly lower: down {} compared to the previous week.", amount)
                }
                ChangeClass::StrongDecline => format!(
                    "❄️ Much lower: the last 7 days averaged {} less than the week before.",
                    amount
                ),
            }
        }
    }
}

fn latest_line(report: &TrendReport, style: &CaptionStyle) -> Option<String> {
    let delta = report.week_delta()?;
    let sign = if delta < 0.0 { "-" } else { "+" };
    Some(format!(
        "Latest: {} ({}{} vs. 7 days earlier)",
        with_unit(format_value(report.latest_value, style.decimals), style.unit),
        sign,
        with_unit(format_value(delta.abs(), style.decimals), style.unit),
    ))
}

fn correlation_line(correlation: &Correlation, other: &str) -> String {
    match correlation {
        Correlation::Coefficient { r, .. } => format!(
            "🔗 Correlation with {}: r = {:.2} ({}).",
            other,
            r,
            CorrelationClass::of(*r).label()
        ),
        Correlation::InsufficientOverlap { .. } => {
            format!("🔗 Not enough overlapping data to correlate with {}.", other)
        }
        Correlation::ZeroVariance { .. } => {
            format!("🔗 No correlation with {}: one of the series stayed flat.", other)
        }
    }
}

fn format_value(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

fn with_unit(amount: String, unit: Option<&str>) -> String {
    match unit {
        Some(unit) => format!("{} {}", amount, unit),
        None => amount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{Analyzer, TrendAnalyzer};
    use crate::model::CanonicalSeries;
    use chrono::{Days, NaiveDate};

    fn series(values: &[f64]) -> CanonicalSeries {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        CanonicalSeries::from_points(
            "views",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + Days::new(i as u64), *v)),
        )
        .unwrap()
    }

    fn style() -> CaptionStyle {
        CaptionStyle {
            opener: "🔍 The daily Wikipedia trend!",
            hashtag: "#Wikipedia",
            decimals: 0,
            unit: None,
        }
    }

    fn doubling_week() -> Vec<f64> {
        let mut values = vec![100.0; 7];
        values.extend(vec![150.0; 7]);
        values
    }

    #[test]
    fn full_caption_has_sections_in_order() {
        let report = TrendAnalyzer::new().analyze(&series(&doubling_week()), ChangeKind::Relative, None);
        let topic = TopicDescriptor::from_id("Eric_Dane")
            .with_summary(Some("American actor.".into()));

        let caption = compose(&topic, &report, Some("🎬 New series announced."), &style(), None);
        let text = caption.as_str();

        let order = [
            "🔍 The daily Wikipedia trend!",
            "Topic: Eric Dane",
            "ℹ️ American actor.",
            "🎬 New series announced.",
            "📈 Strong increase! The last 7 days averaged 50.0% more",
            "Latest: 150 (+50 vs. 7 days earlier)",
            CALL_TO_ACTION,
            "#Eric #Dane #Wikipedia #Trend",
        ];
        let mut cursor = 0;
        for part in order {
            let found = text[cursor..]
                .find(part)
                .unwrap_or_else(|| panic!("missing or out of order: {part}\n{text}"));
            cursor += found + part.len();
        }
        assert!(text.ends_with("#Eric #Dane #Wikipedia #Trend"));
    }

    #[test]
    fn optional_sections_are_omitted_when_empty() {
        let report = TrendAnalyzer::new().analyze(&series(&[1.0, 2.0]), ChangeKind::Relative, None);
        let topic = TopicDescriptor::from_id("Topic");

        let caption = compose(&topic, &report, Some("   "), &style(), None);
        let sections: Vec<&str> = caption.as_str().split("\n\n").collect();

        assert_eq!(sections.len(), 5);
        assert_eq!(sections[1], "Topic: Topic");
        assert_eq!(sections[2], "📊 Here is how the numbers developed recently.");
        assert!(!caption.as_str().contains('%'));
    }

    #[test]
    fn insufficient_data_never_shows_a_number() {
        let report = TrendAnalyzer::new().analyze(&series(&[5.0; 13]), ChangeKind::Relative, None);
        let insight = trend_insight(&report, &style());
        assert!(!insight.chars().any(|c| c.is_ascii_digit()));
    }

    #[test]
    fn absolute_changes_mention_the_unit() {
        let mut temps = vec![-1.0; 7];
        temps.extend(vec![1.5; 7]);
        let report = TrendAnalyzer::new().analyze(&series(&temps), ChangeKind::Absolute, None);
        let style = CaptionStyle {
            opener: "🌦️ Weather watch!",
            hashtag: "#Weather",
            decimals: 1,
            unit: Some("°C"),
        };
        let insight = trend_insight(&report, &style);
        assert!(insight.starts_with("🔥 Much higher"), "{insight}");
        assert!(insight.contains("2.5 °C"));
        assert!(!insight.contains('%'));
    }

    #[test]
    fn declines_are_reported_as_positive_magnitudes() {
        let mut values = vec![100.0; 7];
        values.extend(vec![90.0; 7]);
        let report = TrendAnalyzer::new().analyze(&series(&values), ChangeKind::Relative, None);
        let insight = trend_insight(&report, &style());
        assert_eq!(insight, "↘️ Slight decline: down 10.0% compared to the previous week.");
    }

    #[test]
    fn correlation_sentence_is_added_for_comparisons() {
        let a = series(&doubling_week());
        let report = TrendAnalyzer::new().analyze(&a, ChangeKind::Relative, Some(&a));
        let caption = compose(
            &TopicDescriptor::new("bitcoin", "Bitcoin"),
            &report,
            None,
            &style(),
            Some("FRED"),
        );
        assert!(caption
            .as_str()
            .contains("🔗 Correlation with FRED: r = 1.00 (strong positive)."));

        let flat = series(&[3.0; 14]);
        let report = TrendAnalyzer::new().analyze(&a, ChangeKind::Relative, Some(&flat));
        let caption = compose(&TopicDescriptor::new("x", "X"), &report, None, &style(), Some("FRED"));
        assert!(caption.as_str().contains("stayed flat"));

        let single = series(&[3.0]);
        let report = TrendAnalyzer::new().analyze(&a, ChangeKind::Relative, Some(&single));
        let caption = compose(&TopicDescriptor::new("x", "X"), &report, None, &style(), Some("FRED"));
        assert!(caption.as_str().contains("Not enough overlapping data"));
    }

    #[test]
    fn composing_is_deterministic() {
        let report = TrendAnalyzer::new().analyze(&series(&doubling_week()), ChangeKind::Relative, None);
        let topic = TopicDescriptor::new("EUR/USD", "EUR USD");
        let first = compose(&topic, &report, None, &style(), None);
        let second = compose(&topic, &report, None, &style(), None);
        assert_eq!(first, second);
        assert!(first.as_str().contains("#EUR #USD"));
    }
}
