// Trend chart: daily values, rolling trend and peak marker as an SVG file.

use chrono::NaiveDate;
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::model::{CanonicalSeries, SinkError, TopicDescriptor};

const SINK: &str = "chart";
pub const CHART_FILE: &str = "trend_chart.svg";

const SIZE: (u32, u32) = (1000, 600);
const BACKGROUND: RGBColor = RGBColor(21, 32, 43);
const GRID: RGBColor = RGBColor(56, 68, 77);
const AXIS_TEXT: RGBColor = RGBColor(136, 153, 166);
const DAILY: RGBColor = RGBColor(29, 161, 242);
const TREND: RGBColor = RGBColor(255, 215, 0);

/// Everything the renderer needs for one chart.
pub struct ChartRequest<'a> {
    pub series: &'a CanonicalSeries,
    /// Rolling mean aligned with `series`.
    pub rolling: &'a [f64],
    pub peak: (NaiveDate, f64),
    pub topic: &'a TopicDescriptor,
    pub source_name: &'a str,
    pub y_label: &'a str,
    pub decimals: usize,
}

impl ChartRequest<'_> {
    pub fn title(&self) -> String {
        format!("{} Trend: {}", self.source_name, self.topic.display_name)
    }
}

pub trait ChartRenderer: Send + Sync {
    /// Writes the chart and returns its path.
    fn render(&self, request: &ChartRequest<'_>) -> Result<PathBuf, SinkError>;
}

pub struct SvgChartRenderer {
    output_dir: PathBuf,
}

impl SvgChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, request: &ChartRequest<'_>) -> Result<PathBuf, SinkError> {
        info!("🎨 Rendering chart: {}", request.title());
        fs::create_dir_all(&self.output_dir).map_err(|source| SinkError::Io { sink: SINK, source })?;

        let path = self.output_dir.join(CHART_FILE);
        draw(&path, request).map_err(|e| SinkError::Render {
            sink: SINK,
            detail: e.to_string(),
        })?;

        info!("✅ Chart saved to {}", path.display());
        Ok(path)
    }
}

fn y_range(values: &[f64], rolling: &[f64]) -> (f64, f64) {
    let (min, max) = values
        .iter()
        .chain(rolling)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let pad = if max > min { (max - min) * 0.1 } else { 1.0 };
    (min - pad, max + pad)
}

fn draw(path: &Path, req: &ChartRequest<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let points = req.series.points();
    let dates: Vec<NaiveDate> = points.iter().map(|(d, _)| *d).collect();
    let x_max = (points.len().max(2) - 1) as f64;
    let (y_min, y_max) = y_range(&req.series.values(), req.rolling);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&BACKGROUND)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(req.title(), ("sans-serif", 28).into_font().color(&WHITE))
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 80)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(0f64..x_max, y_min..y_max)?;

    let date_label = |x: &f64| {
        dates
            .get(x.round().max(0.0) as usize)
            .map(|d| d.format("%d. %b").to_string())
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc(req.y_label)
        .x_labels(8)
        .y_labels(6)
        .x_label_formatter(&date_label)
        .label_style(("sans-serif", 14).into_font().color(&AXIS_TEXT))
        .axis_style(GRID)
        .bold_line_style(GRID)
        .light_line_style(TRANSPARENT)
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            points.iter().enumerate().map(|(i, (_, v))| (i as f64, *v)),
            DAILY.mix(0.6).stroke_width(2),
        ))?
        .label(format!("Daily {}", req.y_label.to_lowercase()))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], DAILY.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            req.rolling.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            TREND.stroke_width(4),
        ))?
        .label("7-day trend")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], TREND.stroke_width(4)));

    let (peak_date, peak_value) = req.peak;
    if let Some(idx) = dates.iter().position(|d| *d == peak_date) {
        let label = format!("Peak: {:.*}", req.decimals, peak_value);
        chart.draw_series(std::iter::once(
            EmptyElement::at((idx as f64, peak_value))
                + Circle::new((0, 0), 5, TREND.filled())
                + Text::new(label, (10, -20), ("sans-serif", 16).into_font().color(&WHITE)),
        ))?;
    }

    chart
        .configure_series_labels()
        .background_style(BACKGROUND.mix(0.9))
        .border_style(GRID)
        .label_font(("sans-serif", 14).into_font().color(&WHITE))
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::trend::rolling_mean;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn scratch_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        std::env::temp_dir().join(format!("trend-caption-{}-{}-{}", name, std::process::id(), nanos))
    }

    fn series(values: &[f64]) -> CanonicalSeries {
        let start = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        CanonicalSeries::from_points(
            "views",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (start + chrono::Days::new(i as u64), *v)),
        )
        .unwrap()
    }

    #[test]
    fn chart_is_written_with_title_and_peak() {
        let dir = scratch_dir("render");
        let series = series(&[120.0, 340.0, 9800.0, 4100.0, 2200.0, 1500.0, 900.0, 700.0]);
        let rolling = rolling_mean(&series.values(), 7);
        let topic = TopicDescriptor::from_id("Eric_Dane");
        let request = ChartRequest {
            series: &series,
            rolling: &rolling,
            peak: (NaiveDate::from_ymd_opt(2025, 2, 3).unwrap(), 9800.0),
            topic: &topic,
            source_name: "Wikipedia",
            y_label: "Page views",
            decimals: 0,
        };

        let path = SvgChartRenderer::new(&dir).render(&request).unwrap();
        assert_eq!(path, dir.join(CHART_FILE));

        let svg = fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Wikipedia Trend: Eric Dane"));
        assert!(svg.contains("Peak: 9800"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn single_point_series_still_renders() {
        let dir = scratch_dir("single");
        let series = series(&[4.2]);
        let topic = TopicDescriptor::new("DGS10", "DGS10");
        let request = ChartRequest {
            series: &series,
            rolling: &[4.2],
            peak: (series.last_date(), 4.2),
            topic: &topic,
            source_name: "FRED",
            y_label: "Yield (%)",
            decimals: 2,
        };
        assert!(SvgChartRenderer::new(&dir).render(&request).is_ok());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn flat_series_gets_a_non_empty_range() {
        let (lo, hi) = y_range(&[3.0, 3.0], &[3.0]);
        assert!(lo < 3.0 && hi > 3.0);
    }
}
