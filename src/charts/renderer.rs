//! Static Chart Renderer
//! Draws the dissatisfaction aggregates as PNG bar charts.
//!
//! Layout:
//! 1. Title centered above the plot
//! 2. One bar per tenure bucket / age bracket, labelled on the x axis
//! 3. Share of dissatisfied resignations on the y axis

use crate::stats::{AgeBreakdown, TenureRate};
use plotters::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const BAR: RGBColor = RGBColor(91, 155, 213);
const GRID: RGBColor = RGBColor(200, 200, 200);

pub const TENURE_CHART_FILE: &str = "dissatisfaction_by_tenure.png";
pub const AGE_CHART_FILE: &str = "dissatisfaction_by_age.png";

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("Failed to prepare chart directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to draw chart: {0}")]
    Render(String),
}

fn render_err<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Render(err.to_string())
}

/// A categorical bar chart: one label and one value per bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub x_desc: String,
    pub y_desc: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl BarChart {
    pub fn tenure(rows: &[TenureRate]) -> Self {
        Self {
            title: "Dissatisfied resignations by length of service".to_string(),
            x_desc: "Service category".to_string(),
            y_desc: "Share dissatisfied".to_string(),
            labels: rows.iter().map(|r| r.bucket.as_str().to_string()).collect(),
            values: rows.iter().map(|r| r.rate).collect(),
        }
    }

    pub fn age(rows: &[AgeBreakdown]) -> Self {
        Self {
            title: "Dissatisfied resignations by age".to_string(),
            x_desc: "Age".to_string(),
            y_desc: "Dissatisfied %".to_string(),
            labels: rows.iter().map(|r| r.age.clone()).collect(),
            values: rows.iter().map(|r| r.dissatisfied_pct).collect(),
        }
    }

    /// Top of the y axis: headroom above the tallest bar, never empty.
    pub fn y_max(&self) -> f64 {
        let max = self
            .values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0_f64, f64::max);
        if max <= 0.0 {
            1.0
        } else {
            max * 1.15
        }
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render both charts into `dir`; empty aggregates are skipped.
    pub fn render_reports(
        tenure: &[TenureRate],
        ages: &[AgeBreakdown],
        dir: &Path,
        size: (u32, u32),
    ) -> Result<Vec<PathBuf>, ChartError> {
        fs::create_dir_all(dir).map_err(|source| ChartError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut written = Vec::new();
        for (chart, file) in [
            (BarChart::tenure(tenure), TENURE_CHART_FILE),
            (BarChart::age(ages), AGE_CHART_FILE),
        ] {
            if chart.labels.is_empty() {
                warn!("skipping '{}': nothing to plot", chart.title);
                continue;
            }
            let path = dir.join(file);
            Self::render_bar_chart(&chart, &path, size)?;
            info!("wrote chart {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    pub fn render_bar_chart(
        chart: &BarChart,
        path: &Path,
        (width, height): (u32, u32),
    ) -> Result<(), ChartError> {
        let root = BitMapBackend::new(path, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let bars = chart.labels.len() as u32;
        let mut ctx = ChartBuilder::on(&root)
            .caption(&chart.title, ("sans-serif", 26))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..bars).into_segmented(), 0f64..chart.y_max())
            .map_err(render_err)?;

        let labels = &chart.labels;
        ctx.configure_mesh()
            .disable_x_mesh()
            .light_line_style(GRID.mix(0.4))
            .x_labels(labels.len())
            .x_label_formatter(&|value| match value {
                SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .y_label_formatter(&|v| format!("{v:.2}"))
            .x_desc(chart.x_desc.as_str())
            .y_desc(chart.y_desc.as_str())
            .draw()
            .map_err(render_err)?;

        ctx.draw_series(chart.values.iter().enumerate().map(|(i, value)| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0.0),
                    (SegmentValue::Exact(i + 1), *value),
                ],
                BAR.filled(),
            );
            bar.set_margin(0, 0, 12, 12);
            bar
        }))
        .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::categories::TenureBucket;

    #[test]
    fn tenure_chart_plots_rates_in_order() {
        let rows = vec![
            TenureRate {
                bucket: TenureBucket::New,
                respondents: 10,
                rate: 0.3,
            },
            TenureRate {
                bucket: TenureBucket::Veteran,
                respondents: 4,
                rate: 0.5,
            },
        ];
        let chart = BarChart::tenure(&rows);
        assert_eq!(chart.labels, vec!["New", "Veteran"]);
        assert_eq!(chart.values, vec![0.3, 0.5]);
    }

    #[test]
    fn age_chart_plots_dissatisfied_share() {
        let rows = vec![AgeBreakdown {
            age: "21-25".to_string(),
            total: 4,
            dissatisfied: 1,
            other_reasons: 3,
            dissatisfied_pct: 0.25,
            other_reasons_pct: 0.75,
        }];
        let chart = BarChart::age(&rows);
        assert_eq!(chart.labels, vec!["21-25"]);
        assert_eq!(chart.values, vec![0.25]);
    }

    #[test]
    fn y_axis_always_has_room() {
        let mut chart = BarChart::tenure(&[]);
        assert_eq!(chart.y_max(), 1.0);
        chart.values = vec![0.2, 0.4];
        assert!(chart.y_max() > 0.4);
    }

    #[test]
    fn empty_aggregates_write_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let out = dir.path().join("charts");
        let written =
            StaticChartRenderer::render_reports(&[], &[], &out, (640, 480)).expect("render");
        assert!(written.is_empty());
        assert!(out.is_dir());
    }
}
