//! Exit Survey Analysis - batch entry point.
//!
//! Loads the DETE and TAFE exit surveys, prints the dissatisfaction tables
//! and writes the two bar charts.

use anyhow::Context;
use exit_survey_analysis::charts::StaticChartRenderer;
use exit_survey_analysis::stats::StatsCalculator;
use exit_survey_analysis::{telemetry, SurveyConfig, SurveyPipeline};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let config = SurveyConfig::load().context("loading configuration")?;
    telemetry::init(&config.log_level)?;

    info!("Exit survey analysis starting");
    let pipeline = SurveyPipeline::new(config);
    let report = pipeline.run()?;

    if !report.dropped_columns.is_empty() {
        info!(
            "{} sparse columns dropped after merge",
            report.dropped_columns.len()
        );
    }
    info!(
        "{} unknown dissatisfaction values imputed as false",
        report.imputed_dissatisfied
    );

    let tenure = StatsCalculator::tenure_frame(&report.tenure_rates)?;
    println!("Dissatisfied resignations by service category\n{tenure}");

    let ages = StatsCalculator::age_frame(&report.age_breakdown)?;
    println!("Dissatisfied resignations by age\n{ages}");

    let config = pipeline.config();
    let written = StaticChartRenderer::render_reports(
        &report.tenure_rates,
        &report.age_breakdown,
        &config.output_dir,
        (config.chart.width, config.chart.height),
    )
    .context("rendering charts")?;
    for path in written {
        println!("Chart written to {}", path.display());
    }

    Ok(())
}
