//! End-to-end run: load both surveys, clean, merge, aggregate.

use crate::config::{SourceConfig, SurveyConfig};
use crate::data::loader::{profile_nulls, value_counts, DataLoader, LoaderError, SourceLocation};
use crate::data::processor::{DataProcessor, ProcessorError};
use crate::data::schema::{SurveySource, SEPARATION_TYPE};
use crate::stats::{AgeBreakdown, StatsCalculator, StatsError, TenureRate};
use polars::prelude::DataFrame;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to load the {source_name} survey: {error}")]
    Load {
        source_name: SurveySource,
        #[source]
        error: LoaderError,
    },
    #[error("Failed to clean the {source_name} survey: {error}")]
    Clean {
        source_name: SurveySource,
        #[source]
        error: ProcessorError,
    },
    #[error("Failed to merge surveys: {0}")]
    Merge(#[from] ProcessorError),
    #[error("Failed to aggregate: {0}")]
    Stats(#[from] StatsError),
}

/// Everything the analysis produces.
#[derive(Debug, Clone)]
pub struct SurveyReport {
    /// Merged, categorised and imputed resignations from both surveys.
    pub combined: DataFrame,
    pub dropped_columns: Vec<String>,
    pub imputed_dissatisfied: usize,
    pub tenure_rates: Vec<TenureRate>,
    pub age_breakdown: Vec<AgeBreakdown>,
}

pub struct SurveyPipeline {
    config: SurveyConfig,
}

impl SurveyPipeline {
    pub fn new(config: SurveyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    /// Load both sources and run the analysis. A failed load aborts and
    /// names the source.
    pub fn run(&self) -> Result<SurveyReport, PipelineError> {
        let dete = Self::load(SurveySource::Dete, &self.config.dete)?;
        let tafe = Self::load(SurveySource::Tafe, &self.config.tafe)?;
        self.process(&dete, &tafe)
    }

    fn load(source: SurveySource, settings: &SourceConfig) -> Result<DataFrame, PipelineError> {
        let location = SourceLocation::parse(&settings.location);
        let df = DataLoader::load_csv(&location).map_err(|error| PipelineError::Load {
            source_name: source,
            error,
        })?;

        for (column, nulls) in profile_nulls(&df) {
            debug!(source = source.name(), nulls, "column '{column}'");
        }
        Ok(df)
    }

    /// Analyse two raw tables already in memory.
    pub fn process(
        &self,
        dete_raw: &DataFrame,
        tafe_raw: &DataFrame,
    ) -> Result<SurveyReport, PipelineError> {
        let dete = self
            .clean_dete(dete_raw)
            .map_err(|error| PipelineError::Clean {
                source_name: SurveySource::Dete,
                error,
            })?;
        let tafe = self
            .clean_tafe(tafe_raw)
            .map_err(|error| PipelineError::Clean {
                source_name: SurveySource::Tafe,
                error,
            })?;

        let combined = DataProcessor::combine(&[dete, tafe])?;
        let (combined, dropped_columns) =
            DataProcessor::drop_sparse_columns(&combined, self.config.column_drop_threshold)?;
        let combined =
            DataProcessor::assign_service_category(&combined, &self.config.tenure_boundaries)?;
        let combined = DataProcessor::normalize_age_column(&combined, &self.config.age)?;
        let (combined, imputed_dissatisfied) = DataProcessor::impute_dissatisfied(&combined)?;

        let tenure_rates = StatsCalculator::tenure_dissatisfaction(&combined)?;
        let age_breakdown = StatsCalculator::age_breakdown(&combined)?;
        info!(
            rows = combined.height(),
            tenure_groups = tenure_rates.len(),
            age_groups = age_breakdown.len(),
            "analysis complete"
        );

        Ok(SurveyReport {
            combined,
            dropped_columns,
            imputed_dissatisfied,
            tenure_rates,
            age_breakdown,
        })
    }

    fn clean_dete(&self, raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let settings = &self.config.dete;
        let source = SurveySource::Dete;

        let df = DataProcessor::normalize_source(
            raw,
            source,
            settings.unused_columns,
            &settings.sub_reason_fields,
        )?;
        Self::log_reasons(&df, source);
        let df = DataProcessor::filter_resignations(&df, source)?;
        let df = DataProcessor::extract_cease_year(&df)?;
        let df = DataProcessor::drop_unstated_years(&df)?;
        let df = DataProcessor::derive_service_years(
            &df,
            source,
            self.config.dete_tenure_sign_correction,
        )?;
        let df = DataProcessor::derive_dissatisfaction(&df, source, &settings.sub_reason_fields)?;
        DataProcessor::tag_institute(&df, &settings.label)
    }

    fn clean_tafe(&self, raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let settings = &self.config.tafe;
        let source = SurveySource::Tafe;

        let df = DataProcessor::normalize_source(
            raw,
            source,
            settings.unused_columns,
            &settings.sub_reason_fields,
        )?;
        Self::log_reasons(&df, source);
        let df = DataProcessor::filter_resignations(&df, source)?;
        let df = DataProcessor::derive_service_years(&df, source, false)?;
        let df = DataProcessor::derive_dissatisfaction(&df, source, &settings.sub_reason_fields)?;
        DataProcessor::tag_institute(&df, &settings.label)
    }

    fn log_reasons(df: &DataFrame, source: SurveySource) {
        if let Ok(counts) = value_counts(df, SEPARATION_TYPE) {
            for (reason, count) in counts {
                debug!(
                    source = source.name(),
                    count,
                    "separation type {:?}",
                    reason.as_deref().unwrap_or("<missing>")
                );
            }
        }
    }
}
