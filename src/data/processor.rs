//! Data Processor Module
//! Filters each survey to resignations, derives years of service and the
//! dissatisfaction indicator, then merges both surveys and categorises rows.

use crate::config::{AgeConfig, ColumnRange, TenureBoundaries};
use crate::data::answer::Answer;
use crate::data::categories::{normalize_age, TenureBucket};
use crate::data::loader::string_values;
use crate::data::schema::{
    self, SurveySource, AGE, CEASE_DATE, DETE_START_DATE, DISSATISFIED, INSTITUTE,
    INSTITUTE_SERVICE, SEPARATION_TYPE, SERVICE_CAT, SERVICE_YEARS,
};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Separation reason (or its prefix) marking a voluntary resignation.
pub const RESIGNATION: &str = "Resignation";

/// Placeholder for a deliberately unrecorded year.
pub const NOT_STATED: &str = "Not Stated";

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    Schema(#[from] schema::SchemaError),
}

/// Handles data cleaning and transformation operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Rename headers, drop the unused column block and check that every
    /// consumed column exists.
    pub fn normalize_source(
        df: &DataFrame,
        source: SurveySource,
        unused_columns: Option<ColumnRange>,
        sub_reason_fields: &[String],
    ) -> Result<DataFrame, ProcessorError> {
        let mut normalized = schema::normalize_columns(df, source)?;
        if let Some(range) = unused_columns {
            normalized = schema::drop_column_range(&normalized, range)?;
        }
        schema::require_columns(&normalized, source, sub_reason_fields)?;
        debug!(
            source = source.name(),
            columns = normalized.width(),
            "normalized column names"
        );
        Ok(normalized)
    }

    /// Keep only voluntary resignations.
    ///
    /// DETE reasons look like `Resignation-Other employer`; only the part
    /// before the first hyphen is compared and it replaces the full reason.
    /// TAFE reasons must equal `Resignation` exactly.
    pub fn filter_resignations(
        df: &DataFrame,
        source: SurveySource,
    ) -> Result<DataFrame, ProcessorError> {
        let reasons = string_values(df, SEPARATION_TYPE)?;
        let keep: Vec<bool> = reasons
            .iter()
            .map(|reason| match (source, reason.as_deref()) {
                (_, None) => false,
                (SurveySource::Dete, Some(text)) => reason_prefix(text) == RESIGNATION,
                (SurveySource::Tafe, Some(text)) => text == RESIGNATION,
            })
            .collect();

        let mut filtered = filter_rows(df, &keep)?;
        if source == SurveySource::Dete {
            let prefixes: Vec<Option<String>> = string_values(&filtered, SEPARATION_TYPE)?
                .into_iter()
                .map(|reason| reason.map(|text| reason_prefix(&text).to_string()))
                .collect();
            filtered.with_column(Column::new(SEPARATION_TYPE.into(), prefixes))?;
        }

        info!(
            source = source.name(),
            rows_in = df.height(),
            rows_out = filtered.height(),
            "filtered to resignations"
        );
        Ok(filtered)
    }

    /// Reduce DETE cease dates such as `05/2012` to their year text.
    pub fn extract_cease_year(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let years: Vec<Option<String>> = string_values(df, CEASE_DATE)?
            .into_iter()
            .map(|date| date.map(|text| year_text(&text).to_string()))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(CEASE_DATE.into(), years))?;
        Ok(out)
    }

    /// Drop DETE rows whose cease or start year is missing, `Not Stated`,
    /// or not a number.
    pub fn drop_unstated_years(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let cease = string_values(df, CEASE_DATE)?;
        let start = string_values(df, DETE_START_DATE)?;
        let keep: Vec<bool> = cease
            .iter()
            .zip(start.iter())
            .map(|(c, s)| {
                stated_year(c.as_deref()).is_some() && stated_year(s.as_deref()).is_some()
            })
            .collect();

        let filtered = filter_rows(df, &keep)?;
        info!(
            rows_in = df.height(),
            rows_out = filtered.height(),
            "dropped rows with unstated years"
        );
        Ok(filtered)
    }

    /// Add the numeric `service_years` column.
    ///
    /// DETE: cease year minus start year. The raw difference is computed as
    /// `start - cease` and, when `sign_correction` is set, negated to undo
    /// the reversed column order; negative results are left undefined.
    /// TAFE: first run of digits in the pre-computed service text.
    pub fn derive_service_years(
        df: &DataFrame,
        source: SurveySource,
        sign_correction: bool,
    ) -> Result<DataFrame, ProcessorError> {
        let years: Vec<Option<f64>> = match source {
            SurveySource::Dete => {
                let cease = string_values(df, CEASE_DATE)?;
                let start = string_values(df, DETE_START_DATE)?;
                cease
                    .iter()
                    .zip(start.iter())
                    .map(|(c, s)| {
                        let raw = stated_year(s.as_deref())? - stated_year(c.as_deref())?;
                        let corrected = if sign_correction { -raw } else { raw };
                        Some(corrected).filter(|y| *y >= 0.0)
                    })
                    .collect()
            }
            SurveySource::Tafe => string_values(df, INSTITUTE_SERVICE)?
                .iter()
                .map(|text| text.as_deref().and_then(first_number))
                .collect(),
        };

        let undefined = years.iter().filter(|y| y.is_none()).count();
        debug!(
            source = source.name(),
            undefined, "derived years of service"
        );

        let mut out = df.clone();
        out.with_column(Column::new(SERVICE_YEARS.into(), years))?;
        Ok(out)
    }

    /// Add the tri-state `dissatisfied` column as the OR of `fields`.
    pub fn derive_dissatisfaction(
        df: &DataFrame,
        source: SurveySource,
        fields: &[String],
    ) -> Result<DataFrame, ProcessorError> {
        let parse: fn(Option<&str>) -> Answer = match source {
            SurveySource::Dete => Answer::from_flag,
            SurveySource::Tafe => Answer::from_marker,
        };

        let mut answers: Vec<Vec<Answer>> = vec![Vec::with_capacity(fields.len()); df.height()];
        for field in fields {
            for (row, value) in string_values(df, field)?.iter().enumerate() {
                answers[row].push(parse(value.as_deref()));
            }
        }

        let dissatisfied: Vec<Option<bool>> = answers
            .into_iter()
            .map(|row| Answer::any(row).to_option())
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(DISSATISFIED.into(), dissatisfied))?;
        Ok(out)
    }

    /// Add the provenance column.
    pub fn tag_institute(df: &DataFrame, label: &str) -> Result<DataFrame, ProcessorError> {
        let mut out = df.clone();
        out.with_column(Column::new(INSTITUTE.into(), vec![label; df.height()]))?;
        Ok(out)
    }

    /// Union-by-name concatenation; columns missing from one side are null there.
    pub fn combine(frames: &[DataFrame]) -> Result<DataFrame, ProcessorError> {
        let lazy: Vec<LazyFrame> = frames.iter().map(|df| df.clone().lazy()).collect();
        let combined = concat_lf_diagonal(lazy, UnionArgs::default())?.collect()?;
        info!(
            rows = combined.height(),
            columns = combined.width(),
            "combined surveys"
        );
        Ok(combined)
    }

    /// Drop columns with fewer than `threshold` non-missing values.
    /// Returns the reduced frame and the names of the dropped columns.
    pub fn drop_sparse_columns(
        df: &DataFrame,
        threshold: usize,
    ) -> Result<(DataFrame, Vec<String>), ProcessorError> {
        let height = df.height();
        let (keep, dropped): (Vec<&Column>, Vec<&Column>) = df
            .get_columns()
            .iter()
            .partition(|col| height - col.null_count() >= threshold);

        let kept: Vec<String> = keep.iter().map(|col| col.name().to_string()).collect();
        let dropped: Vec<String> = dropped.iter().map(|col| col.name().to_string()).collect();

        if !dropped.is_empty() {
            info!(
                threshold,
                count = dropped.len(),
                "dropped sparse columns: {}",
                dropped.join(", ")
            );
        }
        Ok((df.select(kept)?, dropped))
    }

    /// Add `service_cat` from `service_years`.
    pub fn assign_service_category(
        df: &DataFrame,
        bounds: &TenureBoundaries,
    ) -> Result<DataFrame, ProcessorError> {
        let years = optional_f64_values(df, SERVICE_YEARS)?;
        let categories: Vec<Option<&str>> = years
            .into_iter()
            .map(|y| TenureBucket::from_years(y, bounds).map(|b| b.as_str()))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(SERVICE_CAT.into(), categories))?;
        Ok(out)
    }

    /// Rewrite `age` into consistent brackets.
    pub fn normalize_age_column(df: &DataFrame, rule: &AgeConfig) -> Result<DataFrame, ProcessorError> {
        if df.column(AGE).is_err() {
            warn!("no '{AGE}' column left to normalize");
            return Ok(df.clone());
        }

        let ages: Vec<Option<String>> = string_values(df, AGE)?
            .into_iter()
            .map(|age| age.map(|text| normalize_age(&text, rule)))
            .collect();

        let mut out = df.clone();
        out.with_column(Column::new(AGE.into(), ages))?;
        Ok(out)
    }

    /// Replace unknown dissatisfaction with `false`, the most frequent
    /// observed value. Returns the frame and how many values were imputed.
    pub fn impute_dissatisfied(df: &DataFrame) -> Result<(DataFrame, usize), ProcessorError> {
        if df.column(DISSATISFIED).is_err() {
            warn!("no '{DISSATISFIED}' column left to impute");
            return Ok((df.clone(), 0));
        }

        let values: Vec<Answer> = df
            .column(DISSATISFIED)?
            .bool()?
            .into_iter()
            .map(Answer::from)
            .collect();

        let yes = values.iter().filter(|a| **a == Answer::Yes).count();
        let no = values.iter().filter(|a| **a == Answer::No).count();
        let unknown = values.len() - yes - no;
        info!(yes, no, unknown, "dissatisfaction before imputation");

        let filled: Vec<bool> = values.iter().map(|a| *a == Answer::Yes).collect();
        let mut out = df.clone();
        out.with_column(Column::new(DISSATISFIED.into(), filled))?;
        Ok((out, unknown))
    }
}

fn filter_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    df.filter(&mask)
}

fn optional_f64_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<f64>>> {
    match df.column(column) {
        Ok(col) => Ok(col.cast(&DataType::Float64)?.f64()?.into_iter().collect()),
        Err(_) => {
            warn!("no '{column}' column; every value treated as undefined");
            Ok(vec![None; df.height()])
        }
    }
}

/// Text before the first hyphen.
fn reason_prefix(reason: &str) -> &str {
    reason.split('-').next().unwrap_or(reason)
}

/// Text after the last slash (`05/2012` -> `2012`).
fn year_text(date: &str) -> &str {
    date.rsplit('/').next().unwrap_or(date).trim()
}

fn stated_year(text: Option<&str>) -> Option<f64> {
    let text = text?.trim();
    if text.is_empty() || text.contains(NOT_STATED) {
        return None;
    }
    text.parse::<f64>().ok().filter(|y| y.is_finite())
}

/// First run of ASCII digits as a number (`"Less than 1 year"` -> 1).
fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_frame(columns: &[(&str, Vec<Option<&str>>)]) -> DataFrame {
        let columns = columns
            .iter()
            .map(|(name, values)| Column::new((*name).into(), values.clone()))
            .collect();
        DataFrame::new(columns).expect("valid frame")
    }

    fn texts(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        string_values(df, column).expect("text column")
    }

    fn bools(df: &DataFrame, column: &str) -> Vec<Option<bool>> {
        df.column(column)
            .expect("column")
            .bool()
            .expect("bool column")
            .into_iter()
            .collect()
    }

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        optional_f64_values(df, column).expect("float column")
    }

    #[test]
    fn dete_filter_keeps_every_resignation_subtype() {
        let df = text_frame(&[(
            SEPARATION_TYPE,
            vec![
                Some("Resignation-Other reasons"),
                Some("Resignation-Other employer"),
                Some("Resignation-Move overseas/interstate"),
                Some("Age Retirement"),
                Some("resignation-Other reasons"),
                None,
            ],
        )]);

        let out = DataProcessor::filter_resignations(&df, SurveySource::Dete).expect("filter");
        assert_eq!(out.height(), 3);
        assert!(texts(&out, SEPARATION_TYPE)
            .iter()
            .all(|r| r.as_deref() == Some(RESIGNATION)));
    }

    #[test]
    fn tafe_filter_requires_exact_match() {
        let df = text_frame(&[(
            SEPARATION_TYPE,
            vec![
                Some("Resignation"),
                Some("Resignation-Other"),
                Some("Contract Expired"),
                Some("Resignation"),
            ],
        )]);

        let out = DataProcessor::filter_resignations(&df, SurveySource::Tafe).expect("filter");
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn cease_year_keeps_text_after_last_slash() {
        let df = text_frame(&[(
            CEASE_DATE,
            vec![Some("05/2012"), Some("2013"), Some("Not Stated"), None],
        )]);
        let out = DataProcessor::extract_cease_year(&df).expect("extract");
        assert_eq!(
            texts(&out, CEASE_DATE),
            vec![
                Some("2012".to_string()),
                Some("2013".to_string()),
                Some("Not Stated".to_string()),
                None
            ]
        );
    }

    #[test]
    fn unstated_or_missing_years_are_dropped() {
        let df = text_frame(&[
            (
                CEASE_DATE,
                vec![Some("2012"), Some("Not Stated"), Some("2012"), Some("2012")],
            ),
            (
                DETE_START_DATE,
                vec![Some("2000"), Some("2000"), Some("Not Stated"), None],
            ),
        ]);
        let out = DataProcessor::drop_unstated_years(&df).expect("drop");
        assert_eq!(out.height(), 1);
        assert!(texts(&out, CEASE_DATE)
            .iter()
            .chain(texts(&out, DETE_START_DATE).iter())
            .all(|v| v.as_deref() != Some(NOT_STATED)));
    }

    #[test]
    fn dete_service_years_are_cease_minus_start() {
        let df = text_frame(&[
            (CEASE_DATE, vec![Some("2010"), Some("2012"), Some("2008")]),
            (DETE_START_DATE, vec![Some("2005"), Some("2012"), Some("2010")]),
        ]);
        let out = DataProcessor::derive_service_years(&df, SurveySource::Dete, true)
            .expect("derive");
        assert_eq!(floats(&out, SERVICE_YEARS), vec![Some(5.0), Some(0.0), None]);
    }

    #[test]
    fn disabling_sign_correction_keeps_raw_difference() {
        let df = text_frame(&[
            (CEASE_DATE, vec![Some("2005")]),
            (DETE_START_DATE, vec![Some("2010")]),
        ]);
        let out = DataProcessor::derive_service_years(&df, SurveySource::Dete, false)
            .expect("derive");
        assert_eq!(floats(&out, SERVICE_YEARS), vec![Some(5.0)]);
    }

    #[test]
    fn tafe_service_years_take_first_digit_run() {
        let df = text_frame(&[(
            INSTITUTE_SERVICE,
            vec![
                Some("7 years"),
                Some("Less than 1 year"),
                Some("3-4"),
                Some("More than 20 years"),
                Some("unknown"),
                None,
            ],
        )]);
        let out = DataProcessor::derive_service_years(&df, SurveySource::Tafe, true)
            .expect("derive");
        assert_eq!(
            floats(&out, SERVICE_YEARS),
            vec![Some(7.0), Some(1.0), Some(3.0), Some(20.0), None, None]
        );
    }

    #[test]
    fn dete_dissatisfaction_is_or_of_flags() {
        let df = text_frame(&[
            ("a", vec![Some("False"), Some("False"), None, Some("False")]),
            ("b", vec![Some("True"), Some("False"), None, None]),
        ]);
        let fields = vec!["a".to_string(), "b".to_string()];
        let out = DataProcessor::derive_dissatisfaction(&df, SurveySource::Dete, &fields)
            .expect("derive");
        assert_eq!(
            bools(&out, DISSATISFIED),
            vec![Some(true), Some(false), None, Some(false)]
        );
    }

    #[test]
    fn tafe_dissatisfaction_uses_dash_markers() {
        let df = text_frame(&[
            (
                "factors_diss",
                vec![Some("-"), Some("Contributing Factors. Dissatisfaction"), None],
            ),
            ("factors_job_diss", vec![Some("-"), Some("-"), None]),
        ]);
        let fields = vec!["factors_diss".to_string(), "factors_job_diss".to_string()];
        let out = DataProcessor::derive_dissatisfaction(&df, SurveySource::Tafe, &fields)
            .expect("derive");
        assert_eq!(
            bools(&out, DISSATISFIED),
            vec![Some(false), Some(true), None]
        );
    }

    #[test]
    fn combine_unions_columns_by_name() {
        let dete = text_frame(&[("id", vec![Some("1")]), ("only_dete", vec![Some("x")])]);
        let tafe = text_frame(&[("id", vec![Some("2"), Some("3")])]);
        let dete = DataProcessor::tag_institute(&dete, "DETE").expect("tag");
        let tafe = DataProcessor::tag_institute(&tafe, "TAFE").expect("tag");

        let combined = DataProcessor::combine(&[dete, tafe]).expect("combine");
        assert_eq!(combined.height(), 3);
        assert_eq!(
            texts(&combined, "only_dete"),
            vec![Some("x".to_string()), None, None]
        );
        assert_eq!(
            texts(&combined, INSTITUTE),
            vec![
                Some("DETE".to_string()),
                Some("TAFE".to_string()),
                Some("TAFE".to_string())
            ]
        );
    }

    #[test]
    fn sparse_column_threshold_is_inclusive() {
        let height = 600;
        let column = |present: usize| -> Vec<Option<&'static str>> {
            (0..height)
                .map(|i| if i < present { Some("v") } else { None })
                .collect()
        };
        let df = text_frame(&[
            ("just_below", column(499)),
            ("exactly", column(500)),
            ("full", column(600)),
        ]);

        let (out, dropped) = DataProcessor::drop_sparse_columns(&df, 500).expect("drop");
        assert_eq!(dropped, vec!["just_below".to_string()]);
        assert!(out.column("exactly").is_ok());
        assert!(out.column("full").is_ok());
        assert!(out.column("just_below").is_err());
    }

    #[test]
    fn service_category_follows_years() {
        let df = DataFrame::new(vec![Column::new(
            SERVICE_YEARS.into(),
            vec![Some(0.0), Some(6.999), Some(7.0), Some(11.0), None],
        )])
        .expect("frame");
        let out = DataProcessor::assign_service_category(&df, &TenureBoundaries::default())
            .expect("categorise");
        assert_eq!(
            texts(&out, SERVICE_CAT),
            vec![
                Some("New".to_string()),
                Some("Experienced".to_string()),
                Some("Established".to_string()),
                Some("Veteran".to_string()),
                None
            ]
        );
    }

    #[test]
    fn service_category_is_undefined_without_years_column() {
        let df = text_frame(&[("id", vec![Some("1"), Some("2")])]);
        let out = DataProcessor::assign_service_category(&df, &TenureBoundaries::default())
            .expect("categorise");
        assert_eq!(texts(&out, SERVICE_CAT), vec![None, None]);
    }

    #[test]
    fn age_column_is_normalized() {
        let df = text_frame(&[(AGE, vec![Some("41  45"), Some("61 or older"), Some("56-60"), None])]);
        let out = DataProcessor::normalize_age_column(&df, &AgeConfig::default()).expect("ages");
        assert_eq!(
            texts(&out, AGE),
            vec![
                Some("41-45".to_string()),
                Some("56 or older".to_string()),
                Some("56 or older".to_string()),
                None
            ]
        );
    }

    #[test]
    fn imputation_fills_unknown_with_false() {
        let df = DataFrame::new(vec![Column::new(
            DISSATISFIED.into(),
            vec![Some(true), None, Some(false), None],
        )])
        .expect("frame");
        let (out, imputed) = DataProcessor::impute_dissatisfied(&df).expect("impute");
        assert_eq!(imputed, 2);
        assert_eq!(
            bools(&out, DISSATISFIED),
            vec![Some(true), Some(false), Some(false), Some(false)]
        );
        assert_eq!(out.column(DISSATISFIED).expect("column").null_count(), 0);
    }

    #[test]
    fn first_number_handles_text_around_digits() {
        assert_eq!(first_number("11-20"), Some(11.0));
        assert_eq!(first_number("n/a"), None);
        assert_eq!(first_number(""), None);
    }
}
