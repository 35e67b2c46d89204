//! Column Normalization Module
//! Maps each source's raw headers onto the canonical snake_case names used by
//! every later stage.

use crate::config::ColumnRange;
use polars::prelude::*;
use std::fmt;
use thiserror::Error;

pub const ID: &str = "id";
pub const SEPARATION_TYPE: &str = "separation_type";
pub const CEASE_DATE: &str = "cease_date";
pub const DETE_START_DATE: &str = "dete_start_date";
pub const INSTITUTE_SERVICE: &str = "institute_service";
pub const AGE: &str = "age";

// Derived columns
pub const SERVICE_YEARS: &str = "service_years";
pub const DISSATISFIED: &str = "dissatisfied";
pub const INSTITUTE: &str = "institute";
pub const SERVICE_CAT: &str = "service_cat";

/// Applied after the mechanical header rule.
const DETE_RENAMES: &[(&str, &str)] = &[("separationtype", SEPARATION_TYPE)];

/// TAFE headers are long descriptive labels; only these are renamed.
const TAFE_RENAMES: &[(&str, &str)] = &[
    ("Record ID", ID),
    ("CESSATION YEAR", CEASE_DATE),
    ("Reason for ceasing employment", SEPARATION_TYPE),
    ("Gender. What is your Gender?", "gender"),
    ("CurrentAge. Current Age", AGE),
    ("Employment Type. Employment Type", "employment_status"),
    ("Classification. Classification", "position"),
    (
        "LengthofServiceOverall. Overall Length of Service at Institute (in years)",
        INSTITUTE_SERVICE,
    ),
    (
        "LengthofServiceCurrent. Length of Service at current workplace (in years)",
        "role_service",
    ),
    ("Contributing Factors. Dissatisfaction", "factors_diss"),
    ("Contributing Factors. Job Dissatisfaction", "factors_job_diss"),
];

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("{source_name} survey is missing required column(s): {}", .columns.join(", "))]
    MissingColumns {
        source_name: SurveySource,
        columns: Vec<String>,
    },
}

/// The two exit surveys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurveySource {
    /// Department of Education, Training and Employment.
    Dete,
    /// Technical and Further Education institute.
    Tafe,
}

impl SurveySource {
    pub fn name(&self) -> &'static str {
        match self {
            SurveySource::Dete => "DETE",
            SurveySource::Tafe => "TAFE",
        }
    }

    /// Canonical columns the pipeline reads from this source, besides the
    /// sub-reason fields.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            SurveySource::Dete => &[ID, SEPARATION_TYPE, CEASE_DATE, DETE_START_DATE, AGE],
            SurveySource::Tafe => &[ID, SEPARATION_TYPE, CEASE_DATE, INSTITUTE_SERVICE, AGE],
        }
    }
}

impl fmt::Display for SurveySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercase, spaces to underscores, surrounding whitespace removed.
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Canonical name for one raw header of `source`.
pub fn canonical_name(source: SurveySource, raw: &str) -> String {
    match source {
        SurveySource::Dete => {
            let name = normalize_header(raw);
            DETE_RENAMES
                .iter()
                .find(|(from, _)| *from == name)
                .map(|(_, to)| to.to_string())
                .unwrap_or(name)
        }
        SurveySource::Tafe => TAFE_RENAMES
            .iter()
            .find(|(from, _)| *from == raw)
            .map(|(_, to)| to.to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

/// Rename every column of `df` to its canonical name.
pub fn normalize_columns(df: &DataFrame, source: SurveySource) -> Result<DataFrame, SchemaError> {
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .map(|column| {
            let name = canonical_name(source, column.name().as_str());
            column.clone().with_name(name.into())
        })
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Drop the columns at positions `[range.start, range.end)`, clamped to the width.
pub fn drop_column_range(df: &DataFrame, range: ColumnRange) -> Result<DataFrame, SchemaError> {
    let width = df.width();
    let start = range.start.min(width);
    let end = range.end.min(width);
    let keep: Vec<String> = df
        .get_column_names()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i < start || *i >= end)
        .map(|(_, name)| name.to_string())
        .collect();
    Ok(df.select(keep)?)
}

/// Fail fast when any consumed column is absent after renaming.
pub fn require_columns(
    df: &DataFrame,
    source: SurveySource,
    sub_reason_fields: &[String],
) -> Result<(), SchemaError> {
    let missing: Vec<String> = source
        .required_columns()
        .iter()
        .map(|name| name.to_string())
        .chain(sub_reason_fields.iter().cloned())
        .filter(|name| df.column(name).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns {
            source_name: source,
            columns: missing,
        })
    }
}
