//! Run Configuration Module
//! Collects every tunable constant of the analysis in one serde-friendly struct.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub const DETE_SURVEY_URL: &str =
    "https://raw.githubusercontent.com/minhha0510/data-cleaning-and-analysis-/main/dete_survey.csv";
pub const TAFE_SURVEY_URL: &str =
    "https://raw.githubusercontent.com/minhha0510/data-cleaning-and-analysis-/main/tafe_survey.csv";

/// Columns with fewer non-missing values than this are dropped after the merge.
pub const DEFAULT_COLUMN_DROP_THRESHOLD: usize = 500;

pub const CONFIG_PATH_VAR: &str = "EXIT_SURVEY_CONFIG";
pub const DETE_LOCATION_VAR: &str = "EXIT_SURVEY_DETE";
pub const TAFE_LOCATION_VAR: &str = "EXIT_SURVEY_TAFE";
pub const OUTPUT_DIR_VAR: &str = "EXIT_SURVEY_OUTPUT_DIR";
pub const LOG_LEVEL_VAR: &str = "EXIT_SURVEY_LOG_LEVEL";
pub const DROP_THRESHOLD_VAR: &str = "EXIT_SURVEY_DROP_THRESHOLD";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{var} must be a non-negative integer, got '{value}'")]
    InvalidThreshold { var: &'static str, value: String },
    #[error("Tenure boundaries must be finite, non-negative and strictly increasing (got {0:?})")]
    InvalidTenureBoundaries(TenureBoundaries),
    #[error("Unused column range for {label} is inverted ({start}..{end})")]
    InvalidColumnRange {
        label: String,
        start: usize,
        end: usize,
    },
}

/// Half-open range of column positions `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub start: usize,
    pub end: usize,
}

/// Settings for one survey source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// `http(s)://` URL or local file path.
    pub location: String,
    /// Provenance string written into the `institute` column.
    pub label: String,
    pub unused_columns: Option<ColumnRange>,
    pub sub_reason_fields: Vec<String>,
}

impl SourceConfig {
    pub fn dete_default() -> Self {
        Self {
            location: DETE_SURVEY_URL.to_string(),
            label: "DETE".to_string(),
            unused_columns: Some(ColumnRange { start: 28, end: 49 }),
            sub_reason_fields: [
                "job_dissatisfaction",
                "dissatisfaction_with_the_department",
                "physical_work_environment",
                "lack_of_recognition",
                "lack_of_job_security",
                "work_location",
                "employment_conditions",
                "work_life_balance",
                "workload",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }

    pub fn tafe_default() -> Self {
        Self {
            location: TAFE_SURVEY_URL.to_string(),
            label: "TAFE".to_string(),
            unused_columns: Some(ColumnRange { start: 17, end: 66 }),
            sub_reason_fields: vec!["factors_diss".to_string(), "factors_job_diss".to_string()],
        }
    }
}

/// Lower bounds (inclusive) of the Experienced, Established and Veteran buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TenureBoundaries {
    pub experienced: f64,
    pub established: f64,
    pub veteran: f64,
}

impl Default for TenureBoundaries {
    fn default() -> Self {
        Self {
            experienced: 3.0,
            established: 7.0,
            veteran: 11.0,
        }
    }
}

impl TenureBoundaries {
    fn is_valid(&self) -> bool {
        let all = [self.experienced, self.established, self.veteran];
        all.iter().all(|b| b.is_finite() && *b >= 0.0)
            && self.experienced < self.established
            && self.established < self.veteran
    }
}

/// Age bracket normalization rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeConfig {
    pub top_bracket: String,
    /// Brackets (after separator cleanup) folded into `top_bracket`.
    pub merge_into_top: Vec<String>,
}

impl Default for AgeConfig {
    fn default() -> Self {
        Self {
            top_bracket: "56 or older".to_string(),
            merge_into_top: vec!["61 or older".to_string(), "56-60".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 640,
        }
    }
}

/// Top-level configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    pub dete: SourceConfig,
    pub tafe: SourceConfig,
    pub column_drop_threshold: usize,
    pub tenure_boundaries: TenureBoundaries,
    /// Flip the sign of `start_year - cease_year` for DETE tenure.
    pub dete_tenure_sign_correction: bool,
    pub age: AgeConfig,
    pub output_dir: PathBuf,
    pub chart: ChartConfig,
    pub log_level: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            dete: SourceConfig::dete_default(),
            tafe: SourceConfig::tafe_default(),
            column_drop_threshold: DEFAULT_COLUMN_DROP_THRESHOLD,
            tenure_boundaries: TenureBoundaries::default(),
            dete_tenure_sign_correction: true,
            age: AgeConfig::default(),
            output_dir: PathBuf::from("charts"),
            chart: ChartConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl SurveyConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load using `lookup` in place of the process environment.
    pub fn load_from<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };

        if let Some(location) = lookup(DETE_LOCATION_VAR) {
            config.dete.location = location;
        }
        if let Some(location) = lookup(TAFE_LOCATION_VAR) {
            config.tafe.location = location;
        }
        if let Some(dir) = lookup(OUTPUT_DIR_VAR) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(LOG_LEVEL_VAR) {
            config.log_level = level;
        }
        if let Some(value) = lookup(DROP_THRESHOLD_VAR) {
            config.column_drop_threshold =
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidThreshold {
                        var: DROP_THRESHOLD_VAR,
                        value,
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tenure_boundaries.is_valid() {
            return Err(ConfigError::InvalidTenureBoundaries(self.tenure_boundaries));
        }
        for source in [&self.dete, &self.tafe] {
            if let Some(range) = source.unused_columns {
                if range.start > range.end {
                    return Err(ConfigError::InvalidColumnRange {
                        label: source.label.clone(),
                        start: range.start,
                        end: range.end,
                    });
                }
            }
        }
        Ok(())
    }
}
