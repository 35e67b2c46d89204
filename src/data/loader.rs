//! CSV Data Loader Module
//! Fetches a survey CSV from a URL or local path into a Polars DataFrame.

use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },
}

/// Where a survey table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(location: &str) -> Self {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceLocation::Remote(trimmed.to_string())
        } else {
            SourceLocation::Local(PathBuf::from(trimmed))
        }
    }
}

/// Loads survey CSVs with every column read as text.
///
/// Typing happens later, column by column, so sentinel strings such as
/// `"Not Stated"` survive the load instead of being nulled by inference.
pub struct DataLoader;

impl DataLoader {
    pub fn load_csv(location: &SourceLocation) -> Result<DataFrame, LoaderError> {
        let df = match location {
            SourceLocation::Remote(url) => {
                let bytes = Self::download(url)?;
                Self::read_csv_bytes(bytes)?
            }
            SourceLocation::Local(path) => LazyCsvReader::new(path)
                .with_has_header(true)
                .with_infer_schema_length(Some(0))
                .with_encoding(CsvEncoding::LossyUtf8)
                .finish()?
                .collect()?,
        };

        info!(
            rows = df.height(),
            columns = df.width(),
            "loaded survey table from {:?}",
            location
        );
        Ok(df)
    }

    /// Parse an in-memory CSV payload.
    pub fn read_csv_bytes(bytes: Vec<u8>) -> Result<DataFrame, LoaderError> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| opts.with_encoding(CsvEncoding::LossyUtf8))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        Ok(df)
    }

    fn download(url: &str) -> Result<Vec<u8>, LoaderError> {
        debug!("downloading {url}");
        let response = ureq::get(url).call().map_err(|err| LoaderError::Download {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        response
            .into_body()
            .read_to_vec()
            .map_err(|err| LoaderError::Download {
                url: url.to_string(),
                reason: format!("failed reading response body: {err}"),
            })
    }
}

/// Column values as owned strings; nulls stay `None`.
pub fn string_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<String>>> {
    let as_text = df.column(column)?.cast(&DataType::String)?;
    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Null count per column, in column order.
pub fn profile_nulls(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count()))
        .collect()
}

/// Frequency of each value in `column` (nulls included), most frequent first.
pub fn value_counts(df: &DataFrame, column: &str) -> PolarsResult<Vec<(Option<String>, usize)>> {
    let mut counts: HashMap<Option<String>, usize> = HashMap::new();
    for value in string_values(df, column)? {
        *counts.entry(value).or_default() += 1;
    }

    let mut counts: Vec<(Option<String>, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(counts)
}
