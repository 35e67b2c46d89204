//! Statistics Calculator Module
//! Aggregates the merged survey into dissatisfaction rates by tenure bucket
//! and by age bracket.

use crate::data::categories::TenureBucket;
use crate::data::loader::string_values;
use crate::data::schema::{AGE, DISSATISFIED, SERVICE_CAT};
use polars::prelude::*;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Share of resignations citing dissatisfaction within one tenure bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct TenureRate {
    pub bucket: TenureBucket,
    pub respondents: usize,
    /// Mean of the dissatisfaction indicator, in `[0, 1]`.
    pub rate: f64,
}

/// Dissatisfaction counts and shares for one age bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct AgeBreakdown {
    pub age: String,
    pub total: usize,
    pub dissatisfied: usize,
    pub other_reasons: usize,
    pub dissatisfied_pct: f64,
    pub other_reasons_pct: f64,
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Mean dissatisfaction per tenure bucket, New through Veteran.
    /// Rows without a bucket are left out.
    pub fn tenure_dissatisfaction(df: &DataFrame) -> Result<Vec<TenureRate>, StatsError> {
        if !Self::has_columns(df, &[SERVICE_CAT, DISSATISFIED]) {
            return Ok(Vec::new());
        }

        let grouped = df
            .clone()
            .lazy()
            .filter(col(SERVICE_CAT).is_not_null())
            .group_by([col(SERVICE_CAT)])
            .agg([
                col(DISSATISFIED)
                    .cast(DataType::Float64)
                    .mean()
                    .alias("rate"),
                len().alias("respondents"),
            ])
            .collect()?;

        let buckets = string_values(&grouped, SERVICE_CAT)?;
        let rates = Self::f64_values(&grouped, "rate")?;
        let counts = Self::f64_values(&grouped, "respondents")?;

        let mut rows: Vec<TenureRate> = buckets
            .into_iter()
            .zip(rates)
            .zip(counts)
            .filter_map(|((bucket, rate), count)| {
                Some(TenureRate {
                    bucket: TenureBucket::parse(bucket.as_deref()?)?,
                    respondents: count.unwrap_or(0.0) as usize,
                    rate: rate.unwrap_or(0.0),
                })
            })
            .collect();
        rows.sort_by_key(|row| row.bucket);
        Ok(rows)
    }

    /// Per age bracket: total, dissatisfied, other reasons, and both shares
    /// rounded to two decimals. Rows without an age are left out.
    pub fn age_breakdown(df: &DataFrame) -> Result<Vec<AgeBreakdown>, StatsError> {
        if !Self::has_columns(df, &[AGE, DISSATISFIED]) {
            return Ok(Vec::new());
        }

        let grouped = df
            .clone()
            .lazy()
            .filter(col(AGE).is_not_null())
            .group_by([col(AGE)])
            .agg([
                len().alias("total"),
                col(DISSATISFIED)
                    .cast(DataType::UInt32)
                    .sum()
                    .alias("dissatisfied_count"),
            ])
            .collect()?;

        let ages = string_values(&grouped, AGE)?;
        let totals = Self::f64_values(&grouped, "total")?;
        let dissatisfied = Self::f64_values(&grouped, "dissatisfied_count")?;

        let mut rows: Vec<AgeBreakdown> = ages
            .into_iter()
            .zip(totals)
            .zip(dissatisfied)
            .filter_map(|((age, total), dissatisfied)| {
                let total = total.unwrap_or(0.0) as usize;
                let dissatisfied = dissatisfied.unwrap_or(0.0) as usize;
                Some(Self::breakdown(age?, total, dissatisfied))
            })
            .collect();
        rows.sort_by(|a, b| a.age.cmp(&b.age));
        Ok(rows)
    }

    fn breakdown(age: String, total: usize, dissatisfied: usize) -> AgeBreakdown {
        let other_reasons = total.saturating_sub(dissatisfied);
        let share = |count: usize| {
            if total == 0 {
                0.0
            } else {
                round2(count as f64 / total as f64)
            }
        };
        AgeBreakdown {
            age,
            total,
            dissatisfied,
            other_reasons,
            dissatisfied_pct: share(dissatisfied),
            other_reasons_pct: share(other_reasons),
        }
    }

    /// Tabular view for display.
    pub fn tenure_frame(rows: &[TenureRate]) -> Result<DataFrame, StatsError> {
        let buckets: Vec<&str> = rows.iter().map(|r| r.bucket.as_str()).collect();
        let respondents: Vec<u64> = rows.iter().map(|r| r.respondents as u64).collect();
        let rates: Vec<f64> = rows.iter().map(|r| r.rate).collect();

        let df = DataFrame::new(vec![
            Column::new(SERVICE_CAT.into(), buckets),
            Column::new("respondents".into(), respondents),
            Column::new(DISSATISFIED.into(), rates),
        ])?;
        Ok(df)
    }

    /// Tabular view for display, one row per age bracket.
    pub fn age_frame(rows: &[AgeBreakdown]) -> Result<DataFrame, StatsError> {
        let df = DataFrame::new(vec![
            Column::new(
                "Age".into(),
                rows.iter().map(|r| r.age.clone()).collect::<Vec<String>>(),
            ),
            Column::new(
                "Total".into(),
                rows.iter().map(|r| r.total as u64).collect::<Vec<u64>>(),
            ),
            Column::new(
                "Dissatisfied".into(),
                rows.iter().map(|r| r.dissatisfied as u64).collect::<Vec<u64>>(),
            ),
            Column::new(
                "Other reasons".into(),
                rows.iter().map(|r| r.other_reasons as u64).collect::<Vec<u64>>(),
            ),
            Column::new(
                "Dissatisfied %".into(),
                rows.iter().map(|r| r.dissatisfied_pct).collect::<Vec<f64>>(),
            ),
            Column::new(
                "Other reasons %".into(),
                rows.iter().map(|r| r.other_reasons_pct).collect::<Vec<f64>>(),
            ),
        ])?;
        Ok(df)
    }

    fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|name| df.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            warn!(
                "cannot aggregate without column(s) {}; returning an empty table",
                missing.join(", ")
            );
        }
        missing.is_empty()
    }

    fn f64_values(df: &DataFrame, column: &str) -> PolarsResult<Vec<Option<f64>>> {
        Ok(df
            .column(column)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
