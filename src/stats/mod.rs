//! Stats module - Dissatisfaction aggregates

mod calculator;

pub use calculator::{AgeBreakdown, StatsCalculator, StatsError, TenureRate};
