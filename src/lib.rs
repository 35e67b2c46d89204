//! Exit Survey Analysis - cleaning and dissatisfaction statistics for the
//! DETE and TAFE employee exit surveys.
//!
//! The run is one straight line: load both CSVs, normalize headers, keep
//! resignations, derive years of service and a dissatisfaction flag, merge,
//! categorise, then aggregate by tenure bucket and by age bracket.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;
pub mod telemetry;

pub use config::SurveyConfig;
pub use pipeline::{PipelineError, SurveyPipeline, SurveyReport};
