//! Data module - Survey loading, cleaning and merging

pub mod answer;
pub mod categories;
pub mod loader;
pub mod processor;
pub mod schema;

pub use answer::Answer;
pub use categories::TenureBucket;
pub use loader::{DataLoader, SourceLocation};
pub use processor::DataProcessor;
pub use schema::SurveySource;
