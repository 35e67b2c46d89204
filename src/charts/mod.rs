//! Charts module - Static bar chart rendering

mod renderer;

pub use renderer::{BarChart, ChartError, StaticChartRenderer};
