//! Charts module - Chart rendering

mod renderer;

pub use renderer::{BarChart, ReferenceLine, RenderError, StaticChartRenderer};
