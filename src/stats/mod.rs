//! Stats module - annualized growth analysis

mod growth;

pub use growth::{
    annualized_rate, GrowthAnalyzer, GrowthError, GrowthMetric, GrowthSeries, MakeGrowth,
    ModelGrowth,
};
