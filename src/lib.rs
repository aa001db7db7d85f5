//! Autospec Trends - fuel economy & price growth per manufacturer
//!
//! Reshapes a transposed automobile spec sheet into (Make, Model, Year)
//! records, computes annualized growth of mileage and MSRP per make and
//! draws the results as bar charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod stats;
