//! Run Configuration
//! Fixed inputs and outputs of a run.

use std::path::{Path, PathBuf};

/// Spec sheet file read when no path is given.
pub const DEFAULT_INPUT: &str = "fullspecs.csv";

/// Rows consumed from the spec sheet: identifier row, MSRP row, mileage row.
pub const SPEC_SHEET_ROWS: usize = 3;

/// Average yearly US inflation 2001-2019, in percent.
pub const US_INFLATION_AVG_2001_2019: f64 = 2.04;

pub const CITY_CHART_FILE: &str = "City_aei.png";
pub const HIGHWAY_CHART_FILE: &str = "Highway_aei.png";
pub const PRICE_CHART_FILE: &str = "api.png";

/// Rendered chart size in pixels.
pub const CHART_SIZE: (u32, u32) = (1280, 800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Full path of a chart file inside the output directory.
    pub fn chart_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }
}
