//! Spec Sheet Loader Module
//! Reads the transposed spec sheet CSV into a raw string table using Polars.

use crate::config::SPEC_SHEET_ROWS;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Spec sheet not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Spec sheet has {found} rows, expected at least {expected}")]
    TooFewRows { found: usize, expected: usize },
    #[error("No data loaded")]
    NoData,
}

/// Loads the raw spec sheet: no header, every field kept as a string.
///
/// Column 0 holds the attribute labels (empty for the identifier row), every
/// other column is one vehicle listing.
pub struct DataLoader {
    df: Option<DataFrame>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self { df: None }
    }

    /// Load the first `SPEC_SHEET_ROWS` rows of a spec sheet CSV.
    ///
    /// Rows past the third are ignored; a file with fewer rows is rejected.
    pub fn load_csv(&mut self, file_path: &Path) -> Result<&DataFrame, LoaderError> {
        if !file_path.is_file() {
            return Err(LoaderError::NotFound(file_path.to_path_buf()));
        }

        // Schema inference disabled: every column is read as String
        let df = LazyCsvReader::new(file_path)
            .with_has_header(false)
            .with_n_rows(Some(SPEC_SHEET_ROWS))
            .with_infer_schema_length(Some(0))
            .finish()?
            .collect()?;

        if df.height() < SPEC_SHEET_ROWS {
            return Err(LoaderError::TooFewRows {
                found: df.height(),
                expected: SPEC_SHEET_ROWS,
            });
        }

        info!(
            path = %file_path.display(),
            rows = df.height(),
            columns = df.width(),
            "loaded spec sheet"
        );

        self.df = Some(df);
        self.df.as_ref().ok_or(LoaderError::NoData)
    }

    /// Number of vehicle listings (every column but the label column).
    pub fn get_listing_count(&self) -> usize {
        self.df
            .as_ref()
            .map(|df| df.width().saturating_sub(1))
            .unwrap_or(0)
    }

    /// Take ownership of the loaded DataFrame.
    pub fn into_dataframe(self) -> Result<DataFrame, LoaderError> {
        self.df.ok_or(LoaderError::NoData)
    }
}
