//! Pipeline
//! Load → preprocess → growth analysis → charts, in a single forward pass.

use crate::charts::{BarChart, RenderError, StaticChartRenderer};
use crate::config::{
    AppConfig, CHART_SIZE, CITY_CHART_FILE, HIGHWAY_CHART_FILE, PRICE_CHART_FILE,
    US_INFLATION_AVG_2001_2019,
};
use crate::data::{DataLoader, DataProcessor, LoaderError, ProcessorError};
use crate::stats::{GrowthAnalyzer, GrowthError, GrowthMetric, GrowthSeries};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Legend entry of the inflation reference line.
pub const INFLATION_LABEL: &str = "Avg. Inflation";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Process(#[from] ProcessorError),
    #[error(transparent)]
    Growth(#[from] GrowthError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// The three growth series of a run.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub city: GrowthSeries,
    pub highway: GrowthSeries,
    pub price: GrowthSeries,
}

impl Analysis {
    /// Chart file name and chart for each series, price chart last.
    pub fn charts(&self) -> Vec<(&'static str, BarChart)> {
        vec![
            (CITY_CHART_FILE, BarChart::from_series(&self.city)),
            (HIGHWAY_CHART_FILE, BarChart::from_series(&self.highway)),
            (
                PRICE_CHART_FILE,
                BarChart::from_series(&self.price)
                    .with_reference(INFLATION_LABEL, US_INFLATION_AVG_2001_2019),
            ),
        ]
    }
}

/// Load and analyze the spec sheet without touching the output directory.
pub fn analyze(config: &AppConfig) -> Result<Analysis, PipelineError> {
    let mut loader = DataLoader::new();
    loader.load_csv(config.input())?;
    info!(listings = loader.get_listing_count(), "spec sheet listings");
    let raw = loader.into_dataframe()?;

    let vehicles = DataProcessor::preprocess(&raw)?;

    Ok(Analysis {
        city: GrowthAnalyzer::analyze(&vehicles, GrowthMetric::City)?,
        highway: GrowthAnalyzer::analyze(&vehicles, GrowthMetric::Highway)?,
        price: GrowthAnalyzer::analyze(&vehicles, GrowthMetric::Price)?,
    })
}

/// Write every chart of an analysis, returning the written paths.
pub fn render(analysis: &Analysis, config: &AppConfig) -> Result<Vec<PathBuf>, PipelineError> {
    let mut written = Vec::new();
    for (file_name, chart) in analysis.charts() {
        let path = config.chart_path(file_name);
        StaticChartRenderer::render_png(&chart, &path, CHART_SIZE)?;
        written.push(path);
    }
    Ok(written)
}

/// Full run: every series is computed before the first chart is written.
pub fn run(config: &AppConfig) -> Result<(Analysis, Vec<PathBuf>), PipelineError> {
    let analysis = analyze(config)?;
    let written = render(&analysis, config)?;

    info!(
        city_makes = analysis.city.makes.len(),
        highway_makes = analysis.highway.makes.len(),
        price_makes = analysis.price.makes.len(),
        charts = written.len(),
        "run complete"
    );
    Ok((analysis, written))
}
