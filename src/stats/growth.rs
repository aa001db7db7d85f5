//! Growth Analyzer Module
//! Annualized growth between the earliest and latest observed year of each
//! model, averaged per make.

use crate::data::{CITY_MPG, HIGHWAY_MPG, MAKE, MODEL, MSRP, YEAR};
use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum GrowthError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Quantity whose growth is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMetric {
    /// City mileage (AEI)
    City,
    /// Highway mileage (AEI)
    Highway,
    /// MSRP (API)
    Price,
}

impl GrowthMetric {
    /// Column of the aggregated table holding this quantity.
    pub fn column(self) -> &'static str {
        match self {
            GrowthMetric::City => CITY_MPG,
            GrowthMetric::Highway => HIGHWAY_MPG,
            GrowthMetric::Price => MSRP,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GrowthMetric::City => "City",
            GrowthMetric::Highway => "Highway",
            GrowthMetric::Price => "Price",
        }
    }

    /// Short name of the derived rate.
    pub fn rate_name(self) -> &'static str {
        match self {
            GrowthMetric::City | GrowthMetric::Highway => "AEI",
            GrowthMetric::Price => "API",
        }
    }
}

/// Endpoints and rate for one (Make, Model).
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGrowth {
    pub make: String,
    pub model: String,
    pub first_year: i32,
    pub last_year: i32,
    pub first_value: f64,
    pub last_value: f64,
    pub rate: f64,
}

impl ModelGrowth {
    pub fn span(&self) -> i32 {
        self.last_year - self.first_year
    }
}

/// Mean rate across all models of a make.
#[derive(Debug, Clone, PartialEq)]
pub struct MakeGrowth {
    pub make: String,
    pub rate: f64,
    pub model_count: usize,
}

/// Result of one growth analysis, makes in lexicographic order.
#[derive(Debug, Clone)]
pub struct GrowthSeries {
    pub metric: GrowthMetric,
    pub models: Vec<ModelGrowth>,
    pub makes: Vec<MakeGrowth>,
    /// Models without a defined rate.
    pub dropped: usize,
}

impl GrowthSeries {
    pub fn rate_for(&self, make: &str) -> Option<f64> {
        self.makes.iter().find(|m| m.make == make).map(|m| m.rate)
    }

    pub fn is_empty(&self) -> bool {
        self.makes.is_empty()
    }
}

/// Compound annual growth in percent: `(exp(ln(latest / earliest) / span) - 1) * 100`.
///
/// Undefined (`None`) for a non-positive span or a ratio that is not a
/// positive finite number.
pub fn annualized_rate(earliest: f64, latest: f64, span: i32) -> Option<f64> {
    if span <= 0 {
        return None;
    }
    let ratio = latest / earliest;
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }
    let rate = (ratio.ln() / span as f64).exp_m1() * 100.0;
    rate.is_finite().then_some(rate)
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    year: i32,
    value: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Endpoints {
    first: Observation,
    last: Observation,
}

impl Endpoints {
    fn new(obs: Observation) -> Self {
        Self {
            first: obs,
            last: obs,
        }
    }

    // Strict comparisons keep the first row on ties
    fn observe(&mut self, obs: Observation) {
        if obs.year < self.first.year {
            self.first = obs;
        }
        if obs.year > self.last.year {
            self.last = obs;
        }
    }
}

/// Computes per-make growth from the aggregated vehicle table.
pub struct GrowthAnalyzer;

impl GrowthAnalyzer {
    /// Analyze one metric.
    ///
    /// Expects columns [Make, Model, Year, <metric column>]; intermediate
    /// years are ignored, only the extremes of each model count.
    pub fn analyze(df: &DataFrame, metric: GrowthMetric) -> Result<GrowthSeries, GrowthError> {
        let endpoints = Self::collect_endpoints(df, metric)?;
        let group_count = endpoints.len();

        let models: Vec<ModelGrowth> = endpoints
            .into_iter()
            .filter_map(|((make, model), ends)| {
                let span = ends.last.year - ends.first.year;
                let first_value = ends.first.value?;
                let last_value = ends.last.value?;
                let rate = annualized_rate(first_value, last_value, span)?;
                Some(ModelGrowth {
                    make,
                    model,
                    first_year: ends.first.year,
                    last_year: ends.last.year,
                    first_value,
                    last_value,
                    rate,
                })
            })
            .collect();
        let dropped = group_count - models.len();

        for m in &models {
            debug!(
                metric = metric.label(),
                make = %m.make,
                model = %m.model,
                span = m.span(),
                rate = m.rate,
                "model growth"
            );
        }

        let makes = Self::average_by_make(&models);
        info!(
            metric = metric.label(),
            models = models.len(),
            dropped,
            makes = makes.len(),
            "computed {}",
            metric.rate_name()
        );

        Ok(GrowthSeries {
            metric,
            models,
            makes,
            dropped,
        })
    }

    /// Earliest and latest observation per (Make, Model).
    fn collect_endpoints(
        df: &DataFrame,
        metric: GrowthMetric,
    ) -> Result<BTreeMap<(String, String), Endpoints>, GrowthError> {
        let makes = df.column(MAKE)?.str()?;
        let models = df.column(MODEL)?.str()?;
        let years = df.column(YEAR)?.cast(&DataType::Int32)?;
        let years = years.i32()?;
        let values = df.column(metric.column())?.cast(&DataType::Float64)?;
        let values = values.f64()?;

        let mut endpoints: BTreeMap<(String, String), Endpoints> = BTreeMap::new();

        for (((make, model), year), value) in makes.into_iter().zip(models).zip(years).zip(values)
        {
            let (Some(make), Some(model), Some(year)) = (make, model, year) else {
                continue;
            };
            let obs = Observation { year, value };
            endpoints
                .entry((make.to_string(), model.to_string()))
                .and_modify(|ends| ends.observe(obs))
                .or_insert_with(|| Endpoints::new(obs));
        }

        Ok(endpoints)
    }

    fn average_by_make(models: &[ModelGrowth]) -> Vec<MakeGrowth> {
        let mut by_make: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for m in models {
            by_make.entry(m.make.as_str()).or_default().push(m.rate);
        }

        by_make
            .into_iter()
            .map(|(make, rates)| MakeGrowth {
                make: make.to_string(),
                model_count: rates.len(),
                rate: Statistics::mean(rates.iter()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregated(rows: &[(&str, &str, i32, f64)]) -> DataFrame {
        DataFrame::new(vec![
            Column::new(MAKE.into(), rows.iter().map(|r| r.0).collect::<Vec<_>>()),
            Column::new(MODEL.into(), rows.iter().map(|r| r.1).collect::<Vec<_>>()),
            Column::new(YEAR.into(), rows.iter().map(|r| r.2).collect::<Vec<_>>()),
            Column::new(CITY_MPG.into(), rows.iter().map(|r| r.3).collect::<Vec<_>>()),
        ])
        .unwrap()
    }

    #[test]
    fn test_annualized_rate_matches_cagr() {
        let rate = annualized_rate(20.0, 24.2, 9).unwrap();
        let expected = ((24.2f64 / 20.0).powf(1.0 / 9.0) - 1.0) * 100.0;
        assert!((rate - expected).abs() < 1e-9);
        assert!((rate - 2.1406).abs() < 1e-3);
    }

    #[test]
    fn test_annualized_rate_undefined_cases() {
        assert_eq!(annualized_rate(20.0, 24.2, 0), None);
        assert_eq!(annualized_rate(20.0, 24.2, -3), None);
        assert_eq!(annualized_rate(0.0, 24.2, 5), None);
        assert_eq!(annualized_rate(20.0, 0.0, 5), None);
        assert_eq!(annualized_rate(-20.0, 24.2, 5), None);
        assert_eq!(annualized_rate(f64::NAN, 24.2, 5), None);
    }

    #[test]
    fn test_single_year_model_is_excluded() {
        let df = aggregated(&[
            ("Honda", "Civic", 2001, 28.0),
            ("Honda", "Civic", 2010, 33.0),
            ("Honda", "S2000", 2004, 20.0),
            ("Toyota", "Corolla", 2005, 30.0),
        ]);

        let series = GrowthAnalyzer::analyze(&df, GrowthMetric::City).unwrap();

        assert_eq!(series.dropped, 2);
        assert_eq!(series.makes.len(), 1);
        assert_eq!(series.rate_for("Toyota"), None);

        let honda = &series.makes[0];
        assert_eq!(honda.model_count, 1);
        let expected = annualized_rate(28.0, 33.0, 9).unwrap();
        assert!((honda.rate - expected).abs() < 1e-12);
        assert!(honda.rate.is_finite() && honda.rate > 0.0);
    }

    #[test]
    fn test_only_extreme_years_count() {
        let df = aggregated(&[
            ("Ford", "Focus", 2005, 30.0),
            ("Ford", "Focus", 2000, 25.0),
            ("Ford", "Focus", 2002, 50.0),
            ("Ford", "Fiesta", 2010, 36.0),
            ("Ford", "Fiesta", 2012, 36.0),
        ]);

        let series = GrowthAnalyzer::analyze(&df, GrowthMetric::City).unwrap();

        let focus = series.models.iter().find(|m| m.model == "Focus").unwrap();
        assert_eq!((focus.first_year, focus.last_year), (2000, 2005));
        assert_eq!((focus.first_value, focus.last_value), (25.0, 30.0));
        assert_eq!(focus.span(), 5);

        let expected = (annualized_rate(25.0, 30.0, 5).unwrap() + 0.0) / 2.0;
        assert!((series.rate_for("Ford").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_metric_columns() {
        assert_eq!(GrowthMetric::City.column(), CITY_MPG);
        assert_eq!(GrowthMetric::Highway.column(), HIGHWAY_MPG);
        assert_eq!(GrowthMetric::Price.column(), MSRP);
        assert_eq!(GrowthMetric::Price.rate_name(), "API");
    }
}
