//! Vehicle Processor Module
//! Reshapes the raw spec sheet into one row per vehicle, parses the numeric
//! fields and averages duplicate listings per (Make, Model, Year).

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::{debug, info};

pub const MODEL: &str = "Model";
pub const MAKE: &str = "Make";
pub const YEAR: &str = "Year";
pub const MSRP: &str = "MSRP (USD)";
pub const GAS_MILEAGE: &str = "Gas Mileage";
pub const CITY_MPG: &str = "City mpg";
pub const HIGHWAY_MPG: &str = "Highway mpg";

/// Attribute label of the price row in the raw sheet.
const MSRP_LABEL: &str = "MSRP";

/// Two-word makes rewritten before the positional split. Any other
/// multi-word make still lands its second word in the model.
const MULTI_WORD_MAKES: [(&str, &str); 3] = [
    ("Alfa Romeo", "Alfa-Romeo"),
    ("Aston Martin", "Aston-Martin"),
    ("Land Rover", "Land-Rover"),
];

static SPECS_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r" Specs:.*").expect("static pattern is valid"));

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Spec sheet has no label column")]
    EmptySheet,
    #[error("Spec sheet has no '{0}' row")]
    MissingAttribute(&'static str),
}

/// Remove the " Specs: ..." trim description from a listing identifier.
pub fn strip_specs(identifier: &str) -> String {
    SPECS_SUFFIX.replace_all(identifier, "").into_owned()
}

/// Hyphenate the known two-word makes anywhere in the identifier.
pub fn canonicalize_makes(identifier: &str) -> String {
    MULTI_WORD_MAKES
        .iter()
        .fold(identifier.to_string(), |id, (from, to)| id.replace(from, to))
}

/// Split "`<year> <make> <model...>`" into its parts.
///
/// Returns `None` when the year is not an integer or fewer than three tokens
/// are present.
pub fn split_identifier(identifier: &str) -> Option<(i32, String, String)> {
    let mut tokens = identifier.split_whitespace();
    let year = tokens.next()?.parse::<i32>().ok()?;
    let make = tokens.next()?.to_string();
    let model = tokens.collect::<Vec<_>>().join(" ");
    if model.is_empty() {
        return None;
    }
    Some((year, make, model))
}

/// Parse a currency string such as "$12,345" or "$1,234.50".
pub fn parse_msrp(raw: &str) -> Option<f64> {
    parse_finite(&raw.replace(['$', ','], ""))
}

/// Parse "21 mpg City/29 mpg Hwy" into (city, highway). Each side fails
/// independently.
pub fn parse_mileage(raw: &str) -> (Option<f64>, Option<f64>) {
    let mut parts = raw.splitn(2, '/');
    let city = parts
        .next()
        .and_then(|s| parse_finite(&s.replace(" mpg City", "")));
    let highway = parts
        .next()
        .and_then(|s| parse_finite(&s.replace(" mpg Hwy", "")));
    (city, highway)
}

// "NaN" and "inf" parse as f64 but count as missing
fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Handles reshaping, cleaning and aggregation of the spec sheet.
pub struct DataProcessor;

impl DataProcessor {
    /// Full preprocessing: raw spec sheet in, one averaged row per
    /// (Make, Model, Year) out.
    ///
    /// Output columns: [Make, Model, Year, MSRP (USD), City mpg, Highway mpg]
    pub fn preprocess(raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let listings = Self::clean_identifiers(Self::transpose(raw)?)?;
        let total = listings.height();

        let listings = Self::drop_incomplete(listings)?;
        info!(
            dropped = total - listings.height(),
            kept = listings.height(),
            "dropped listings with missing fields"
        );

        let parsed = Self::parse_fields(&listings)?;
        let before = parsed.height();
        let vehicles = Self::drop_incomplete(parsed)?;
        info!(
            dropped = before - vehicles.height(),
            kept = vehicles.height(),
            "dropped vehicles with unparseable fields"
        );
        Self::log_split_diagnostics(&vehicles)?;

        let aggregated = Self::aggregate(vehicles)?;
        info!(records = aggregated.height(), "aggregated by make, model and year");
        Ok(aggregated)
    }

    /// Turn the sheet so each listing becomes a row.
    ///
    /// The label column supplies the header: the unlabeled row is the
    /// identifier ("Model"), "MSRP" becomes "MSRP (USD)".
    ///
    /// Output columns: [Model, MSRP (USD), Gas Mileage], all strings
    pub fn transpose(raw: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let (labels, listings) = raw
            .get_columns()
            .split_first()
            .ok_or(ProcessorError::EmptySheet)?;

        let mut id_row = None;
        let mut msrp_row = None;
        let mut mileage_row = None;
        for (row, label) in labels.str()?.into_iter().enumerate() {
            match label.map(str::trim) {
                None | Some("") if id_row.is_none() => id_row = Some(row),
                Some(MSRP_LABEL) if msrp_row.is_none() => msrp_row = Some(row),
                Some(GAS_MILEAGE) if mileage_row.is_none() => mileage_row = Some(row),
                _ => {}
            }
        }
        let id_row = id_row.ok_or(ProcessorError::MissingAttribute(MODEL))?;
        let msrp_row = msrp_row.ok_or(ProcessorError::MissingAttribute(MSRP_LABEL))?;
        let mileage_row = mileage_row.ok_or(ProcessorError::MissingAttribute(GAS_MILEAGE))?;

        let mut ids: Vec<Option<String>> = Vec::with_capacity(listings.len());
        let mut msrps: Vec<Option<String>> = Vec::with_capacity(listings.len());
        let mut mileages: Vec<Option<String>> = Vec::with_capacity(listings.len());

        for listing in listings {
            let cells = listing.str()?;
            let cell = |row: usize| {
                cells
                    .get(row)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            ids.push(cell(id_row));
            msrps.push(cell(msrp_row));
            mileages.push(cell(mileage_row));
        }

        let df = DataFrame::new(vec![
            Column::new(MODEL.into(), ids),
            Column::new(MSRP.into(), msrps),
            Column::new(GAS_MILEAGE.into(), mileages),
        ])?;

        Ok(df)
    }

    /// Strip the trim description and hyphenate multi-word makes.
    pub fn clean_identifiers(mut df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let cleaned: Vec<Option<String>> = df
            .column(MODEL)?
            .str()?
            .into_iter()
            .map(|id| id.map(|id| canonicalize_makes(&strip_specs(id))))
            .collect();

        df.with_column(Column::new(MODEL.into(), cleaned))?;
        Ok(df)
    }

    /// Keep only rows where every column is non-null.
    pub fn drop_incomplete(df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let predicate = df
            .get_column_names()
            .into_iter()
            .map(|name| col(name.clone()).is_not_null())
            .reduce(|acc, expr| acc.and(expr))
            .unwrap_or(lit(true));

        Ok(df.lazy().filter(predicate).collect()?)
    }

    /// Parse identifier, price and mileage. Failed parses become nulls.
    ///
    /// Output columns: [Year, Make, Model, MSRP (USD), City mpg, Highway mpg]
    pub fn parse_fields(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let ids = df.column(MODEL)?.str()?;
        let msrps = df.column(MSRP)?.str()?;
        let mileages = df.column(GAS_MILEAGE)?.str()?;

        let n = df.height();
        let mut years: Vec<Option<i32>> = Vec::with_capacity(n);
        let mut makes: Vec<Option<String>> = Vec::with_capacity(n);
        let mut models: Vec<Option<String>> = Vec::with_capacity(n);
        let mut prices: Vec<Option<f64>> = Vec::with_capacity(n);
        let mut city: Vec<Option<f64>> = Vec::with_capacity(n);
        let mut highway: Vec<Option<f64>> = Vec::with_capacity(n);

        for ((id, msrp), mileage) in ids.into_iter().zip(msrps).zip(mileages) {
            match id.and_then(split_identifier) {
                Some((year, make, model)) => {
                    years.push(Some(year));
                    makes.push(Some(make));
                    models.push(Some(model));
                }
                None => {
                    years.push(None);
                    makes.push(None);
                    models.push(None);
                }
            }

            prices.push(msrp.and_then(parse_msrp));

            let (c, h) = mileage.map(parse_mileage).unwrap_or((None, None));
            city.push(c);
            highway.push(h);
        }

        let df = DataFrame::new(vec![
            Column::new(YEAR.into(), years),
            Column::new(MAKE.into(), makes),
            Column::new(MODEL.into(), models),
            Column::new(MSRP.into(), prices),
            Column::new(CITY_MPG.into(), city),
            Column::new(HIGHWAY_MPG.into(), highway),
        ])?;

        Ok(df)
    }

    /// Arithmetic mean of every numeric field per (Make, Model, Year).
    pub fn aggregate(df: DataFrame) -> Result<DataFrame, ProcessorError> {
        let aggregated = df
            .lazy()
            .group_by([col(MAKE), col(MODEL), col(YEAR)])
            .agg([
                col(MSRP).mean(),
                col(CITY_MPG).mean(),
                col(HIGHWAY_MPG).mean(),
            ])
            .sort([MAKE, MODEL, YEAR], SortMultipleOptions::default())
            .collect()?;
        Ok(aggregated)
    }

    /// Report makes and space-containing models so mis-split multi-word
    /// makes can be spotted.
    fn log_split_diagnostics(df: &DataFrame) -> Result<(), ProcessorError> {
        let makes: BTreeSet<&str> = df.column(MAKE)?.str()?.into_iter().flatten().collect();
        let spaced_models: BTreeSet<&str> = df
            .column(MODEL)?
            .str()?
            .into_iter()
            .flatten()
            .filter(|model| model.contains(' '))
            .collect();

        debug!(count = makes.len(), ?makes, "distinct makes");
        debug!(count = spaced_models.len(), ?spaced_models, "models containing spaces");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_sheet(ids: &[&str], msrps: &[&str], mileages: &[&str]) -> DataFrame {
        let mut columns = vec![Column::new(
            "column_1".into(),
            vec![None, Some("MSRP"), Some("Gas Mileage")],
        )];
        for (i, ((id, msrp), mileage)) in ids.iter().zip(msrps).zip(mileages).enumerate() {
            let cells: Vec<Option<&str>> = [id, msrp, mileage]
                .iter()
                .map(|s| if s.is_empty() { None } else { Some(**s) })
                .collect();
            columns.push(Column::new(format!("column_{}", i + 2).into(), cells));
        }
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_split_identifier_with_multi_word_make() {
        for (raw, expected) in [
            ("2015 Alfa Romeo 4C Spider", (2015, "Alfa-Romeo", "4C Spider")),
            ("2010 Aston Martin DB9  Volante", (2010, "Aston-Martin", "DB9 Volante")),
            (
                "2019 Land Rover Range Rover Sport",
                (2019, "Land-Rover", "Range Rover Sport"),
            ),
        ] {
            let (year, make, model) = split_identifier(&canonicalize_makes(raw)).unwrap();
            assert_eq!((year, make.as_str(), model.as_str()), expected);
        }
    }

    #[test]
    fn test_split_identifier_rejects_bad_input() {
        assert_eq!(split_identifier("Honda Civic DX"), None);
        assert_eq!(split_identifier("2001 Honda"), None);
        assert_eq!(split_identifier(""), None);
    }

    #[test]
    fn test_strip_specs() {
        assert_eq!(
            strip_specs("2001 Acura Integra Specs: 3dr Sport Cpe GS-R"),
            "2001 Acura Integra"
        );
        assert_eq!(strip_specs("2001 Acura Integra"), "2001 Acura Integra");
    }

    #[test]
    fn test_parse_msrp() {
        assert_eq!(parse_msrp("$12,345"), Some(12345.0));
        assert_eq!(parse_msrp("$1,234.50"), Some(1234.5));
        assert_eq!(parse_msrp("N/A"), None);
        assert_eq!(parse_msrp("NaN"), None);
        assert_eq!(parse_msrp("$inf"), None);
    }

    #[test]
    fn test_parse_mileage() {
        assert_eq!(parse_mileage("21 mpg City/29 mpg Hwy"), (Some(21.0), Some(29.0)));
        assert_eq!(parse_mileage("21 mpg City"), (Some(21.0), None));
        assert_eq!(parse_mileage("N/A/29 mpg Hwy"), (None, None));
        assert_eq!(parse_mileage("nan mpg City/29 mpg Hwy"), (None, Some(29.0)));
        assert_eq!(parse_mileage("21 mpg City/inf mpg Hwy"), (Some(21.0), None));
    }

    #[test]
    fn test_nan_cells_do_not_reach_the_mean() {
        let raw = raw_sheet(
            &["2001 Honda Civic Specs: DX", "2001 Honda Civic Specs: LX"],
            &["$12,000", "NaN"],
            &["28 mpg City/35 mpg Hwy", "nan mpg City/37 mpg Hwy"],
        );

        let df = DataProcessor::preprocess(&raw).unwrap();
        assert_eq!(df.height(), 1);

        let msrp: Vec<_> = df.column(MSRP).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(msrp, vec![Some(12000.0)]);
        let highway: Vec<_> = df
            .column(HIGHWAY_MPG)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(highway, vec![Some(35.0)]);
    }

    #[test]
    fn test_transpose_uses_label_column_as_header() {
        let raw = raw_sheet(
            &["2001 Honda Civic Specs: DX"],
            &["$12,885"],
            &["28 mpg City/35 mpg Hwy"],
        );

        let df = DataProcessor::transpose(&raw).unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec![MODEL, MSRP, GAS_MILEAGE]);
        assert_eq!(df.height(), 1);
        assert_eq!(
            df.column(MODEL).unwrap().str().unwrap().get(0),
            Some("2001 Honda Civic Specs: DX")
        );
    }

    #[test]
    fn test_transpose_requires_price_row() {
        let raw = DataFrame::new(vec![
            Column::new("column_1".into(), vec![None, Some("Engine"), Some("Gas Mileage")]),
            Column::new("column_2".into(), vec![Some("2001 Honda Civic"), Some("1.7L"), Some("x")]),
        ])
        .unwrap();

        let err = DataProcessor::transpose(&raw).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingAttribute("MSRP")));
    }

    #[test]
    fn test_preprocess_drops_and_averages() {
        let raw = raw_sheet(
            &[
                "2001 Honda Civic Specs: DX",
                "2001 Honda Civic Specs: LX",
                "2003 Land Rover Discovery Specs: SE",
                "2004 Mazda",
                "2005 Toyota Corolla Specs: CE",
                "2006 Ford Focus Specs: ZX3",
            ],
            &["$12,000", "$14,000", "$34,000", "$9,000", "", "$13,000"],
            &[
                "28 mpg City/35 mpg Hwy",
                "30 mpg City/37 mpg Hwy",
                "13 mpg City/17 mpg Hwy",
                "25 mpg City/31 mpg Hwy",
                "30 mpg City/38 mpg Hwy",
                "unknown",
            ],
        );

        let df = DataProcessor::preprocess(&raw).unwrap();
        assert_eq!(df.height(), 2);

        let makes: Vec<_> = df.column(MAKE).unwrap().str().unwrap().into_iter().collect();
        assert_eq!(makes, vec![Some("Honda"), Some("Land-Rover")]);

        let msrp: Vec<_> = df.column(MSRP).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(msrp, vec![Some(13000.0), Some(34000.0)]);

        let city: Vec<_> = df.column(CITY_MPG).unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(city, vec![Some(29.0), Some(13.0)]);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let raw = raw_sheet(
            &[
                "2001 Honda Civic Specs: DX",
                "2001 Honda Civic Specs: LX",
                "2010 Honda Civic Specs: LX",
            ],
            &["$12,000", "$14,000", "$16,000"],
            &[
                "28 mpg City/35 mpg Hwy",
                "30 mpg City/37 mpg Hwy",
                "33 mpg City/38 mpg Hwy",
            ],
        );

        let once = DataProcessor::preprocess(&raw).unwrap();
        let twice = DataProcessor::aggregate(once.clone()).unwrap();
        assert_eq!(once.height(), 2);
        assert!(once.equals(&twice));
    }
}
