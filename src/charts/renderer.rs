//! Static Chart Renderer
//! Draws per-make growth bar charts to PNG files with plotters.
//!
//! Layout:
//! 1. Caption centered on top
//! 2. One bar per make, make names hanging down from each tick
//! 3. Optional flat reference line across the whole axis (price chart)
//! 4. Legend in the upper right corner

use crate::stats::{GrowthMetric, GrowthSeries};
use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

// Colors
const BAR_COLOR: RGBColor = RGBColor(91, 155, 213);
const REFERENCE_COLOR: RGBColor = RGBColor(220, 53, 69);

const X_LABEL_AREA: u32 = 140;
const Y_LABEL_AREA: u32 = 80;
const TICK_SIZE: i32 = 5;

/// Share of the value span left free above the tallest bar for the legend.
const LEGEND_HEADROOM: f64 = 0.35;
/// Share of the value span added below the lowest negative bar.
const BOTTOM_PAD: f64 = 0.15;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Output directory does not exist: {0}")]
    MissingDirectory(PathBuf),
    #[error("Failed to draw chart: {0}")]
    Plot(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Plot(err.to_string())
    }
}

/// Horizontal line drawn at a constant value.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLine {
    pub label: String,
    pub value: f64,
}

/// Everything needed to draw one bar chart.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub y_desc: String,
    pub bar_label: String,
    /// (category, value) in drawing order
    pub bars: Vec<(String, f64)>,
    pub reference: Option<ReferenceLine>,
}

impl BarChart {
    /// One bar per make of a growth series.
    pub fn from_series(series: &GrowthSeries) -> Self {
        let title = match series.metric {
            GrowthMetric::City | GrowthMetric::Highway => format!(
                "Annualized {} Efficiency Improvement by Make",
                series.metric.label()
            ),
            GrowthMetric::Price => "Annualized Price Increase by Make".to_string(),
        };

        Self {
            title,
            y_desc: format!("{} (% per year)", series.metric.rate_name()),
            bar_label: series.metric.rate_name().to_string(),
            bars: series
                .makes
                .iter()
                .map(|m| (m.make.clone(), m.rate))
                .collect(),
            reference: None,
        }
    }

    pub fn with_reference(mut self, label: impl Into<String>, value: f64) -> Self {
        self.reference = Some(ReferenceLine {
            label: label.into(),
            value,
        });
        self
    }

    /// Y axis range covering zero, every bar and the reference line, with
    /// room above for the legend.
    pub fn y_range(&self) -> (f64, f64) {
        let values = self
            .bars
            .iter()
            .map(|(_, v)| *v)
            .chain(self.reference.as_ref().map(|r| r.value))
            .filter(|v| v.is_finite());

        let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let max = if max - min > f64::EPSILON { max } else { min + 1.0 };
        let span = max - min;

        let lo = if min < 0.0 { min - span * BOTTOM_PAD } else { 0.0 };
        (lo, max + span * LEGEND_HEADROOM)
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a bar chart to a PNG file, overwriting any existing file.
    pub fn render_png(chart: &BarChart, path: &Path, size: (u32, u32)) -> Result<(), RenderError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.is_dir() {
                return Err(RenderError::MissingDirectory(dir.to_path_buf()));
            }
        }
        if chart.bars.is_empty() {
            warn!(title = %chart.title, "no makes with a defined rate, drawing empty chart");
        }

        let root = BitMapBackend::new(path, size).into_drawing_area();
        Self::draw(&root, chart)?;
        root.present()?;

        info!(path = %path.display(), bars = chart.bars.len(), "chart written");
        Ok(())
    }

    fn draw(
        root: &DrawingArea<BitMapBackend<'_>, Shift>,
        chart: &BarChart,
    ) -> Result<(), RenderError> {
        root.fill(&WHITE)?;

        // Bar i spans [i, i + 1]; an empty chart keeps a unit-wide axis
        let slots = chart.bars.len().max(1) as f64;
        let (y_min, y_max) = chart.y_range();

        let mut ctx = ChartBuilder::on(root)
            .caption(&chart.title, ("sans-serif", 28))
            .margin(15)
            .x_label_area_size(X_LABEL_AREA)
            .y_label_area_size(Y_LABEL_AREA)
            .build_cartesian_2d(0f64..slots, y_min..y_max)?;

        // Make labels are drawn below, the mesh only handles the y axis
        ctx.configure_mesh()
            .disable_x_mesh()
            .x_labels(0)
            .y_desc(&chart.y_desc)
            .axis_desc_style(("sans-serif", 16))
            .draw()?;

        ctx.draw_series(chart.bars.iter().enumerate().map(|(i, (_, value))| {
            let x = i as f64;
            let mut bar = Rectangle::new([(x, 0.0), (x + 1.0, *value)], BAR_COLOR.filled());
            bar.set_margin(0, 0, 6, 6);
            bar
        }))?
        .label(&chart.bar_label)
        .legend(|(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], BAR_COLOR.filled()));

        // Rotated text starts at the anchor and runs downward
        let label_style = TextStyle::from(("sans-serif", 14).into_font())
            .transform(FontTransform::Rotate90)
            .pos(Pos::new(HPos::Left, VPos::Center));
        for (i, (make, _)) in chart.bars.iter().enumerate() {
            let (x, y) = ctx.backend_coord(&(i as f64 + 0.5, y_min));
            root.draw(&PathElement::new(vec![(x, y), (x, y + TICK_SIZE)], BLACK))?;
            root.draw(&Text::new(
                make.clone(),
                (x, y + TICK_SIZE + 3),
                label_style.clone(),
            ))?;
        }

        if let Some(reference) = &chart.reference {
            ctx.draw_series(LineSeries::new(
                [(0.0, reference.value), (slots, reference.value)],
                REFERENCE_COLOR.stroke_width(2),
            ))?
            .label(&reference.label)
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], REFERENCE_COLOR.stroke_width(2))
            });
        }

        ctx.configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        Ok(())
    }
}
