//! Detail charts for a single symbol, rendered to SVG with plotters

use chrono::{Duration, NaiveDate};
use heatmap_core::{Bar, HeatmapError};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CHART_SIZE: (u32, u32) = (960, 420);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Candlestick,
    Line,
}

impl ChartKind {
    pub fn all() -> [ChartKind; 2] {
        [ChartKind::Candlestick, ChartKind::Line]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Candlestick => "candlestick",
            ChartKind::Line => "line",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Candlestick => "Candlestick",
            ChartKind::Line => "Line",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = HeatmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "candlestick" | "candle" => Ok(ChartKind::Candlestick),
            "line" => Ok(ChartKind::Line),
            other => Err(HeatmapError::InvalidData(format!("unknown chart kind: {}", other))),
        }
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> HeatmapError {
    HeatmapError::RenderError(e.to_string())
}

/// Render `bars` as an SVG document.
///
/// Candlesticks are green when close >= open and red otherwise. The line
/// variant plots closes only.
pub fn render_detail_chart(
    symbol: &str,
    bars: &[Bar],
    kind: ChartKind,
    size: (u32, u32),
) -> Result<String, HeatmapError> {
    if bars.is_empty() {
        return Err(HeatmapError::InsufficientData(format!("No data to chart for {}", symbol)));
    }

    let dates: Vec<NaiveDate> = bars.iter().map(|b| b.timestamp.date_naive()).collect();
    let first = dates.iter().min().copied().unwrap_or_default();
    let last = dates.iter().max().copied().unwrap_or_default();

    let (low, high) = match kind {
        ChartKind::Candlestick => bars.iter().fold((f64::MAX, f64::MIN), |(lo, hi), b| {
            (lo.min(b.low).min(b.close), hi.max(b.high).max(b.close))
        }),
        ChartKind::Line => bars
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), b| (lo.min(b.close), hi.max(b.close))),
    };
    if !low.is_finite() || !high.is_finite() {
        return Err(HeatmapError::InvalidData(format!("Non-finite prices for {}", symbol)));
    }
    let pad = ((high - low) * 0.05).max(high.abs() * 0.01).max(0.01);

    let title = format!("{} - {}", symbol, kind.label());
    let candle_width = ((size.0 as usize / (bars.len() + 2)) as u32).clamp(1, 12);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(12)
            .x_label_area_size(32)
            .y_label_area_size(60)
            .build_cartesian_2d(
                (first - Duration::days(1))..(last + Duration::days(1)),
                (low - pad)..(high + pad),
            )
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .light_line_style(WHITE.mix(0.3))
            .x_label_formatter(&|d: &NaiveDate| d.format("%m-%d").to_string())
            .y_label_formatter(&|v: &f64| format!("{:.2}", v))
            .draw()
            .map_err(render_err)?;

        match kind {
            ChartKind::Candlestick => {
                chart
                    .draw_series(bars.iter().zip(&dates).map(|(b, d)| {
                        CandleStick::new(
                            *d,
                            b.open,
                            b.high,
                            b.low,
                            b.close,
                            GREEN.filled(),
                            RED.filled(),
                            candle_width,
                        )
                    }))
                    .map_err(render_err)?;
            }
            ChartKind::Line => {
                chart
                    .draw_series(LineSeries::new(
                        bars.iter().zip(&dates).map(|(b, d)| (*d, b.close)),
                        BLUE.stroke_width(2),
                    ))
                    .map_err(render_err)?;
            }
        }

        root.present().map_err(render_err)?;
    }

    Ok(svg)
}
