//! Two-level squarified treemap: sectors outside, symbols inside.
//!
//! Tile area is proportional to market cap and fill color follows
//! [`DivergingScale`]. The layout is pure geometry; the page renders it.

use heatmap_core::QuoteRow;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::color::DivergingScale;

/// Height of the strip that carries the sector name
pub const HEADER_HEIGHT: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// True when the interiors overlap (shared edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-6;
        self.x + EPS < other.x + other.w
            && other.x + EPS < self.x + self.w
            && self.y + EPS < other.y + other.h
            && other.y + EPS < self.y + self.h
    }
}

/// Lay out `weights` inside `bounds`, returning one rectangle per weight in
/// input order. Non-positive or non-finite weights get an empty rectangle;
/// if no weight is positive the space is split equally.
pub fn squarify(weights: &[f64], bounds: Rect) -> Vec<Rect> {
    let mut out = vec![Rect::new(bounds.x, bounds.y, 0.0, 0.0); weights.len()];
    if weights.is_empty() || bounds.area() <= 0.0 {
        return out;
    }

    let mut clean: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    let mut total: f64 = clean.iter().sum();
    if total <= 0.0 {
        clean = vec![1.0; weights.len()];
        total = weights.len() as f64;
    }

    let scale = bounds.area() / total;
    let areas: Vec<f64> = clean.iter().map(|w| w * scale).collect();

    let mut order: Vec<usize> = (0..areas.len()).filter(|&i| areas[i] > 0.0).collect();
    order.sort_by(|&a, &b| areas[b].total_cmp(&areas[a]));

    let mut remaining = bounds;
    let mut row: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let idx = order[i];
        let side = remaining.w.min(remaining.h);
        let current = worst_ratio(&row, &areas, side);
        row.push(idx);
        let with_next = worst_ratio(&row, &areas, side);
        if row.len() == 1 || with_next <= current {
            i += 1;
        } else {
            row.pop();
            layout_row(&row, &areas, &mut remaining, &mut out);
            row.clear();
        }
    }
    if !row.is_empty() {
        layout_row(&row, &areas, &mut remaining, &mut out);
    }

    out
}

/// Worst aspect ratio of a row laid along a side of length `side`
fn worst_ratio(row: &[usize], areas: &[f64], side: f64) -> f64 {
    if row.is_empty() || side <= 0.0 {
        return f64::INFINITY;
    }
    let sum: f64 = row.iter().map(|&i| areas[i]).sum();
    let side_sq = side * side;
    let sum_sq = sum * sum;
    row.iter()
        .map(|&i| {
            let a = areas[i];
            (side_sq * a / sum_sq).max(sum_sq / (side_sq * a))
        })
        .fold(0.0, f64::max)
}

fn layout_row(row: &[usize], areas: &[f64], remaining: &mut Rect, out: &mut [Rect]) {
    let sum: f64 = row.iter().map(|&i| areas[i]).sum();
    if sum <= 0.0 {
        return;
    }

    if remaining.w >= remaining.h {
        // Column along the left edge
        let col_w = (sum / remaining.h).min(remaining.w);
        let mut y = remaining.y;
        for &i in row {
            let h = areas[i] / col_w;
            out[i] = Rect::new(remaining.x, y, col_w, h);
            y += h;
        }
        remaining.x += col_w;
        remaining.w = (remaining.w - col_w).max(0.0);
    } else {
        // Row along the top edge
        let row_h = (sum / remaining.w).min(remaining.h);
        let mut x = remaining.x;
        for &i in row {
            let w = areas[i] / row_h;
            out[i] = Rect::new(x, remaining.y, w, row_h);
            x += w;
        }
        remaining.y += row_h;
        remaining.h = (remaining.h - row_h).max(0.0);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolTile {
    pub symbol: String,
    pub rect: Rect,
    pub fill: String,
    pub dark: bool,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub price: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub change_pct: Decimal,
    /// Tooltip text: price and change
    pub hover: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectorTile {
    pub name: String,
    pub rect: Rect,
    pub accent: &'static str,
    pub market_cap: f64,
    pub tiles: Vec<SymbolTile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Treemap {
    pub width: f64,
    pub height: f64,
    pub scale: DivergingScale,
    pub sectors: Vec<SectorTile>,
}

/// `+1.25%`, `-0.40%`, `0.00%`
pub fn format_change(change: Decimal) -> String {
    if change > Decimal::ZERO {
        format!("+{:.2}%", change)
    } else {
        format!("{:.2}%", change)
    }
}

fn weight(row: &QuoteRow) -> f64 {
    if row.market_cap.is_finite() && row.market_cap > 0.0 {
        row.market_cap
    } else {
        0.0
    }
}

impl Treemap {
    /// Lay out `rows` on a `width` x `height` canvas. `None` when there is
    /// nothing to draw.
    pub fn layout(rows: &[QuoteRow], width: f64, height: f64) -> Option<Treemap> {
        if rows.is_empty() || width <= 0.0 || height <= 0.0 {
            return None;
        }

        // Group by sector, keeping first-seen order
        let mut groups: Vec<(String, Vec<&QuoteRow>)> = Vec::new();
        for row in rows {
            match groups.iter_mut().find(|(name, _)| *name == row.sector) {
                Some((_, members)) => members.push(row),
                None => groups.push((row.sector.clone(), vec![row])),
            }
        }

        let scale = DivergingScale::for_changes(rows.iter().filter_map(|r| r.change_pct.to_f64()));

        let sector_weights: Vec<f64> = groups
            .iter()
            .map(|(_, members)| members.iter().map(|r| weight(r)).sum())
            .collect();
        let sector_rects = squarify(&sector_weights, Rect::new(0.0, 0.0, width, height));

        let sectors = groups
            .into_iter()
            .zip(sector_rects)
            .zip(sector_weights)
            .map(|(((name, members), rect), market_cap)| {
                let body = if rect.h > HEADER_HEIGHT * 2.0 {
                    Rect::new(rect.x, rect.y + HEADER_HEIGHT, rect.w, rect.h - HEADER_HEIGHT)
                } else {
                    rect
                };
                let weights: Vec<f64> = members.iter().map(|r| weight(r)).collect();
                let tiles = squarify(&weights, body)
                    .into_iter()
                    .zip(members)
                    .map(|(rect, row)| {
                        let color = scale.color(row.change_pct.to_f64().unwrap_or(0.0));
                        SymbolTile {
                            symbol: row.symbol.clone(),
                            rect,
                            fill: color.to_hex(),
                            dark: color.is_dark(),
                            price: row.price,
                            change_pct: row.change_pct,
                            hover: format!(
                                "{}\nPrice: {:.2}\nChange (%): {}",
                                row.symbol,
                                row.price,
                                format_change(row.change_pct)
                            ),
                        }
                    })
                    .collect();

                SectorTile {
                    accent: symbol_catalog::sector_color(&name),
                    name,
                    rect,
                    market_cap,
                    tiles,
                }
            })
            .collect();

        Some(Treemap {
            width,
            height,
            scale,
            sectors,
        })
    }

    pub fn tiles(&self) -> impl Iterator<Item = &SymbolTile> {
        self.sectors.iter().flat_map(|s| s.tiles.iter())
    }
}
