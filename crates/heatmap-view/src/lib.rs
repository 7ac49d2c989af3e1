//! Heatmap View
//!
//! Everything between a loaded quote table and what the dashboard shows:
//! filtering and sorting, the sector treemap, the detail charts, and the
//! view state that drives them.

pub mod chart;
pub mod color;
pub mod session;
pub mod state;
pub mod table;
pub mod treemap;

pub use chart::{render_detail_chart, ChartKind, DEFAULT_CHART_SIZE};
pub use color::{DivergingScale, Rgb};
pub use session::{resolve_symbols, DashboardView, DetailView, Notice, Session, TREEMAP_SIZE};
pub use state::{reduce, Action, Stage, ViewState};
pub use table::{apply_filter, apply_search, apply_sort, apply_view, sectors_present};
pub use treemap::{format_change, squarify, Rect, SectorTile, SymbolTile, Treemap};
