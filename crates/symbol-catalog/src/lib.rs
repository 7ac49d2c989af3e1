//! Symbol Catalog
//!
//! Static baskets of tickers per market and the ticker-to-sector table used
//! to group the heatmap.

pub mod markets;
pub mod sectors;

pub use markets::{etf_choices, is_etf_choice, symbols_for, MarketListing};
pub use sectors::{sector_color, sector_of, UNKNOWN_SECTOR};
