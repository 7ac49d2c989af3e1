//! Server-rendered dashboard page

use heatmap_core::{Market, Period, SortMode};
use heatmap_view::treemap::{format_change, HEADER_HEIGHT};
use heatmap_view::{ChartKind, DashboardView, Treemap};
use std::fmt::Write;

use crate::view_query::{sector_scope, state_query};

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Helvetica, Arial, sans-serif; margin: 24px; color: #222; }
h1 { font-size: 22px; margin: 0 0 12px; }
form.controls { display: flex; flex-wrap: wrap; gap: 12px 20px; align-items: flex-end; margin-bottom: 16px; }
form.controls label { display: flex; flex-direction: column; font-size: 12px; color: #555; gap: 4px; }
fieldset { border: 1px solid #ddd; padding: 4px 8px; font-size: 12px; }
.notice { background: #fff4e5; border: 1px solid #f0c36d; padding: 10px 14px; margin: 12px 0; }
.treemap { position: relative; border: 1px solid #ccc; overflow: hidden; }
.sector { position: absolute; box-sizing: border-box; border: 2px solid #fff; }
.sector-name { position: absolute; left: 4px; top: 1px; font-size: 12px; font-weight: 600; color: #fff; white-space: nowrap; overflow: hidden; }
.tile { position: absolute; box-sizing: border-box; border: 1px solid rgba(0,0,0,0.15); overflow: hidden; text-decoration: none; font-size: 12px; line-height: 1.3; padding: 3px; }
.tile.dark { color: #fff; }
.tile.light { color: #222; }
.legend { display: flex; align-items: center; gap: 8px; margin: 8px 0 20px; font-size: 12px; }
.legend .bar { width: 260px; height: 12px; border: 1px solid #ccc; }
table { border-collapse: collapse; font-size: 13px; }
th, td { border-bottom: 1px solid #eee; padding: 4px 10px; text-align: right; }
th:first-child, td:first-child, td.sector-cell { text-align: left; }
.up { color: #006d2c; } .down { color: #a50f15; }
footer { margin-top: 20px; font-size: 12px; color: #777; }
"#;

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("&#10;"),
            c => out.push(c),
        }
    }
    out
}

fn selected(flag: bool) -> &'static str {
    if flag {
        " selected"
    } else {
        ""
    }
}

fn checked(flag: bool) -> &'static str {
    if flag {
        " checked"
    } else {
        ""
    }
}

/// "2,500,000,000,000"
fn format_market_cap(cap: f64) -> String {
    let digits = format!("{:.0}", cap.max(0.0));
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn render_controls(out: &mut String, view: &DashboardView, auto_refresh_secs: u64) {
    let state = &view.state;
    out.push_str(r#"<form class="controls" method="get" action="/">"#);

    out.push_str(r#"<label>Market<select name="market">"#);
    for market in Market::all() {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            market.slug(),
            selected(market == state.market),
            escape_html(market.label())
        );
    }
    out.push_str("</select></label>");

    if state.market == Market::Etf {
        out.push_str(r#"<label>ETF<select name="etf">"#);
        for etf in symbol_catalog::etf_choices() {
            let _ = write!(
                out,
                r#"<option value="{0}"{1}>{0}</option>"#,
                etf,
                selected(state.etf.as_deref() == Some(*etf))
            );
        }
        out.push_str("</select></label>");
    }

    out.push_str(r#"<label>Period<select name="period">"#);
    for period in Period::selectable() {
        let _ = write!(
            out,
            r#"<option value="{0}"{1}>{0}</option>"#,
            period.as_str(),
            selected(period == state.period)
        );
    }
    out.push_str("</select></label>");

    if !view.sectors.is_empty() {
        out.push_str("<fieldset><legend>Sectors</legend>");
        let _ = write!(
            out,
            r#"<input type="hidden" name="sector_market" value="{}">"#,
            escape_html(&sector_scope(state))
        );
        for sector in &view.sectors {
            let on = state.sectors.as_ref().map_or(true, |s| s.contains(sector));
            let _ = write!(
                out,
                r#"<label style="flex-direction:row"><input type="checkbox" name="sector" value="{0}"{1}>{0}</label>"#,
                escape_html(sector),
                checked(on)
            );
        }
        out.push_str("</fieldset>");
    }

    out.push_str(r#"<label>Sort<select name="sort">"#);
    for sort in SortMode::all() {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            sort.as_str(),
            selected(sort == state.sort),
            escape_html(sort.label())
        );
    }
    out.push_str("</select></label>");

    let _ = write!(
        out,
        r#"<label>Search<input type="text" name="q" value="{}" placeholder="Symbol"></label>"#,
        escape_html(&state.search)
    );

    if !view.rows.is_empty() {
        let current = view.detail.as_ref().map(|d| d.symbol.as_str());
        out.push_str(r#"<label>Detail<select name="symbol">"#);
        for row in &view.rows {
            let _ = write!(
                out,
                r#"<option value="{0}"{1}>{0}</option>"#,
                escape_html(&row.symbol),
                selected(current == Some(row.symbol.as_str()))
            );
        }
        out.push_str("</select></label>");
    }

    out.push_str(r#"<label>Chart<select name="chart">"#);
    for kind in ChartKind::all() {
        let _ = write!(
            out,
            r#"<option value="{}"{}>{}</option>"#,
            kind.as_str(),
            selected(kind == state.chart),
            kind.label()
        );
    }
    out.push_str("</select></label>");

    if auto_refresh_secs > 0 {
        let _ = write!(
            out,
            r#"<label style="flex-direction:row"><input type="checkbox" name="refresh" value="1"{}>Auto refresh ({}s)</label>"#,
            checked(state.auto_refresh),
            auto_refresh_secs
        );
    }

    out.push_str(r#"<button type="submit">Update</button></form>"#);
}

fn render_treemap(out: &mut String, view: &DashboardView, treemap: &Treemap) {
    let _ = write!(
        out,
        r#"<div class="treemap" style="width:{:.0}px;height:{:.0}px">"#,
        treemap.width, treemap.height
    );
    for sector in &treemap.sectors {
        let _ = write!(
            out,
            r#"<div class="sector" style="left:{:.2}px;top:{:.2}px;width:{:.2}px;height:{:.2}px;background:{}" title="{}">"#,
            sector.rect.x,
            sector.rect.y,
            sector.rect.w,
            sector.rect.h,
            sector.accent,
            escape_html(&sector.name)
        );
        if sector.rect.h > HEADER_HEIGHT * 2.0 {
            let _ = write!(out, r#"<div class="sector-name">{}</div>"#, escape_html(&sector.name));
        }
        out.push_str("</div>");
    }
    for tile in treemap.tiles() {
        let href = format!("/?{}", state_query(&view.state, Some(&tile.symbol)));
        let _ = write!(
            out,
            r#"<a class="tile {}" href="{}" title="{}" style="left:{:.2}px;top:{:.2}px;width:{:.2}px;height:{:.2}px;background:{}">"#,
            if tile.dark { "dark" } else { "light" },
            escape_html(&href),
            escape_html(&tile.hover),
            tile.rect.x,
            tile.rect.y,
            tile.rect.w,
            tile.rect.h,
            tile.fill
        );
        // Tiny tiles keep only the tooltip
        if tile.rect.w > 40.0 && tile.rect.h > 28.0 {
            let _ = write!(
                out,
                "<strong>{}</strong><br>{}",
                escape_html(&tile.symbol),
                format_change(tile.change_pct)
            );
        }
        out.push_str("</a>");
    }
    out.push_str("</div>");

    let stops: Vec<String> = treemap
        .scale
        .legend()
        .iter()
        .map(|(offset, color)| format!("{} {:.0}%", color.to_hex(), offset * 100.0))
        .collect();
    let m = treemap.scale.max_abs();
    let _ = write!(
        out,
        r#"<div class="legend"><span>-{m:.2}%</span><div class="bar" style="background:linear-gradient(to right, {})"></div><span>+{m:.2}%</span></div>"#,
        stops.join(", "),
        m = m
    );
}

fn render_table(out: &mut String, view: &DashboardView) {
    out.push_str("<table><thead><tr><th>Symbol</th><th>Price</th><th>Change (%)</th><th>MarketCap</th><th>Sector</th></tr></thead><tbody>");
    for row in &view.rows {
        let class = if row.change_pct.is_sign_negative() && !row.change_pct.is_zero() {
            "down"
        } else if row.change_pct.is_zero() {
            ""
        } else {
            "up"
        };
        let cap = if row.market_cap_defaulted {
            "n/a".to_string()
        } else {
            format_market_cap(row.market_cap)
        };
        let _ = write!(
            out,
            r#"<tr><td>{}</td><td>{:.2}</td><td class="{}">{}</td><td>{}</td><td class="sector-cell">{}</td></tr>"#,
            escape_html(&row.symbol),
            row.price,
            class,
            format_change(row.change_pct),
            cap,
            escape_html(&row.sector)
        );
    }
    out.push_str("</tbody></table>");
}

fn render_detail(out: &mut String, view: &DashboardView) {
    let Some(detail) = &view.detail else {
        return;
    };
    let _ = write!(
        out,
        "<h2>{} &middot; 3 months</h2>",
        escape_html(&detail.symbol)
    );
    match &detail.svg {
        Some(svg) => out.push_str(svg),
        None => out.push_str(r#"<div class="notice">No chart data available for this symbol.</div>"#),
    }
}

/// Full HTML document for one dashboard render
pub fn render_page(view: &DashboardView, auto_refresh_secs: u64) -> String {
    let mut out = String::with_capacity(32 * 1024);
    out.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    if view.state.auto_refresh && auto_refresh_secs > 0 {
        let _ = write!(out, r#"<meta http-equiv="refresh" content="{}">"#, auto_refresh_secs);
    }
    let _ = write!(
        out,
        "<title>Stock Heatmap - {}</title><style>{}</style></head><body>",
        escape_html(view.state.market.label()),
        STYLE
    );
    out.push_str("<h1>Multi-Market Stock Heatmap</h1>");

    render_controls(&mut out, view, auto_refresh_secs);

    if let Some(notice) = view.notice {
        let _ = write!(out, r#"<div class="notice">{}</div>"#, notice.message());
    }

    if let Some(treemap) = &view.treemap {
        render_treemap(&mut out, view, treemap);
        render_table(&mut out, view);
        render_detail(&mut out, view);
    }

    let report = &view.report;
    let _ = write!(
        out,
        "<footer>Loaded {} of {} symbols",
        report.loaded, report.requested
    );
    if !report.skipped.is_empty() {
        let _ = write!(out, ", {} skipped", report.skipped.len());
    }
    if report.defaulted_market_caps > 0 {
        let _ = write!(out, ", {} without market cap", report.defaulted_market_caps);
    }
    let _ = write!(
        out,
        " &middot; data as of {}{}</footer></body></html>",
        view.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
        if view.cache_hit { " (cached)" } else { "" }
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape_html("AAPL\nPrice"), "AAPL&#10;Price");
    }

    #[test]
    fn test_format_market_cap() {
        assert_eq!(format_market_cap(2.5e12), "2,500,000,000,000");
        assert_eq!(format_market_cap(999.0), "999");
        assert_eq!(format_market_cap(1000.0), "1,000");
        assert_eq!(format_market_cap(0.0), "0");
    }
}
