use chrono::NaiveDate;
use std::fmt::Write;
use std::sync::Arc;

use crate::core::coordinator::{Dashboard, IndicatorEdit};
use crate::error::{DashboardError, Result};
use crate::indicators::cycle::halving_projections;
use crate::indicators::registry::CYCLE_ID;
use crate::models::{Indicator, Snapshot};

/// Parse a user-typed reading. Empty, non-numeric and non-finite text is rejected.
pub fn parse_number(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| DashboardError::InvalidInput(format!("'{}' is not a number", text)))?;
    if !value.is_finite() {
        return Err(DashboardError::InvalidInput(format!("'{}' is not a finite number", text)));
    }
    Ok(value)
}

/// Manual edit from raw text fields. Both fields are parsed before anything
/// is applied, so a bad second field leaves the indicator untouched.
pub async fn edit_indicator(
    dashboard: &Dashboard,
    id: &str,
    value: Option<&str>,
    value2: Option<&str>,
) -> Result<Arc<Snapshot>> {
    let edit = IndicatorEdit {
        value: value.map(parse_number).transpose()?,
        value2: value2.map(parse_number).transpose()?,
    };
    dashboard.apply_manual_edit(id, edit).await
}

fn format_reading(ind: &Indicator) -> String {
    match ind.value2() {
        Some(v2) => format!("{} vs {}", ind.value(), v2),
        None => format!("{}", ind.value()),
    }
}

pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Bitcoin on-chain dashboard (v{})", snapshot.version);
    let _ = writeln!(out);

    for ind in &snapshot.indicators {
        let _ = writeln!(
            out,
            "  {:<28} {:>24} {}  [{}]",
            ind.meta.title,
            format_reading(ind),
            ind.meta.unit,
            ind.description()
        );
        let _ = writeln!(
            out,
            "  {:<28} buy: {} | sell: {}",
            "", ind.meta.buy_zone_label, ind.meta.sell_zone_label
        );
    }

    let rec = &snapshot.recommendation;
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rec.summary);
    if rec.buy_intensity > 0 || rec.sell_intensity > 0 {
        let _ = writeln!(out, "Intensity: buy {} / sell {}", rec.buy_intensity, rec.sell_intensity);
    }

    if let Some(report) = &snapshot.last_refresh {
        match (&report.error, report.price) {
            (Some(err), _) => {
                let _ = writeln!(out, "Last refresh failed at {}: {}", report.at.format("%Y-%m-%d %H:%M:%S UTC"), err);
            }
            (None, Some(price)) => {
                let _ = writeln!(out, "Last refresh at {}: {:.2}", report.at.format("%Y-%m-%d %H:%M:%S UTC"), price);
            }
            _ => {}
        }
    }
    if snapshot.persistence_degraded {
        let _ = writeln!(out, "Warning: storage unavailable, changes are kept in memory only");
    }
    out
}

/// Day count since the last halving plus the projected sell/buy windows.
pub fn format_cycle(snapshot: &Snapshot, today: NaiveDate) -> String {
    let mut out = String::new();
    if let Some(cycle) = snapshot.get(CYCLE_ID) {
        let anchor = cycle
            .meta
            .cycle_start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "Day {} of the cycle (since {})", cycle.value(), anchor);
        if let Some(next) = &cycle.meta.next_cycle_estimate {
            let _ = writeln!(out, "Next halving: {}", next);
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {:<4} {:<12} {:<18} {:<18}", "#", "Halving", "Sell window", "Buy window");
    for p in halving_projections(today) {
        let marker = if p.historic { " (past)" } else { "" };
        let _ = writeln!(
            out,
            "  {:<4} {:<12} {:<18} {:<18}{}",
            p.ordinal,
            p.halving.format("%Y-%m"),
            p.sell_window.label(),
            p.buy_window.label(),
            marker
        );
    }
    out
}
