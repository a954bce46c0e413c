use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Peak (sell) window opens this many months after a halving.
const SELL_WINDOW_MONTHS: (u32, u32) = (17, 18);
/// Bottom (buy) window, roughly two and a half years after a halving.
const BUY_WINDOW_MONTHS: (u32, u32) = (29, 30);

/// Days elapsed since `anchor` (taken at 00:00 UTC), rounded up.
pub fn cycle_days(anchor: NaiveDate, now: DateTime<Utc>) -> f64 {
    let start = anchor.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let seconds = (now - start).num_seconds().abs() as f64;
    (seconds / SECONDS_PER_DAY).ceil()
}

/// Halving months, past and projected.
pub const HALVINGS: [(u32, i32, u32); 9] = [
    (2, 2016, 7),
    (3, 2020, 5),
    (4, 2024, 4),
    (5, 2028, 4),
    (6, 2032, 3),
    (7, 2036, 3),
    (8, 2040, 2),
    (9, 2044, 1),
    (10, 2047, 12),
];

/// Observed peak and bottom months of cycles that have played out. These
/// replace the projected windows for their halving.
const RECORDED_WINDOWS: [(u32, (i32, u32), (i32, u32)); 2] = [
    (2, (2017, 12), (2018, 12)),
    (3, (2021, 11), (2022, 11)),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    fn after(halving: NaiveDate, (from, to): (u32, u32)) -> Option<Self> {
        Some(MonthWindow {
            start: halving.checked_add_months(Months::new(from))?,
            end: halving.checked_add_months(Months::new(to))?,
        })
    }

    fn month((year, month): (i32, u32)) -> Option<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)?;
        Some(MonthWindow { start, end: start })
    }

    pub fn label(&self) -> String {
        if self.start == self.end {
            format!("{}-{:02}", self.start.year(), self.start.month())
        } else if self.start.year() == self.end.year() {
            format!("{}-{:02} ~ {:02}", self.start.year(), self.start.month(), self.end.month())
        } else {
            format!(
                "{}-{:02} ~ {}-{:02}",
                self.start.year(),
                self.start.month(),
                self.end.year(),
                self.end.month()
            )
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HalvingProjection {
    pub ordinal: u32,
    pub halving: NaiveDate,
    pub sell_window: MonthWindow,
    pub buy_window: MonthWindow,
    /// Buy window already closed as of the projection date
    pub historic: bool,
}

/// Projected peak/bottom windows for every known halving.
pub fn halving_projections(today: NaiveDate) -> Vec<HalvingProjection> {
    HALVINGS
        .iter()
        .filter_map(|&(ordinal, year, month)| {
            let halving = NaiveDate::from_ymd_opt(year, month, 1)?;
            let (sell_window, buy_window) = match RECORDED_WINDOWS.iter().find(|r| r.0 == ordinal) {
                Some(&(_, peak, bottom)) => (MonthWindow::month(peak)?, MonthWindow::month(bottom)?),
                None => (
                    MonthWindow::after(halving, SELL_WINDOW_MONTHS)?,
                    MonthWindow::after(halving, BUY_WINDOW_MONTHS)?,
                ),
            };
            let historic = buy_window.end < today;
            Some(HalvingProjection { ordinal, halving, sell_window, buy_window, historic })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_cycle_days_rounds_up() {
        let anchor = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let exact = Utc.with_ymd_and_hms(2024, 4, 30, 0, 0, 0).unwrap();
        assert_eq!(cycle_days(anchor, exact), 10.0);

        let later = Utc.with_ymd_and_hms(2024, 4, 30, 6, 0, 0).unwrap();
        assert_eq!(cycle_days(anchor, later), 11.0);
    }

    #[test]
    fn test_cycle_days_before_anchor_is_absolute() {
        let anchor = NaiveDate::from_ymd_opt(2024, 4, 20).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 4, 18, 0, 0, 0).unwrap();
        assert_eq!(cycle_days(anchor, before), 2.0);
    }

    #[test]
    fn test_projection_windows() {
        let today = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let table = halving_projections(today);
        assert_eq!(table.len(), HALVINGS.len());

        let fourth = table.iter().find(|p| p.ordinal == 4).unwrap();
        assert_eq!(fourth.sell_window.label(), "2025-09 ~ 10");
        assert_eq!(fourth.buy_window.label(), "2026-09 ~ 10");
        assert!(!fourth.historic);

        let second = table.iter().find(|p| p.ordinal == 2).unwrap();
        assert_eq!(second.sell_window.start, NaiveDate::from_ymd_opt(2017, 12, 1).unwrap());
        assert_eq!(second.buy_window.start, NaiveDate::from_ymd_opt(2018, 12, 1).unwrap());
        assert!(second.historic);

        let third = table.iter().find(|p| p.ordinal == 3).unwrap();
        assert_eq!(third.sell_window.label(), "2021-11");
        assert_eq!(third.buy_window.label(), "2022-11");
        assert!(third.historic);

        let last = table.last().unwrap();
        assert_eq!(last.sell_window.label(), "2049-05 ~ 06");
    }
}
