use serde::Serialize;

use crate::models::{Indicator, IndicatorStatus};

// =============================================================================
// AGGREGATE RECOMMENDATION
// Every indicator (the cycle one included) votes with its status.
// Sell is checked first: two sells outweigh any number of buys.
// =============================================================================

pub const SELL_THRESHOLD: usize = 2;
pub const BUY_THRESHOLD: usize = 2;
pub const MAX_INTENSITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationLevel {
    Buy,
    Wait,
    Sell,
}

impl RecommendationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RecommendationLevel::Buy => "buy",
            RecommendationLevel::Wait => "wait",
            RecommendationLevel::Sell => "consider selling",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub level: RecommendationLevel,
    pub buy_count: usize,
    pub sell_count: usize,
    pub total_count: usize,
    /// Strength step for the UI scale, 0..=MAX_INTENSITY
    pub buy_intensity: usize,
    pub sell_intensity: usize,
    pub summary: String,
}

pub fn aggregate(indicators: &[Indicator]) -> Recommendation {
    aggregate_statuses(indicators.iter().map(Indicator::status))
}

pub fn aggregate_statuses<I>(statuses: I) -> Recommendation
where
    I: IntoIterator<Item = IndicatorStatus>,
{
    let (mut buy_count, mut sell_count, mut total_count) = (0, 0, 0);
    for status in statuses {
        total_count += 1;
        match status {
            IndicatorStatus::Good => buy_count += 1,
            IndicatorStatus::Bad => sell_count += 1,
            IndicatorStatus::Neutral => {}
        }
    }

    let intensity = |count: usize| count.saturating_sub(1).min(MAX_INTENSITY);

    let (level, buy_intensity, sell_intensity) = if sell_count >= SELL_THRESHOLD {
        (RecommendationLevel::Sell, 0, intensity(sell_count))
    } else if buy_count >= BUY_THRESHOLD {
        (RecommendationLevel::Buy, intensity(buy_count), 0)
    } else {
        (RecommendationLevel::Wait, 0, 0)
    };

    Recommendation {
        level,
        buy_count,
        sell_count,
        total_count,
        buy_intensity,
        sell_intensity,
        summary: summary(level, buy_count, sell_count, total_count),
    }
}

fn summary(level: RecommendationLevel, buy: usize, sell: usize, total: usize) -> String {
    let verdict = match level {
        RecommendationLevel::Buy => format!(
            "at least {} indicators are in the buy zone, consider accumulating in stages",
            BUY_THRESHOLD
        ),
        RecommendationLevel::Sell => format!(
            "at least {} indicators are in the sell zone, consider scaling out to manage risk",
            SELL_THRESHOLD
        ),
        RecommendationLevel::Wait => "no clear signal yet, wait for the market to pick a direction".to_string(),
    };
    format!(
        "{} of {} indicators in the buy zone, {} of {} in the sell zone: {} ({}).",
        buy,
        total,
        sell,
        total,
        level.label(),
        verdict
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use IndicatorStatus::{Bad, Good, Neutral};

    #[test]
    fn test_sell_scenario() {
        let rec = aggregate_statuses([Bad, Bad, Neutral, Good, Neutral]);
        assert_eq!(rec.sell_count, 2);
        assert_eq!(rec.buy_count, 1);
        assert_eq!(rec.level, RecommendationLevel::Sell);
        assert_eq!(rec.sell_intensity, 1);
        assert_eq!(rec.buy_intensity, 0);
    }

    #[test]
    fn test_single_sell_is_not_enough() {
        let rec = aggregate_statuses([Bad, Neutral, Neutral, Good, Neutral]);
        assert_eq!(rec.level, RecommendationLevel::Wait);
        assert_eq!((rec.buy_intensity, rec.sell_intensity), (0, 0));
    }

    #[test]
    fn test_buy_and_tie_break() {
        let rec = aggregate_statuses([Good, Good, Good, Neutral, Neutral]);
        assert_eq!(rec.level, RecommendationLevel::Buy);
        assert_eq!(rec.buy_intensity, 2);

        let tie = aggregate_statuses([Good, Good, Bad, Bad, Neutral]);
        assert_eq!(tie.level, RecommendationLevel::Sell);
    }

    #[test]
    fn test_intensity_is_capped() {
        let rec = aggregate_statuses(vec![Bad; 9]);
        assert_eq!(rec.sell_intensity, MAX_INTENSITY);
    }

    #[test]
    fn test_order_independent() {
        let base = [Bad, Good, Neutral, Good, Bad];
        let expected = aggregate_statuses(base);
        let mut permuted = base.to_vec();
        for shift in 0..base.len() {
            permuted.rotate_left(1);
            let rec = aggregate_statuses(permuted.clone());
            assert_eq!(rec, expected, "rotation {}", shift);
        }
        permuted.reverse();
        assert_eq!(aggregate_statuses(permuted), expected);
    }

    #[test]
    fn test_summary_reports_counts() {
        let rec = aggregate_statuses([Good, Neutral, Neutral, Neutral, Bad]);
        assert!(rec.summary.starts_with("1 of 5 indicators in the buy zone, 1 of 5 in the sell zone: wait"));
    }

    #[test]
    fn test_empty_collection_waits() {
        let rec = aggregate_statuses(Vec::new());
        assert_eq!(rec.level, RecommendationLevel::Wait);
        assert_eq!(rec.total_count, 0);
    }
}
