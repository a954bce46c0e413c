use crate::error::{DashboardError, Result};
use crate::models::{IndicatorStatus, ZoneRule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: IndicatorStatus,
    pub description: &'static str,
}

const BUY: Classification = Classification { status: IndicatorStatus::Good, description: "buy" };
const WAIT: Classification = Classification { status: IndicatorStatus::Neutral, description: "wait" };
const SELL: Classification = Classification { status: IndicatorStatus::Bad, description: "sell" };

/// Classify one indicator's readings against its own rule.
///
/// Range bounds are inclusive on both ends. For a dual range the buy check
/// runs first, so a value inside overlapping ranges is a buy.
/// A comparison without `value2` is an invalid configuration, not a neutral reading.
pub fn classify(rule: &ZoneRule, value: f64, value2: Option<f64>) -> Result<Classification> {
    match rule {
        ZoneRule::DualRange { buy_min, buy_max, sell_min, sell_max } => {
            Ok(classify_dual_range(value, (*buy_min, *buy_max), (*sell_min, *sell_max)))
        }
        ZoneRule::SingleThreshold { buy_below, sell_above } => {
            Ok(classify_single_threshold(value, *buy_below, *sell_above))
        }
        ZoneRule::Comparison => {
            let reference = value2.ok_or_else(|| {
                DashboardError::InvalidInput("comparison rule requires a second value".to_string())
            })?;
            Ok(classify_comparison(value, reference))
        }
    }
}

fn in_range(value: f64, (min, max): (f64, f64)) -> bool {
    value >= min && value <= max
}

fn classify_dual_range(value: f64, buy: (f64, f64), sell: (f64, f64)) -> Classification {
    if in_range(value, buy) {
        BUY
    } else if in_range(value, sell) {
        SELL
    } else {
        WAIT
    }
}

fn classify_single_threshold(value: f64, buy_below: f64, sell_above: f64) -> Classification {
    if value < buy_below {
        Classification { status: IndicatorStatus::Good, description: "buy (capitulation)" }
    } else if value > sell_above {
        Classification { status: IndicatorStatus::Bad, description: "sell (euphoria)" }
    } else {
        WAIT
    }
}

fn classify_comparison(value: f64, reference: f64) -> Classification {
    if value < reference {
        BUY
    } else {
        WAIT
    }
}
