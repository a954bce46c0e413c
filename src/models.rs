use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::recommendation::Recommendation;
use crate::error::{DashboardError, Result};
use crate::indicators::classifier::{classify, Classification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorStatus {
    Good,    // buy
    Neutral, // wait
    Bad,     // sell
}

/// Zone rule of an indicator. Dispatch happens on this tag, never on the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneRule {
    /// Inclusive `[buy_min, buy_max]` and `[sell_min, sell_max]`. Buy is checked first.
    DualRange {
        buy_min: f64,
        buy_max: f64,
        sell_min: f64,
        sell_max: f64,
    },
    /// `value < buy_below` is buy, `value > sell_above` is sell.
    SingleThreshold { buy_below: f64, sell_above: f64 },
    /// `value < value2` is buy. No sell state.
    Comparison,
}

impl ZoneRule {
    pub fn requires_value2(&self) -> bool {
        matches!(self, ZoneRule::Comparison)
    }
}

/// Display range of the gauge the indicator is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayScale {
    pub min: f64,
    pub max: f64,
}

/// Static, never recomputed part of an indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorMetadata {
    pub id: String,
    pub title: String,
    pub concept: String,
    pub details: String,
    pub unit: String,
    pub buy_zone_label: String,
    pub sell_zone_label: String,
    pub rule: ZoneRule,
    pub scale: Option<DisplayScale>,
    pub source_url: Option<String>,
    pub cycle_start_date: Option<NaiveDate>,
    pub next_cycle_estimate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Indicator {
    #[serde(flatten)]
    pub meta: IndicatorMetadata,
    value: f64,
    value2: Option<f64>,
    status: IndicatorStatus,
    description: String,
}

impl Indicator {
    /// Builds a classified indicator. Rejects readings that do not fit the rule:
    /// a comparison without `value2`, or `value2` on any other rule.
    pub fn new(meta: IndicatorMetadata, value: f64, value2: Option<f64>) -> Result<Self> {
        check_readings(&meta, value, value2)?;
        let Classification { status, description } = classify(&meta.rule, value, value2)?;
        Ok(Indicator {
            meta,
            value,
            value2,
            status,
            description: description.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        &self.meta.id
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn value2(&self) -> Option<f64> {
        self.value2
    }

    pub fn status(&self) -> IndicatorStatus {
        self.status
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Replaces the readings and reclassifies in one step. On error nothing changes.
    pub(crate) fn set_readings(&mut self, value: f64, value2: Option<f64>) -> Result<()> {
        check_readings(&self.meta, value, value2)?;
        let Classification { status, description } = classify(&self.meta.rule, value, value2)?;
        self.value = value;
        self.value2 = value2;
        self.status = status;
        self.description = description.to_string();
        Ok(())
    }

    pub fn to_persisted(&self) -> PersistedIndicator {
        PersistedIndicator {
            id: self.meta.id.clone(),
            value: self.value,
            value2: self.value2,
            status: self.status,
            description: self.description.clone(),
        }
    }
}

fn check_readings(meta: &IndicatorMetadata, value: f64, value2: Option<f64>) -> Result<()> {
    if !value.is_finite() || value2.is_some_and(|v| !v.is_finite()) {
        return Err(DashboardError::InvalidInput(format!(
            "{}: readings must be finite numbers",
            meta.id
        )));
    }
    match (meta.rule.requires_value2(), value2.is_some()) {
        (true, false) => Err(DashboardError::InvalidInput(format!(
            "{}: comparison rule requires value2",
            meta.id
        ))),
        (false, true) => Err(DashboardError::InvalidInput(format!(
            "{}: value2 is only valid for comparison rules",
            meta.id
        ))),
        _ => Ok(()),
    }
}

/// What lands in the durable slot. Status/description are stored for readers of
/// the raw blob but are always recomputed on restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedIndicator {
    pub id: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<f64>,
    pub status: IndicatorStatus,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    pub at: DateTime<Utc>,
    pub price: Option<f64>,
    pub error: Option<String>,
}

/// Immutable view handed to the rendering side after every state change.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub version: u64,
    pub indicators: Vec<Indicator>,
    pub recommendation: Recommendation,
    pub last_refresh: Option<RefreshReport>,
    pub persistence_degraded: bool,
}

impl Snapshot {
    pub fn get(&self, id: &str) -> Option<&Indicator> {
        self.indicators.iter().find(|i| i.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison_meta() -> IndicatorMetadata {
        IndicatorMetadata {
            id: "realized_price".to_string(),
            title: "Realized Price".to_string(),
            concept: String::new(),
            details: String::new(),
            unit: "$".to_string(),
            buy_zone_label: "BTC Price < LTH Realized Price".to_string(),
            sell_zone_label: "N/A".to_string(),
            rule: ZoneRule::Comparison,
            scale: None,
            source_url: None,
            cycle_start_date: None,
            next_cycle_estimate: None,
        }
    }

    #[test]
    fn test_comparison_without_value2_is_rejected() {
        let result = Indicator::new(comparison_meta(), 60000.0, None);
        assert!(matches!(result, Err(DashboardError::InvalidInput(_))));
    }

    #[test]
    fn test_set_readings_failure_leaves_state() {
        let mut ind = Indicator::new(comparison_meta(), 60000.0, Some(58000.0)).unwrap();
        assert_eq!(ind.status(), IndicatorStatus::Neutral);

        assert!(ind.set_readings(f64::NAN, Some(58000.0)).is_err());
        assert_eq!(ind.value(), 60000.0);
        assert_eq!(ind.status(), IndicatorStatus::Neutral);

        ind.set_readings(50000.0, Some(58000.0)).unwrap();
        assert_eq!(ind.status(), IndicatorStatus::Good);
        assert_eq!(ind.description(), "buy");
    }

    #[test]
    fn test_persisted_skips_missing_value2() {
        let record = PersistedIndicator {
            id: "nupl".to_string(),
            value: 0.56,
            value2: None,
            status: IndicatorStatus::Neutral,
            description: "wait".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("value2").is_none());
        assert_eq!(json["status"], "neutral");
    }
}
