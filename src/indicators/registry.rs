use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::Result;
use crate::indicators::cycle::cycle_days;
use crate::models::{DisplayScale, Indicator, IndicatorMetadata, ZoneRule};

pub const CYCLE_ID: &str = "cycle";
pub const REALIZED_PRICE_ID: &str = "realized_price";

// ============================================================================
// STATIC INDICATOR REGISTRY
// ============================================================================

// Helper macro to reduce boilerplate
macro_rules! ind {
    ($id:expr, $title:expr, $unit:expr, $rule:expr, $scale:expr, $buy:expr, $sell:expr, $url:expr, $concept:expr, $details:expr) => {
        IndicatorMetadata {
            id: $id.to_string(),
            title: $title.to_string(),
            concept: $concept.to_string(),
            details: $details.to_string(),
            unit: $unit.to_string(),
            buy_zone_label: $buy.to_string(),
            sell_zone_label: $sell.to_string(),
            rule: $rule,
            scale: $scale,
            source_url: $url.map(|s: &str| s.to_string()),
            cycle_start_date: None,
            next_cycle_estimate: None,
        }
    };
}

fn scale(min: f64, max: f64) -> Option<DisplayScale> {
    Some(DisplayScale { min, max })
}

/// Metadata plus the seed readings used when nothing was persisted.
struct Seed {
    meta: IndicatorMetadata,
    value: f64,
    value2: Option<f64>,
}

static SEEDS: Lazy<Vec<Seed>> = Lazy::new(|| {
    let mut cycle = ind!(CYCLE_ID, "Halving Cycle", "days",
        ZoneRule::DualRange { buy_min: 800.0, buy_max: 1000.0, sell_min: 500.0, sell_max: 600.0 },
        scale(0.0, 1600.0), "800-1000 days", "500-600 days (overheated)",
        Some("https://www.lookintobitcoin.com/charts/bitcoin-halving-cycle/"),
        "Uses the Bitcoin halving as the anchor to time long-term market tops and bottoms.",
        "Historically 800 to 1000 days after a halving has been a good time to buy. This stretch usually matches the accumulation phase of the market.");
    cycle.cycle_start_date = NaiveDate::from_ymd_opt(2024, 4, 20);
    cycle.next_cycle_estimate = Some("April 2028 (est.)".to_string());

    vec![
        Seed { meta: cycle, value: 0.0, value2: None },
        Seed {
            meta: ind!(REALIZED_PRICE_ID, "Realized Price", "$", ZoneRule::Comparison, None,
                "BTC Price < LTH Realized Price", "N/A",
                Some("https://www.bitcoinmagazinepro.com/charts/long-term-holder-realized-price/"),
                "Compares the long-term holder cost basis with the current BTC price to spot undervaluation.",
                "The long-term holder realized price is the average price at which long-term holders last moved their coins. A BTC price below it has historically been a strong buying opportunity: the market is in deep fear and even long-term holders are at a loss on average."),
            value: 67123.45,
            value2: Some(58345.67),
        },
        Seed {
            meta: ind!("mvrv", "MVRV Z-Score", "",
                ZoneRule::DualRange { buy_min: -1.0, buy_max: 0.0, sell_min: 7.0, sell_max: 8.0 },
                scale(-1.0, 8.0), "< 0", "> 7 (overheated)",
                Some("https://www.bitcoinmagazinepro.com/charts/mvrv-zscore/"),
                "Measures whether Bitcoin's market value is over- or undervalued against its realized value.",
                "The MVRV Z-Score flags cycle tops (red) and bottoms (green). Below 0 is a buy signal, above 7 a sell signal."),
            value: 2.65,
            value2: None,
        },
        Seed {
            meta: ind!("nupl", "NUPL (Net Unrealized Profit/Loss)", "",
                ZoneRule::SingleThreshold { buy_below: 0.0, sell_above: 0.75 },
                scale(-0.5, 1.0), "< 0 (Capitulation)", "> 0.75 (Euphoria)",
                Some("https://www.bitcoinmagazinepro.com/charts/relative-unrealized-profit--loss/"),
                "Sentiment gauge of the aggregate unrealized profit or loss of market participants.",
                "NUPL shows overall profitability. The Capitulation stage (< 0) is a buy signal, the Euphoria stage (> 0.75) a sell signal."),
            value: 0.56,
            value2: None,
        },
        Seed {
            meta: ind!("puell", "Puell Multiple", "",
                ZoneRule::DualRange { buy_min: 0.0, buy_max: 0.5, sell_min: 4.0, sell_max: 5.0 },
                scale(0.0, 5.0), "< 0.5", "> 4 (overheated)",
                Some("https://www.bitcoinmagazinepro.com/charts/puell-multiple/"),
                "Reads miner profitability to find market bottoms and tops.",
                "The Puell Multiple tracks miner revenue. Below 0.5 (green) is a buy signal, above 4 (red) a sell signal."),
            value: 1.82,
            value2: None,
        },
    ]
});

static SEED_MAP: Lazy<HashMap<String, usize>> = Lazy::new(|| {
    SEEDS
        .iter()
        .enumerate()
        .map(|(idx, seed)| (seed.meta.id.clone(), idx))
        .collect()
});

// ============================================================================
// REGISTRY STRUCT & IMPL
// ============================================================================

pub struct Registry;

impl Registry {
    /// Fixed ids, in display order.
    pub fn ids() -> Vec<&'static str> {
        SEEDS.iter().map(|s| s.meta.id.as_str()).collect()
    }

    /// O(1) lookup by id
    pub fn get_metadata(id: &str) -> Option<IndicatorMetadata> {
        SEED_MAP
            .get(id)
            .and_then(|&idx| SEEDS.get(idx))
            .map(|s| s.meta.clone())
    }

    /// The built-in collection, classified, with the cycle count taken at `now`.
    pub fn defaults(now: DateTime<Utc>) -> Result<Vec<Indicator>> {
        SEEDS.iter().map(|seed| Self::default_for(seed, now)).collect()
    }

    fn default_for(seed: &Seed, now: DateTime<Utc>) -> Result<Indicator> {
        let value = match seed.meta.cycle_start_date {
            Some(anchor) => cycle_days(anchor, now),
            None => seed.value,
        };
        Indicator::new(seed.meta.clone(), value, seed.value2)
    }

    /// Recomputed day count for an indicator that carries a cycle anchor.
    pub fn cycle_value(meta: &IndicatorMetadata, now: DateTime<Utc>) -> Option<f64> {
        meta.cycle_start_date.map(|anchor| cycle_days(anchor, now))
    }
}
