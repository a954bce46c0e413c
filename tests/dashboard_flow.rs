use async_trait::async_trait;
use std::sync::Arc;

use onchain_dashboard_lib::analysis::recommendation::aggregate_statuses;
use onchain_dashboard_lib::analysis::RecommendationLevel;
use onchain_dashboard_lib::commands::indicator::edit_indicator;
use onchain_dashboard_lib::config::Config;
use onchain_dashboard_lib::core::coordinator::IndicatorEdit;
use onchain_dashboard_lib::core::scheduler::{PriceRefresher, TickOutcome};
use onchain_dashboard_lib::core::store::INDICATORS_KEY;
use onchain_dashboard_lib::db;
use onchain_dashboard_lib::error::{DashboardError, Result};
use onchain_dashboard_lib::fetcher::PriceSource;
use onchain_dashboard_lib::indicators::registry::REALIZED_PRICE_ID;
use onchain_dashboard_lib::models::{IndicatorStatus, PersistedIndicator};
use onchain_dashboard_lib::AppContext;

struct Unreachable;

#[async_trait]
impl PriceSource for Unreachable {
    fn name(&self) -> &str {
        "unreachable"
    }
    async fn fetch_price(&self) -> Result<f64> {
        Err(DashboardError::RefreshFailure("connection refused".to_string()))
    }
}

struct Spot(f64);

#[async_trait]
impl PriceSource for Spot {
    fn name(&self) -> &str {
        "spot"
    }
    async fn fetch_price(&self) -> Result<f64> {
        Ok(self.0)
    }
}

async fn context() -> AppContext {
    let pool = db::init_memory().await.expect("memory db");
    AppContext::with_pool(pool, Config::default()).await.expect("context")
}

#[tokio::test]
async fn edits_drive_the_recommendation() {
    let ctx = context().await;
    let snap = ctx.dashboard.snapshot();
    assert_eq!(snap.indicators.len(), 5);
    assert!(!snap.persistence_degraded);

    edit_indicator(&ctx.dashboard, "mvrv", Some("7.5"), None).await.unwrap();
    let snap = edit_indicator(&ctx.dashboard, "puell", Some("4.5"), None).await.unwrap();

    assert_eq!(snap.get("mvrv").unwrap().status(), IndicatorStatus::Bad);
    assert_eq!(snap.get("puell").unwrap().status(), IndicatorStatus::Bad);
    assert_eq!(snap.recommendation.sell_count, 2);
    assert_eq!(snap.recommendation.level, RecommendationLevel::Sell);
}

#[tokio::test]
async fn readings_survive_a_restart() {
    let pool = db::init_memory().await.unwrap();
    let first = AppContext::with_pool(pool.clone(), Config::default()).await.unwrap();
    first
        .dashboard
        .apply_manual_edit(REALIZED_PRICE_ID, IndicatorEdit { value: Some(50000.0), value2: Some(52000.0) })
        .await
        .unwrap();
    first
        .dashboard
        .apply_manual_edit("nupl", IndicatorEdit { value: Some(-0.1), value2: None })
        .await
        .unwrap();
    let before = first.dashboard.snapshot();

    let blob = db::get_setting(&pool, INDICATORS_KEY).await.unwrap().unwrap();
    let records: Vec<PersistedIndicator> = serde_json::from_str(&blob).unwrap();
    assert_eq!(records.len(), 5);

    let second = AppContext::with_pool(pool, Config::default()).await.unwrap();
    let after = second.dashboard.snapshot();
    for ind in &before.indicators {
        let restored = after.get(ind.id()).unwrap();
        assert_eq!(restored.value(), ind.value());
        assert_eq!(restored.value2(), ind.value2());
        assert_eq!(restored.status(), ind.status());
    }
    assert_eq!(after.get(REALIZED_PRICE_ID).unwrap().status(), IndicatorStatus::Good);
    assert_eq!(after.get("nupl").unwrap().description(), "buy (capitulation)");
}

#[tokio::test]
async fn corrupt_slot_starts_from_defaults() {
    let pool = db::init_memory().await.unwrap();
    db::save_setting(&pool, INDICATORS_KEY, "{not json").await.unwrap();

    let ctx = AppContext::with_pool(pool.clone(), Config::default()).await.unwrap();
    let snap = ctx.dashboard.snapshot();
    assert_eq!(snap.get("mvrv").unwrap().value(), 2.65);

    // Startup flush replaced the corrupt blob
    let blob = db::get_setting(&pool, INDICATORS_KEY).await.unwrap().unwrap();
    assert!(serde_json::from_str::<Vec<PersistedIndicator>>(&blob).is_ok());
}

#[tokio::test]
async fn failed_refresh_keeps_previous_reading() {
    let ctx = context().await;
    let before = ctx.dashboard.snapshot();
    let card = before.get(REALIZED_PRICE_ID).unwrap().clone();

    let refresher = PriceRefresher::new(ctx.dashboard.clone(), Arc::new(Unreachable), REALIZED_PRICE_ID);
    assert!(matches!(refresher.refresh_once().await, TickOutcome::Failed(_)));

    let after = ctx.dashboard.snapshot();
    let same = after.get(REALIZED_PRICE_ID).unwrap();
    assert_eq!(same.value(), card.value());
    assert_eq!(same.value2(), card.value2());
    assert_eq!(same.status(), card.status());

    let report = after.last_refresh.as_ref().unwrap();
    assert!(report.error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(report.price, None);
}

#[tokio::test]
async fn refresh_below_realized_price_is_buy() {
    let ctx = context().await;
    let refresher = PriceRefresher::new(ctx.dashboard.clone(), Arc::new(Spot(55000.0)), REALIZED_PRICE_ID);
    let TickOutcome::Applied(snap) = refresher.refresh_once().await else {
        panic!("refresh not applied");
    };
    let card = snap.get(REALIZED_PRICE_ID).unwrap();
    assert_eq!(card.value(), 55000.0);
    assert_eq!(card.value2(), Some(58345.67));
    assert_eq!(card.status(), IndicatorStatus::Good);
}

#[tokio::test]
async fn rejected_edits_leave_state_untouched() {
    let ctx = context().await;
    let before = ctx.dashboard.snapshot();

    let missing = ctx
        .dashboard
        .apply_manual_edit("sopr", IndicatorEdit { value: Some(1.0), value2: None })
        .await;
    assert!(matches!(missing, Err(DashboardError::NotFound(_))));

    let bad = edit_indicator(&ctx.dashboard, "mvrv", Some("seven"), None).await;
    assert!(matches!(bad, Err(DashboardError::InvalidInput(_))));

    let stray = ctx
        .dashboard
        .apply_manual_edit("mvrv", IndicatorEdit { value: None, value2: Some(3.0) })
        .await;
    assert!(matches!(stray, Err(DashboardError::InvalidInput(_))));

    let after = ctx.dashboard.snapshot();
    assert_eq!(after.version, before.version);
    assert_eq!(after.get("mvrv").unwrap().value(), 2.65);
}

#[test]
fn two_sells_outweigh_one_buy() {
    use IndicatorStatus::*;
    let rec = aggregate_statuses([Bad, Bad, Neutral, Good, Neutral]);
    assert_eq!(rec.sell_count, 2);
    assert_eq!(rec.buy_count, 1);
    assert_eq!(rec.level, RecommendationLevel::Sell);
}
