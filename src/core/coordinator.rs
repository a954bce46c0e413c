use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::analysis::recommendation::aggregate;
use crate::core::store::IndicatorStore;
use crate::error::{DashboardError, Result};
use crate::models::{Indicator, RefreshReport, Snapshot};

/// Fields of a manual edit. Absent fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorEdit {
    pub value: Option<f64>,
    pub value2: Option<f64>,
}

impl IndicatorEdit {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.value2.is_none()
    }
}

/// Result of applying a refreshed price.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Applied(Arc<Snapshot>),
    /// A newer write to the same field landed after the ticket was issued
    Superseded { ticket: u64, newer: u64 },
}

struct DashboardState {
    indicators: Vec<Indicator>,
    version: u64,
    last_refresh: Option<RefreshReport>,
    /// Sequence number of the latest write to each indicator's primary value
    value_stamps: HashMap<String, u64>,
}

/// Owns the indicator collection. Every mutation runs
/// "read -> reclassify -> aggregate -> persist -> publish" under one lock, so no
/// reader sees a half-applied state and writes reach storage in order.
pub struct Dashboard {
    state: Mutex<DashboardState>,
    store: IndicatorStore,
    sequence: AtomicU64,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
}

impl Dashboard {
    /// Restore from storage (or defaults) and publish the first snapshot.
    pub async fn open(store: IndicatorStore, now: DateTime<Utc>) -> Result<Self> {
        let indicators = store.load(now).await?;
        info!("Loaded {} indicators", indicators.len());

        // The cycle count may have moved since the last session
        if let Err(e) = store.save(&indicators).await {
            warn!("Initial save failed: {}", e);
        }

        let state = DashboardState {
            indicators,
            version: 0,
            last_refresh: None,
            value_stamps: HashMap::new(),
        };
        let snapshot = Arc::new(build_snapshot(&state, store.is_degraded()));
        let (snapshot_tx, _) = watch::channel(snapshot);

        Ok(Dashboard {
            state: Mutex::new(state),
            store,
            sequence: AtomicU64::new(0),
            snapshot_tx,
        })
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_tx.borrow().clone()
    }

    /// Change feed for the rendering side.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_tx.subscribe()
    }

    /// Monotonic ticket shared by manual edits and price refreshes.
    pub fn next_ticket(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Merge `edit` into indicator `id`, reclassify, aggregate, persist.
    pub async fn apply_manual_edit(&self, id: &str, edit: IndicatorEdit) -> Result<Arc<Snapshot>> {
        let mut state = self.state.lock().await;
        let idx = find(&state.indicators, id)?;

        if edit.is_empty() {
            debug!("Empty edit for {}, nothing to do", id);
            return Ok(self.snapshot());
        }

        let current = &state.indicators[idx];
        let value = edit.value.unwrap_or(current.value());
        let value2 = edit.value2.or(current.value2());

        let mut updated = current.clone();
        updated.set_readings(value, value2)?;
        state.indicators[idx] = updated;

        if edit.value.is_some() {
            let ticket = self.next_ticket();
            state.value_stamps.insert(id.to_string(), ticket);
        }

        info!(
            "Manual edit {}: value={} value2={:?} -> {:?}",
            id,
            value,
            value2,
            state.indicators[idx].status()
        );
        Ok(self.commit(&mut state, true).await)
    }

    /// Overwrite only the primary value of `id` with a fetched price, unless a
    /// newer write to that value was applied after `ticket` was issued.
    pub async fn apply_refreshed_price(&self, id: &str, price: f64, ticket: u64) -> Result<RefreshOutcome> {
        let mut state = self.state.lock().await;
        let idx = find(&state.indicators, id)?;

        if let Some(&newer) = state.value_stamps.get(id) {
            if newer > ticket {
                debug!("Refresh #{} superseded by write #{}", ticket, newer);
                return Ok(RefreshOutcome::Superseded { ticket, newer });
            }
        }

        let mut updated = state.indicators[idx].clone();
        let value2 = updated.value2();
        updated.set_readings(price, value2)?;
        state.indicators[idx] = updated;
        state.value_stamps.insert(id.to_string(), ticket);
        state.last_refresh = Some(RefreshReport {
            at: Utc::now(),
            price: Some(price),
            error: None,
        });

        Ok(RefreshOutcome::Applied(self.commit(&mut state, true).await))
    }

    /// Diagnostics only; readings stay as they were.
    pub async fn record_refresh_failure(&self, error: &DashboardError) -> Arc<Snapshot> {
        let mut state = self.state.lock().await;
        state.last_refresh = Some(RefreshReport {
            at: Utc::now(),
            price: None,
            error: Some(error.to_string()),
        });
        self.commit(&mut state, false).await
    }

    /// Persist the current state (startup and shutdown).
    pub async fn flush(&self) {
        let state = self.state.lock().await;
        if let Err(e) = self.store.save(&state.indicators).await {
            warn!("Flush failed: {}", e);
        }
    }

    async fn commit(&self, state: &mut DashboardState, persist: bool) -> Arc<Snapshot> {
        state.version += 1;
        if persist {
            // Failure degrades the store; classification and rendering carry on
            if let Err(e) = self.store.save(&state.indicators).await {
                debug!("Commit v{} kept in memory only: {}", state.version, e);
            }
        }
        let snapshot = Arc::new(build_snapshot(state, self.store.is_degraded()));
        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }
}

fn find(indicators: &[Indicator], id: &str) -> Result<usize> {
    indicators
        .iter()
        .position(|i| i.id() == id)
        .ok_or_else(|| DashboardError::NotFound(id.to_string()))
}

fn build_snapshot(state: &DashboardState, persistence_degraded: bool) -> Snapshot {
    Snapshot {
        version: state.version,
        indicators: state.indicators.clone(),
        recommendation: aggregate(&state.indicators),
        last_refresh: state.last_refresh.clone(),
        persistence_degraded,
    }
}
