use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{DashboardError, Result};
use crate::indicators::registry::Registry;
use crate::models::{Indicator, PersistedIndicator};

/// Slot holding the whole indicator collection.
pub const INDICATORS_KEY: &str = "bitcoin_onchain_indicators";

/// Durable storage medium: get/set a string by key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.slots.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and saves the indicator collection. After the first failed write the
/// store stays in memory-only mode for the rest of the session.
pub struct IndicatorStore {
    backend: Arc<dyn KeyValueStore>,
    degraded: AtomicBool,
}

impl IndicatorStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            degraded: AtomicBool::new(false),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Persisted readings merged onto the built-in registry. Never fails:
    /// absent or corrupt data falls back to defaults.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<Vec<Indicator>> {
        let raw = match self.backend.get(INDICATORS_KEY).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read persisted indicators, using defaults: {}", e);
                None
            }
        };

        let persisted: Vec<PersistedIndicator> = match raw {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("Persisted indicators are corrupt, using defaults: {}", e);
                Vec::new()
            }),
            None => {
                info!("No persisted indicators, seeding defaults");
                Vec::new()
            }
        };

        restore(&persisted, now)
    }

    /// Write the collection. Errors are returned once, then the store degrades.
    pub async fn save(&self, indicators: &[Indicator]) -> Result<()> {
        if self.is_degraded() {
            return Ok(());
        }
        let records: Vec<PersistedIndicator> = indicators.iter().map(Indicator::to_persisted).collect();
        let json = serde_json::to_string(&records)?;

        if let Err(e) = self.backend.set(INDICATORS_KEY, &json).await {
            warn!("Persistence failed, continuing in memory only: {}", e);
            self.degraded.store(true, Ordering::SeqCst);
            return Err(DashboardError::PersistenceFailure(e.to_string()));
        }
        Ok(())
    }
}

/// Rebuild the collection from persisted records. Static metadata always
/// comes from the registry; the cycle count is recomputed from its anchor.
pub fn restore(persisted: &[PersistedIndicator], now: DateTime<Utc>) -> Result<Vec<Indicator>> {
    let by_id: HashMap<&str, &PersistedIndicator> =
        persisted.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut indicators = Registry::defaults(now)?;
    for indicator in indicators.iter_mut() {
        let Some(record) = by_id.get(indicator.id()) else {
            continue;
        };
        let value = Registry::cycle_value(&indicator.meta, now).unwrap_or(record.value);
        if let Err(e) = indicator.set_readings(value, record.value2) {
            warn!("Discarding persisted readings for {}: {}", indicator.id(), e);
        }
    }

    for record in persisted {
        if Registry::get_metadata(&record.id).is_none() {
            warn!("Ignoring unknown persisted indicator '{}'", record.id);
        }
    }
    Ok(indicators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IndicatorStatus;
    use chrono::TimeZone;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(DashboardError::PersistenceFailure("disk gone".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(DashboardError::PersistenceFailure("disk gone".to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let store = IndicatorStore::new(Arc::new(MemoryStore::new()));
        let mut indicators = store.load(now()).await.unwrap();
        let nupl = indicators.iter_mut().find(|i| i.id() == "nupl").unwrap();
        nupl.set_readings(-0.2, None).unwrap();

        store.save(&indicators).await.unwrap();
        let restored = store.load(now()).await.unwrap();
        assert_eq!(restored, indicators);
        assert_eq!(
            restored.iter().find(|i| i.id() == "nupl").unwrap().status(),
            IndicatorStatus::Good
        );
    }

    #[tokio::test]
    async fn test_corrupt_blob_falls_back_to_defaults() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(INDICATORS_KEY, "{not json").await.unwrap();
        let store = IndicatorStore::new(backend);
        let loaded = store.load(now()).await.unwrap();
        assert_eq!(loaded, Registry::defaults(now()).unwrap());
    }

    #[tokio::test]
    async fn test_broken_backend_degrades() {
        let store = IndicatorStore::new(Arc::new(BrokenStore));
        let loaded = store.load(now()).await.unwrap();
        assert_eq!(loaded.len(), Registry::ids().len());

        assert!(store.save(&loaded).await.is_err());
        assert!(store.is_degraded());
        // Later writes are skipped quietly
        assert!(store.save(&loaded).await.is_ok());
    }

    #[test]
    fn test_restore_ignores_bad_records() {
        let persisted = vec![
            PersistedIndicator {
                id: "realized_price".to_string(),
                value: 50000.0,
                value2: None, // violates the comparison rule
                status: IndicatorStatus::Good,
                description: "buy".to_string(),
            },
            PersistedIndicator {
                id: "mvrv".to_string(),
                value: 7.5,
                value2: None,
                status: IndicatorStatus::Neutral, // stale, gets recomputed
                description: "wait".to_string(),
            },
            PersistedIndicator {
                id: "stock_to_flow".to_string(),
                value: 1.0,
                value2: None,
                status: IndicatorStatus::Neutral,
                description: "wait".to_string(),
            },
        ];
        let restored = restore(&persisted, now()).unwrap();
        assert_eq!(restored.len(), 5);

        let realized = restored.iter().find(|i| i.id() == "realized_price").unwrap();
        assert_eq!(realized.value(), 67123.45);

        let mvrv = restored.iter().find(|i| i.id() == "mvrv").unwrap();
        assert_eq!(mvrv.value(), 7.5);
        assert_eq!(mvrv.status(), IndicatorStatus::Bad);
    }

    #[test]
    fn test_restore_recomputes_cycle() {
        let persisted = vec![PersistedIndicator {
            id: "cycle".to_string(),
            value: 12.0,
            value2: None,
            status: IndicatorStatus::Neutral,
            description: "wait".to_string(),
        }];
        let restored = restore(&persisted, now()).unwrap();
        assert_eq!(restored[0].value(), 910.0);
    }
}
