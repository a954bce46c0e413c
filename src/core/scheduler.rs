use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};

use crate::core::coordinator::{Dashboard, RefreshOutcome};
use crate::error::{DashboardError, Result};
use crate::fetcher::PriceSource;
use crate::models::Snapshot;

/// What a single refresh attempt did.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Applied(Arc<Snapshot>),
    Superseded,
    /// Another refresh was still running
    Skipped,
    Stopped,
    Failed(String),
}

/// Feeds the spot price into the comparison indicator.
pub struct PriceRefresher {
    dashboard: Arc<Dashboard>,
    source: Arc<dyn PriceSource>,
    target_id: String,
    /// Held for the whole attempt; single-flight
    in_flight: Mutex<()>,
    stopped: AtomicBool,
}

impl PriceRefresher {
    pub fn new(dashboard: Arc<Dashboard>, source: Arc<dyn PriceSource>, target_id: &str) -> Self {
        Self {
            dashboard,
            source,
            target_id: target_id.to_string(),
            in_flight: Mutex::new(()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// One refresh attempt. Never returns an error: failures are logged,
    /// recorded on the snapshot, and the previous reading is kept.
    pub async fn refresh_once(&self) -> TickOutcome {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Price refresh already in flight, skipping tick");
            return TickOutcome::Skipped;
        };

        if self.is_stopped() {
            return TickOutcome::Stopped;
        }

        let ticket = self.dashboard.next_ticket();
        let fetched = self.source.fetch_price().await;

        if self.is_stopped() {
            debug!("Refresher stopped while fetching, dropping result");
            return TickOutcome::Stopped;
        }

        let price = match fetched {
            Ok(price) => price,
            Err(e) => {
                warn!("Price refresh from {} failed: {}", self.source.name(), e);
                self.dashboard.record_refresh_failure(&e).await;
                return TickOutcome::Failed(e.to_string());
            }
        };

        match self.dashboard.apply_refreshed_price(&self.target_id, price, ticket).await {
            Ok(RefreshOutcome::Applied(snapshot)) => {
                info!("Refreshed {} from {}: {:.2}", self.target_id, self.source.name(), price);
                TickOutcome::Applied(snapshot)
            }
            Ok(RefreshOutcome::Superseded { ticket, newer }) => {
                info!("Dropped refresh #{}: newer write #{} already applied", ticket, newer);
                TickOutcome::Superseded
            }
            Err(e) => {
                warn!("Could not apply refreshed price: {}", e);
                self.dashboard.record_refresh_failure(&e).await;
                TickOutcome::Failed(e.to_string())
            }
        }
    }

    /// Mark stopped and wait for an in-flight attempt to finish, so nothing
    /// touches the dashboard once this returns.
    async fn halt(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let _idle = self.in_flight.lock().await;
    }
}

/// Running periodic refresh. Call `stop` when the hosting view goes away.
pub struct RefreshHandle {
    scheduler: JobScheduler,
    startup: JoinHandle<()>,
    refresher: Arc<PriceRefresher>,
}

impl RefreshHandle {
    pub async fn stop(mut self) -> Result<()> {
        // Halt first: once stopped, an aborted attempt cannot be mid-commit
        self.refresher.halt().await;
        self.startup.abort();
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| DashboardError::Scheduler(e.to_string()))?;
        info!("Price refresher stopped");
        Ok(())
    }
}

/// Run once right away (after `startup_delay`), then every `interval`.
pub async fn start(
    refresher: Arc<PriceRefresher>,
    interval: Duration,
    startup_delay: Duration,
) -> Result<RefreshHandle> {
    if interval.is_zero() {
        return Err(DashboardError::Config("refresh interval must be non-zero".to_string()));
    }
    let sched_err = |e: tokio_cron_scheduler::JobSchedulerError| DashboardError::Scheduler(e.to_string());

    let sched = JobScheduler::new().await.map_err(sched_err)?;
    let job_refresher = refresher.clone();

    sched.add(
        Job::new_repeated_async(interval, move |_uuid, _l| {
            let refresher = job_refresher.clone();
            Box::pin(async move {
                debug!("Running scheduled price refresh...");
                refresher.refresh_once().await;
            })
        })
        .map_err(sched_err)?,
    )
    .await
    .map_err(sched_err)?;

    // Also run startup refresh immediately (spawned)
    let startup_refresher = refresher.clone();
    let startup = tokio::spawn(async move {
        if !startup_delay.is_zero() {
            tokio::time::sleep(startup_delay).await;
        }
        debug!("Running startup price refresh...");
        startup_refresher.refresh_once().await;
    });

    sched.start().await.map_err(sched_err)?;
    info!("Price refresher started (every {}s)", interval.as_secs());

    Ok(RefreshHandle {
        scheduler: sched,
        startup,
        refresher,
    })
}
