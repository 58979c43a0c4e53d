use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::services::MergeService;
use crate::utils::time::describe_interval;

/// Whether a recurring full pass is currently armed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    Idle,
    Armed { interval: Duration },
}

struct ArmedTrigger {
    interval: Duration,
    handle: JoinHandle<()>,
}

/// Fires a full merge pass at a fixed interval.
///
/// At most one trigger is armed at a time; reconfiguring replaces it. The first
/// fire happens one full interval after arming. A fire that finds a pass still
/// running is skipped.
pub struct SchedulerService {
    merge: Arc<MergeService>,
    database: Database,
    trigger: Mutex<Option<ArmedTrigger>>,
    fires: Arc<AtomicU64>,
}

impl SchedulerService {
    pub fn new(merge: Arc<MergeService>, database: Database) -> Self {
        Self {
            merge,
            database,
            trigger: Mutex::new(None),
            fires: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Replace any armed trigger with one firing every `every`.
    ///
    /// A pass already in flight is left to finish.
    pub async fn configure(&self, every: Duration) -> AppResult<()> {
        if every.is_zero() {
            return Err(AppError::validation("Interval must be greater than zero"));
        }

        let mut trigger = self.trigger.lock().await;
        if let Some(previous) = trigger.take() {
            debug!("Replacing schedule of {:?}", previous.interval);
            previous.handle.abort();
        }

        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let merge = self.merge.clone();
        let fires = self.fires.clone();
        let handle = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                fires.fetch_add(1, Ordering::SeqCst);
                info!("Running scheduled EPG merge");

                // The pass gets its own task so that re-arming never cancels it
                let merge = merge.clone();
                let pass = tokio::spawn(async move { merge.merge_all().await });
                match pass.await {
                    Ok(Ok(true)) => info!("Scheduled EPG merge completed"),
                    Ok(Ok(false)) => warn!("Scheduled EPG merge produced no EPG files"),
                    Ok(Err(AppError::Busy)) => {
                        warn!("Skipping scheduled EPG merge: a merge is already running")
                    }
                    Ok(Err(e)) => error!("Scheduled EPG merge failed: {}", e),
                    Err(e) => error!("Scheduled EPG merge task failed: {}", e),
                }
            }
        });

        *trigger = Some(ArmedTrigger {
            interval: every,
            handle,
        });
        info!(
            "Scheduled EPG merge every {}",
            describe_interval(every.as_secs())
        );
        Ok(())
    }

    /// Persist a new interval (in seconds) and re-arm with it
    pub async fn configure_schedule(&self, secs: u64) -> AppResult<()> {
        self.database.set_schedule_interval(secs).await?;
        self.configure(Duration::from_secs(secs)).await
    }

    /// Arm with the persisted interval when at least one output exists
    pub async fn start_if_configured(&self) -> AppResult<bool> {
        let registry = self.database.snapshot().await?;
        if registry.outputs.is_empty() {
            info!("No EPG files configured, scheduler not started");
            return Ok(false);
        }
        self.configure(Duration::from_secs(registry.schedule_interval_secs()))
            .await?;
        Ok(true)
    }

    pub async fn state(&self) -> ScheduleState {
        match self.trigger.lock().await.as_ref() {
            Some(trigger) => ScheduleState::Armed {
                interval: trigger.interval,
            },
            None => ScheduleState::Idle,
        }
    }

    /// Number of times any trigger has fired since start-up
    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::SeqCst)
    }
}

impl Drop for SchedulerService {
    fn drop(&mut self) {
        if let Some(trigger) = self.trigger.get_mut().take() {
            trigger.handle.abort();
        }
    }
}
