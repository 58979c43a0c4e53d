use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::models::{JobStatus, JobStatusUpdate, JobStatusView};

pub type StatusSender = broadcast::Sender<JobStatus>;
pub type StatusReceiver = broadcast::Receiver<JobStatus>;

/// The single process-wide job status record.
///
/// Reads and writes only go through [`update`](Self::update) and
/// [`snapshot`](Self::snapshot); clones share the same record.
#[derive(Clone)]
pub struct JobStatusTracker {
    status: Arc<RwLock<JobStatus>>,
    status_tx: StatusSender,
}

impl JobStatusTracker {
    pub fn new() -> Self {
        let (status_tx, _) = broadcast::channel(100);
        Self {
            status: Arc::new(RwLock::new(JobStatus::default())),
            status_tx,
        }
    }

    /// Receive every snapshot produced by subsequent updates
    pub fn subscribe(&self) -> StatusReceiver {
        self.status_tx.subscribe()
    }

    /// Merge the present fields of `update` and return the resulting snapshot
    pub async fn update(&self, update: JobStatusUpdate) -> JobStatus {
        let mut status = self.status.write().await;
        status.apply(update);
        let snapshot = status.clone();
        let _ = self.status_tx.send(snapshot.clone());
        snapshot
    }

    pub async fn snapshot(&self) -> JobStatus {
        self.status.read().await.clone()
    }

    pub async fn view(&self) -> JobStatusView {
        JobStatusView::at(self.snapshot().await, Utc::now())
    }
}

impl Default for JobStatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
