use async_trait::async_trait;

use crate::errors::SourceResult;
use crate::xmltv::XmltvDocument;

pub mod ingest_epg;
pub mod scheduler;
pub mod state_manager;

pub use ingest_epg::EpgIngestor;
pub use scheduler::{ScheduleState, SchedulerService};
pub use state_manager::JobStatusTracker;

/// Retrieves one remote document.
///
/// Every failure is returned as a [`crate::errors::SourceError`] value; the
/// caller decides whether it matters.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> SourceResult<XmltvDocument>;
}
