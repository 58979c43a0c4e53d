use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::datetime::{deserialize_datetime, deserialize_optional_datetime};

pub mod job_status;
pub mod source_registry;

pub use job_status::{JobStatus, JobStatusUpdate, JobStatusView};
pub use source_registry::SourceRegistry;

/// Interval used when the operator never configured one (2 hours)
pub const DEFAULT_SCHEDULE_INTERVAL_SECS: u64 = 7200;

/// Smallest interval accepted from the operator surface
pub const MIN_SCHEDULE_INTERVAL_SECS: u64 = 60;

fn default_enabled() -> bool {
    true
}

/// A remote XMLTV feed definition
///
/// A stored source without an `enabled` flag is enabled; the default is applied
/// here when the record is read, never at the call sites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub id: Uuid,
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_datetime"
    )]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_optional_datetime")]
    pub last_fetched: Option<DateTime<Utc>>,
}

impl Source {
    pub fn new<U: Into<String>, N: Into<String>>(url: U, name: N) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            name: name.into(),
            enabled: true,
            added_at: Some(Utc::now()),
            last_fetched: None,
        }
    }

    /// Name used in status messages and logs
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed Source"
        } else {
            &self.name
        }
    }
}

/// A named merged output and the ordered list of sources feeding it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpgOutput {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub sources: Vec<Uuid>,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_datetime")]
    pub created_at: DateTime<Utc>,
}

impl EpgOutput {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            sources: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Counts produced by merging one output
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeSummary {
    pub channels: usize,
    pub programmes: usize,
}

/// Result of fetching a single source outside of a merge pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestFetchResult {
    pub success: bool,
    pub channels: usize,
    pub programmes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Statistics about a stored merged document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpgFileStats {
    pub channels_count: usize,
    pub programmes_count: usize,
    pub file_size: u64,
    pub file_size_mb: f64,
    pub last_modified: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EpgOutputStats {
    pub id: Uuid,
    pub name: String,
    pub sources_count: usize,
    pub stats: Option<EpgFileStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCreateRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpgOutputCreateRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpgOutputSourcesRequest {
    #[serde(default)]
    pub sources: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleUpdateRequest {
    pub interval: Option<u64>,
}
