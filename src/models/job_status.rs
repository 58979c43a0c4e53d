use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::time::format_elapsed;

/// Present-tense progress record for the running (or last finished) pass
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobStatus {
    pub is_running: bool,
    pub current_step: String,
    pub progress: usize,
    pub total_steps: usize,
    pub current_epg_file: String,
    pub current_source: String,
    pub sources_completed: usize,
    pub total_sources: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn progress_percentage(&self) -> u32 {
        if self.total_steps == 0 {
            return 0;
        }
        (self.progress * 100 / self.total_steps) as u32
    }

    /// Time spent in the pass; measured against `now` while still running
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        let start = self.start_time?;
        Some(self.end_time.unwrap_or(now) - start)
    }

    /// Apply every field present in `update`, leaving the others untouched
    pub fn apply(&mut self, update: JobStatusUpdate) {
        if let Some(v) = update.is_running {
            self.is_running = v;
        }
        if let Some(v) = update.current_step {
            self.current_step = v;
        }
        if let Some(v) = update.progress {
            self.progress = v;
        }
        if let Some(v) = update.total_steps {
            self.total_steps = v;
        }
        if let Some(v) = update.current_epg_file {
            self.current_epg_file = v;
        }
        if let Some(v) = update.current_source {
            self.current_source = v;
        }
        if let Some(v) = update.sources_completed {
            self.sources_completed = v;
        }
        if let Some(v) = update.total_sources {
            self.total_sources = v;
        }
        if let Some(v) = update.start_time {
            self.start_time = v;
        }
        if let Some(v) = update.end_time {
            self.end_time = v;
        }
        if let Some(v) = update.error {
            self.error = v;
        }
    }
}

/// A partial update of [`JobStatus`].
///
/// Absent fields are left alone. Nullable fields use a nested `Option` so an
/// update can explicitly clear them. Deserialization ignores unknown keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobStatusUpdate {
    pub is_running: Option<bool>,
    pub current_step: Option<String>,
    pub progress: Option<usize>,
    pub total_steps: Option<usize>,
    pub current_epg_file: Option<String>,
    pub current_source: Option<String>,
    pub sources_completed: Option<usize>,
    pub total_sources: Option<usize>,
    pub start_time: Option<Option<DateTime<Utc>>>,
    pub end_time: Option<Option<DateTime<Utc>>>,
    pub error: Option<Option<String>>,
}

impl JobStatusUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(mut self, is_running: bool) -> Self {
        self.is_running = Some(is_running);
        self
    }

    pub fn step<S: Into<String>>(mut self, step: S) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn progress(mut self, progress: usize) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn total_steps(mut self, total_steps: usize) -> Self {
        self.total_steps = Some(total_steps);
        self
    }

    pub fn epg_file<S: Into<String>>(mut self, name: S) -> Self {
        self.current_epg_file = Some(name.into());
        self
    }

    pub fn source<S: Into<String>>(mut self, name: S) -> Self {
        self.current_source = Some(name.into());
        self
    }

    pub fn sources_completed(mut self, completed: usize) -> Self {
        self.sources_completed = Some(completed);
        self
    }

    pub fn total_sources(mut self, total: usize) -> Self {
        self.total_sources = Some(total);
        self
    }

    pub fn start_time(mut self, start: Option<DateTime<Utc>>) -> Self {
        self.start_time = Some(start);
        self
    }

    pub fn end_time(mut self, end: Option<DateTime<Utc>>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn error(mut self, error: Option<String>) -> Self {
        self.error = Some(error);
        self
    }
}

/// Snapshot plus the derived fields shown to observers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobStatusView {
    #[serde(flatten)]
    pub status: JobStatus,
    pub progress_percentage: u32,
    pub elapsed_time: Option<String>,
}

impl JobStatusView {
    pub fn at(status: JobStatus, now: DateTime<Utc>) -> Self {
        let progress_percentage = status.progress_percentage();
        let elapsed_time = status.elapsed_at(now).map(format_elapsed);
        Self {
            status,
            progress_percentage,
            elapsed_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_apply_only_touches_present_fields() {
        let mut status = JobStatus {
            current_step: "Downloading from A".to_string(),
            sources_completed: 2,
            error: Some("old".to_string()),
            ..Default::default()
        };

        status.apply(JobStatusUpdate::new().step("Merging").error(None));

        assert_eq!(status.current_step, "Merging");
        assert_eq!(status.sources_completed, 2);
        assert_eq!(status.error, None);
    }

    #[test]
    fn test_update_deserialization_ignores_unknown_fields() {
        let update: JobStatusUpdate =
            serde_json::from_str(r#"{"progress": 3, "colour": "blue"}"#).unwrap();
        assert_eq!(update.progress, Some(3));
        assert_eq!(update.current_step, None);
    }

    #[test]
    fn test_view_derives_percentage_and_elapsed() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let status = JobStatus {
            progress: 1,
            total_steps: 4,
            start_time: Some(start),
            end_time: Some(start + chrono::Duration::seconds(3725)),
            ..Default::default()
        };

        let view = JobStatusView::at(status, Utc::now());
        assert_eq!(view.progress_percentage, 25);
        assert_eq!(view.elapsed_time.as_deref(), Some("1:02:05"));

        let idle = JobStatusView::at(JobStatus::default(), Utc::now());
        assert_eq!(idle.progress_percentage, 0);
        assert_eq!(idle.elapsed_time, None);
    }
}
