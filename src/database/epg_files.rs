use tracing::info;
use uuid::Uuid;

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{EpgOutput, EpgOutputCreateRequest, MIN_SCHEDULE_INTERVAL_SECS};

impl Database {
    pub async fn list_epg_outputs(&self) -> AppResult<Vec<EpgOutput>> {
        Ok(self.snapshot().await?.outputs)
    }

    pub async fn get_epg_output(&self, id: Uuid) -> AppResult<Option<EpgOutput>> {
        Ok(self.snapshot().await?.find_output(id).cloned())
    }

    /// Create an output with no sources. The trimmed name must be non-empty and unique.
    pub async fn create_epg_output(&self, request: &EpgOutputCreateRequest) -> AppResult<EpgOutput> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }

        let output = self
            .mutate(move |registry| {
                if registry.outputs.iter().any(|o| o.name == name) {
                    return Err(AppError::validation("EPG file name already exists"));
                }
                let output = EpgOutput::new(name);
                registry.outputs.push(output.clone());
                Ok(output)
            })
            .await?;

        info!("Created EPG file '{}' ({})", output.name, output.id);
        Ok(output)
    }

    pub async fn delete_epg_output(&self, id: Uuid) -> AppResult<EpgOutput> {
        let removed = self
            .mutate(|registry| {
                let position = registry
                    .outputs
                    .iter()
                    .position(|o| o.id == id)
                    .ok_or_else(|| AppError::not_found("EPG file", id))?;
                Ok(registry.outputs.remove(position))
            })
            .await?;

        info!("Deleted EPG file '{}' ({})", removed.name, id);
        Ok(removed)
    }

    /// Replace the ordered source list of an output.
    ///
    /// Ids are stored as given; unknown or disabled ones are skipped at merge time.
    pub async fn set_epg_output_sources(&self, id: Uuid, sources: Vec<Uuid>) -> AppResult<EpgOutput> {
        self.mutate(move |registry| {
            let output = registry
                .find_output_mut(id)
                .ok_or_else(|| AppError::not_found("EPG file", id))?;
            output.sources = sources;
            Ok(output.clone())
        })
        .await
    }

    pub async fn schedule_interval(&self) -> AppResult<u64> {
        Ok(self.snapshot().await?.schedule_interval_secs())
    }

    pub async fn set_schedule_interval(&self, secs: u64) -> AppResult<()> {
        if secs < MIN_SCHEDULE_INTERVAL_SECS {
            return Err(AppError::validation(format!(
                "Interval must be at least {} seconds",
                MIN_SCHEDULE_INTERVAL_SECS
            )));
        }
        self.mutate(|registry| {
            registry.schedule_interval = Some(secs);
            Ok(())
        })
        .await
    }
}
