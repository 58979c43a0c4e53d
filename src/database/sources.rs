use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{Source, SourceCreateRequest};

impl Database {
    pub async fn list_sources(&self) -> AppResult<Vec<Source>> {
        Ok(self.snapshot().await?.sources)
    }

    pub async fn get_source(&self, id: Uuid) -> AppResult<Option<Source>> {
        Ok(self.snapshot().await?.find_source(id).cloned())
    }

    /// Register a new source. The URL must be non-blank and not yet registered.
    pub async fn create_source(&self, request: &SourceCreateRequest) -> AppResult<Source> {
        let url = request.url.trim().to_string();
        if url.is_empty() {
            return Err(AppError::validation("URL is required"));
        }
        let name = request.name.trim().to_string();

        let source = self
            .mutate(move |registry| {
                if registry.sources.iter().any(|s| s.url == url) {
                    return Err(AppError::validation("URL already exists"));
                }
                let source = Source::new(url, name);
                registry.sources.push(source.clone());
                Ok(source)
            })
            .await?;

        info!("Added source '{}' ({})", source.display_name(), source.id);
        Ok(source)
    }

    /// Remove a source and purge its id from every output's source list
    pub async fn delete_source(&self, id: Uuid) -> AppResult<Source> {
        let removed = self
            .mutate(|registry| {
                let position = registry
                    .sources
                    .iter()
                    .position(|s| s.id == id)
                    .ok_or_else(|| AppError::not_found("source", id))?;
                let removed = registry.sources.remove(position);
                for output in &mut registry.outputs {
                    output.sources.retain(|sid| *sid != id);
                }
                Ok(removed)
            })
            .await?;

        info!("Deleted source '{}' ({})", removed.display_name(), id);
        Ok(removed)
    }

    pub async fn toggle_source(&self, id: Uuid) -> AppResult<Source> {
        let source = self
            .mutate(|registry| {
                let source = registry
                    .find_source_mut(id)
                    .ok_or_else(|| AppError::not_found("source", id))?;
                source.enabled = !source.enabled;
                Ok(source.clone())
            })
            .await?;

        info!(
            "Source '{}' is now {}",
            source.display_name(),
            if source.enabled { "enabled" } else { "disabled" }
        );
        Ok(source)
    }

    /// Record a successful fetch. Returns false when the source no longer exists.
    pub async fn record_fetch_success(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let updated = self
            .mutate(|registry| {
                Ok(match registry.find_source_mut(id) {
                    Some(source) => {
                        source.last_fetched = Some(at);
                        true
                    }
                    None => false,
                })
            })
            .await?;

        if !updated {
            debug!("Source {} vanished before its fetch time could be recorded", id);
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EpgOutputCreateRequest, SourceRegistry};

    fn request(url: &str, name: &str) -> SourceCreateRequest {
        SourceCreateRequest {
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_source_enforces_required_unique_url() {
        let db = Database::in_memory(SourceRegistry::default());

        let source = db.create_source(&request("http://a/epg.xml", "A")).await.unwrap();
        assert!(source.enabled);
        assert!(source.added_at.is_some());
        assert!(source.last_fetched.is_none());

        let duplicate = db.create_source(&request("http://a/epg.xml", "Again")).await;
        assert!(matches!(duplicate, Err(AppError::Validation { .. })));

        let blank = db.create_source(&request("   ", "Blank")).await;
        assert!(matches!(blank, Err(AppError::Validation { .. })));

        assert_eq!(db.list_sources().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_source_purges_output_references() {
        let db = Database::in_memory(SourceRegistry::default());
        let a = db.create_source(&request("http://a/epg.xml", "A")).await.unwrap();
        let b = db.create_source(&request("http://b/epg.xml", "B")).await.unwrap();
        let output = db
            .create_epg_output(&EpgOutputCreateRequest {
                name: "Main".to_string(),
            })
            .await
            .unwrap();
        db.set_epg_output_sources(output.id, vec![a.id, b.id, a.id])
            .await
            .unwrap();

        db.delete_source(a.id).await.unwrap();

        let output = db.get_epg_output(output.id).await.unwrap().unwrap();
        assert_eq!(output.sources, vec![b.id]);
        assert!(db.get_source(a.id).await.unwrap().is_none());

        let missing = db.delete_source(a.id).await;
        assert!(matches!(missing, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_toggle_and_record_fetch() {
        let db = Database::in_memory(SourceRegistry::default());
        let a = db.create_source(&request("http://a/epg.xml", "A")).await.unwrap();

        assert!(!db.toggle_source(a.id).await.unwrap().enabled);
        assert!(db.toggle_source(a.id).await.unwrap().enabled);

        let at = Utc::now();
        assert!(db.record_fetch_success(a.id, at).await.unwrap());
        assert_eq!(
            db.get_source(a.id).await.unwrap().unwrap().last_fetched,
            Some(at)
        );
        assert!(!db.record_fetch_success(Uuid::new_v4(), at).await.unwrap());
    }
}
