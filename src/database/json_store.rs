use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::ConfigStore;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::SourceRegistry;
use crate::storage::write_atomic;

/// Stores the configuration as pretty-printed JSON.
///
/// A missing file reads as an empty configuration. Sources written by older
/// versions without an `id` are given one by [`ConfigStore::migrate`], which
/// rewrites the file; `load` itself never writes.
pub struct JsonFileConfigStore {
    path: PathBuf,
}

impl JsonFileConfigStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
    async fn load(&self) -> RepositoryResult<SourceRegistry> {
        match self.read_raw().await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                debug!("No configuration at {}, using defaults", self.path.display());
                Ok(SourceRegistry::default())
            }
        }
    }

    async fn migrate(&self) -> RepositoryResult<usize> {
        let Some(bytes) = self.read_raw().await? else {
            return Ok(0);
        };

        let mut value: Value = serde_json::from_slice(&bytes)?;
        let migrated = assign_missing_source_ids(&mut value);
        if migrated > 0 {
            let registry: SourceRegistry = serde_json::from_value(value)?;
            self.save(&registry).await?;
            info!(
                "Assigned ids to {} source(s) in {}",
                migrated,
                self.path.display()
            );
        }
        Ok(migrated)
    }

    async fn save(&self, registry: &SourceRegistry) -> RepositoryResult<()> {
        let contents = serde_json::to_vec_pretty(registry)?;
        write_atomic(&self.path, contents)
            .await
            .map_err(|e| RepositoryError::io(&self.path, e))
    }
}

impl JsonFileConfigStore {
    async fn read_raw(&self) -> RepositoryResult<Option<Vec<u8>>> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepositoryError::io(&self.path, e)),
        }
    }
}

fn assign_missing_source_ids(value: &mut Value) -> usize {
    let Some(sources) = value.get_mut("sources").and_then(Value::as_array_mut) else {
        return 0;
    };

    let mut migrated = 0;
    for source in sources.iter_mut().filter_map(Value::as_object_mut) {
        if !source.contains_key("id") {
            source.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
            migrated += 1;
        }
    }
    migrated
}

/// Configuration held only in memory
#[derive(Default)]
pub struct InMemoryConfigStore {
    registry: RwLock<SourceRegistry>,
}

impl InMemoryConfigStore {
    pub fn new(registry: SourceRegistry) -> Self {
        Self {
            registry: RwLock::new(registry),
        }
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self) -> RepositoryResult<SourceRegistry> {
        Ok(self.registry.read().await.clone())
    }

    async fn save(&self, registry: &SourceRegistry) -> RepositoryResult<()> {
        *self.registry.write().await = registry.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EpgOutput, Source};

    #[tokio::test]
    async fn test_missing_file_loads_empty_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileConfigStore::new(dir.path().join("config.json"));

        let registry = store.load().await.unwrap();
        assert!(registry.sources.is_empty());
        assert!(registry.outputs.is_empty());
        assert_eq!(registry.schedule_interval_secs(), 7200);
    }

    #[tokio::test]
    async fn test_save_then_load_uses_epg_files_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = JsonFileConfigStore::new(&path);

        let source = Source::new("http://example.com/guide.xml", "Example");
        let mut output = EpgOutput::new("Main");
        output.sources.push(source.id);
        let registry = SourceRegistry {
            sources: vec![source],
            outputs: vec![output],
            schedule_interval: Some(3600),
        };

        store.save(&registry).await.unwrap();

        let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw.get("epg_files").is_some());
        assert_eq!(raw["schedule_interval"], 3600);

        assert_eq!(store.load().await.unwrap(), registry);
    }

    #[tokio::test]
    async fn test_sources_without_ids_are_migrated_and_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"sources": [{"url": "http://a/epg.xml", "name": "A", "enabled": false}], "epg_files": []}"#,
        )
        .unwrap();
        let store = JsonFileConfigStore::new(&path);

        assert!(matches!(
            store.load().await,
            Err(RepositoryError::SerializationFailed(_))
        ));
        assert_eq!(store.migrate().await.unwrap(), 1);
        assert_eq!(store.migrate().await.unwrap(), 0);

        let first = store.load().await.unwrap();
        let second = store.load().await.unwrap();

        assert_eq!(first.sources.len(), 1);
        assert!(!first.sources[0].enabled);
        assert_eq!(first.sources[0].id, second.sources[0].id);
    }

    #[tokio::test]
    async fn test_load_never_rewrites_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let contents = r#"{"sources": [{"id": "6f1c2b1e-3c1d-4a8e-9d65-0a5b4c3d2e1f", "url": "http://a/epg.xml"}]}"#;
        std::fs::write(&path, contents).unwrap();

        let registry = JsonFileConfigStore::new(&path).load().await.unwrap();
        assert!(registry.sources[0].enabled);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), contents);
    }

    #[tokio::test]
    async fn test_loads_configuration_with_offsetless_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
  "sources": [
    {
      "url": "http://a/epg.xml",
      "name": "A",
      "enabled": true,
      "added_at": "2024-05-01T10:00:00.123456",
      "last_fetched": "2024-05-02T03:00:00.500000"
    },
    {
      "url": "http://b/epg.xml",
      "name": "B",
      "enabled": true,
      "added_at": "2024-05-01T10:01:00.000001",
      "last_fetched": null
    }
  ],
  "epg_files": [
    {
      "id": "0b7e4f3a-8d2c-4e6b-a1f0-9c8d7e6f5a4b",
      "name": "Main",
      "sources": [],
      "created_at": "2024-05-01T10:05:00.000001"
    }
  ],
  "schedule_interval": 3600
}"#,
        )
        .unwrap();
        let store = JsonFileConfigStore::new(&path);

        assert_eq!(store.migrate().await.unwrap(), 2);
        let registry = store.load().await.unwrap();

        let added = registry.sources[0].added_at.unwrap();
        assert_eq!(added.to_rfc3339(), "2024-05-01T10:00:00.123456+00:00");
        assert!(registry.sources[0].last_fetched.is_some());
        assert!(registry.sources[1].last_fetched.is_none());
        assert_eq!(
            registry.outputs[0].created_at.to_rfc3339(),
            "2024-05-01T10:05:00.000001+00:00"
        );

        // Re-saved timestamps carry an offset and still load
        store.save(&registry).await.unwrap();
        assert_eq!(store.load().await.unwrap(), registry);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileConfigStore::new(&path).load().await;
        assert!(matches!(result, Err(RepositoryError::SerializationFailed(_))));
    }
}
