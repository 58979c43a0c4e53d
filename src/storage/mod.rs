//! Durable storage for merged EPG documents
//!
//! One file per output, named `<output id>.xml`. Writes go to a temporary file
//! in the same directory which is then renamed over the target, so readers see
//! either the previous document or the new one, never a partial write.

use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::{StorageError, StorageResult};
use crate::models::EpgFileStats;
use crate::xmltv::XmltvDocument;

/// Write `contents` to `path` through a temp file and rename
pub async fn write_atomic(path: &Path, contents: Vec<u8>) -> std::io::Result<()> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;

        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&contents)?;
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?
}

#[derive(Clone, Debug)]
pub struct EpgFileStorage {
    base_dir: PathBuf,
}

impl EpgFileStorage {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn ensure_storage_dir(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| StorageError::io(&self.base_dir, e))
    }

    pub fn file_path(&self, output_id: Uuid) -> PathBuf {
        self.base_dir.join(format!("{}.xml", output_id))
    }

    /// Serialize and atomically replace the stored document. Returns its size in bytes.
    pub async fn save(&self, output_id: Uuid, document: &XmltvDocument) -> StorageResult<u64> {
        let contents = document.to_xml_bytes()?;
        let size = contents.len() as u64;
        let path = self.file_path(output_id);

        write_atomic(&path, contents)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        debug!("Wrote {} bytes to {}", size, path.display());
        Ok(size)
    }

    pub async fn read(&self, output_id: Uuid) -> StorageResult<Option<Vec<u8>>> {
        let path = self.file_path(output_id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Delete the stored document. Returns false when there was none.
    pub async fn remove(&self, output_id: Uuid) -> StorageResult<bool> {
        let path = self.file_path(output_id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Counts and file metadata of the stored document, if readable
    pub async fn stats(&self, output_id: Uuid) -> Option<EpgFileStats> {
        let path = self.file_path(output_id);
        let metadata = fs::metadata(&path).await.ok()?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                return None;
            }
        };

        let document = match XmltvDocument::parse(&bytes) {
            Ok(document) => document,
            Err(e) => {
                warn!("Error getting stats for {}: {}", output_id, e);
                return None;
            }
        };

        let file_size = metadata.len();
        let last_modified = metadata
            .modified()
            .map(|t| DateTime::<Utc>::from(t).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        Some(EpgFileStats {
            channels_count: document.channel_count(),
            programmes_count: document.programme_count(),
            file_size,
            file_size_mb: (file_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmltv::XmlElement;

    fn document(channels: usize) -> XmltvDocument {
        let mut root = XmlElement::new("tv");
        for i in 0..channels {
            root = root.with_child(XmlElement::new("channel").with_attribute("id", i.to_string()));
        }
        XmltvDocument::new(root.with_child(XmlElement::new("programme").with_attribute("channel", "0")))
    }

    #[tokio::test]
    async fn test_save_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EpgFileStorage::new(dir.path().join("epg_files"));
        let id = Uuid::new_v4();

        storage.save(id, &document(3)).await.unwrap();
        storage.save(id, &document(1)).await.unwrap();

        let stats = storage.stats(id).await.unwrap();
        assert_eq!(stats.channels_count, 1);
        assert_eq!(stats.programmes_count, 1);
        assert!(stats.file_size > 0);

        let leftovers: Vec<_> = std::fs::read_dir(storage.base_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from(format!("{id}.xml"))]);
    }

    #[tokio::test]
    async fn test_missing_documents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EpgFileStorage::new(dir.path());
        let id = Uuid::new_v4();

        assert!(storage.read(id).await.unwrap().is_none());
        assert!(storage.stats(id).await.is_none());
        assert!(!storage.remove(id).await.unwrap());

        storage.save(id, &document(0)).await.unwrap();
        assert!(storage.remove(id).await.unwrap());
        assert!(storage.read(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unparseable_document_has_no_stats() {
        let dir = tempfile::tempdir().unwrap();
        let storage = EpgFileStorage::new(dir.path());
        let id = Uuid::new_v4();
        std::fs::write(storage.file_path(id), "<tv><channel>").unwrap();

        assert!(storage.stats(id).await.is_none());
    }
}
