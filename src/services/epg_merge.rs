//! EPG Merge Service
//!
//! Drives one merge pass: fetch every enabled source of an output in order,
//! keep the first channel seen for each channel id, keep every programme, and
//! atomically replace the output's stored document. Progress is reported
//! through the shared [`JobStatusTracker`].
//!
//! At most one pass (full or single-output) runs at a time. A pass requested
//! while another is in flight is rejected with [`AppError::Busy`], and so is
//! deleting an output, since the running pass could still write its document.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::GeneratorConfig,
    database::Database,
    errors::{AppError, AppResult},
    ingestor::{DocumentFetcher, JobStatusTracker},
    models::{
        EpgOutput, EpgOutputStats, JobStatusUpdate, JobStatusView, MergeSummary,
        SourceRegistry, TestFetchResult,
    },
    storage::EpgFileStorage,
    xmltv::{XmlElement, XmlNode, XmltvDocument},
};

/// Channels and programmes accumulated over the sources of one output
#[derive(Default)]
struct MergedEpg {
    channels: Vec<XmlElement>,
    channel_ids: HashSet<String>,
    programmes: Vec<XmlElement>,
}

impl MergedEpg {
    /// Add a fetched document. Channels whose id was already seen are dropped;
    /// programmes are appended unconditionally.
    fn absorb(&mut self, document: XmltvDocument) {
        let (channels, programmes) = document.into_channels_and_programmes();

        for channel in channels {
            let id = match channel.attribute("id") {
                Some(id) if !id.is_empty() => id.to_string(),
                _ => {
                    debug!("Skipping channel without id");
                    continue;
                }
            };
            if self.channel_ids.insert(id) {
                self.channels.push(channel);
            }
        }

        self.programmes.extend(programmes);
    }

    fn summary(&self) -> MergeSummary {
        MergeSummary {
            channels: self.channels.len(),
            programmes: self.programmes.len(),
        }
    }

    fn into_document(self, generator: &GeneratorConfig) -> XmltvDocument {
        let mut root = XmlElement::new("tv")
            .with_attribute("generator-info-name", generator.name.as_str())
            .with_attribute("generator-info-url", generator.url.as_str());
        root.children = self
            .channels
            .into_iter()
            .chain(self.programmes)
            .map(XmlNode::Element)
            .collect();
        XmltvDocument::new(root)
    }
}

pub struct MergeService {
    database: Database,
    fetcher: Arc<dyn DocumentFetcher>,
    storage: EpgFileStorage,
    state_manager: JobStatusTracker,
    generator: GeneratorConfig,
    pass_lock: Mutex<()>,
}

impl MergeService {
    pub fn new(
        database: Database,
        fetcher: Arc<dyn DocumentFetcher>,
        storage: EpgFileStorage,
        state_manager: JobStatusTracker,
        generator: GeneratorConfig,
    ) -> Self {
        Self {
            database,
            fetcher,
            storage,
            state_manager,
            generator,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn storage(&self) -> &EpgFileStorage {
        &self.storage
    }

    pub fn state_manager(&self) -> &JobStatusTracker {
        &self.state_manager
    }

    /// Merge every configured output, in configuration order.
    ///
    /// Returns `Ok(true)` when at least one output was written.
    pub async fn merge_all(&self) -> AppResult<bool> {
        let _pass = self.pass_lock.try_lock().map_err(|_| {
            warn!("EPG merge requested while another merge is running");
            AppError::Busy
        })?;

        let registry = self.database.snapshot().await?;
        if registry.outputs.is_empty() {
            warn!("No EPG files configured");
            self.state_manager
                .update(
                    JobStatusUpdate::new()
                        .running(false)
                        .step("No EPG files configured")
                        .error(Some(AppError::NoOutputs.to_string())),
                )
                .await;
            return Ok(false);
        }

        let total = registry.outputs.len();
        self.state_manager
            .update(
                JobStatusUpdate::new()
                    .running(true)
                    .step("Starting EPG merge job")
                    .progress(0)
                    .total_steps(total)
                    .start_time(Some(Utc::now()))
                    .end_time(None)
                    .error(None),
            )
            .await;

        let mut success_count = 0;
        for (i, output) in registry.outputs.iter().enumerate() {
            self.state_manager
                .update(JobStatusUpdate::new().progress(i).step(format!(
                    "Processing EPG file {}/{}: {}",
                    i + 1,
                    total,
                    output.name
                )))
                .await;

            match self.merge_output(&registry, output).await {
                Ok(_) => success_count += 1,
                Err(e) => {
                    warn!("EPG merge failed for '{}': {}", output.name, e);
                    self.state_manager
                        .update(JobStatusUpdate::new().error(Some(e.to_string())))
                        .await;
                }
            }
        }

        self.state_manager
            .update(
                JobStatusUpdate::new()
                    .running(false)
                    .step(format!(
                        "Job completed - {}/{} EPG files processed",
                        success_count, total
                    ))
                    .progress(total)
                    .end_time(Some(Utc::now())),
            )
            .await;

        info!("Completed merging {}/{} EPG files", success_count, total);
        Ok(success_count > 0)
    }

    /// Merge a single output.
    ///
    /// Unknown ids fail with `NotFound` before the job status is touched.
    pub async fn merge_one(&self, output_id: Uuid) -> AppResult<bool> {
        let _pass = self.pass_lock.try_lock().map_err(|_| {
            warn!("EPG merge for {} requested while another merge is running", output_id);
            AppError::Busy
        })?;

        let registry = self.database.snapshot().await?;
        let output = registry
            .find_output(output_id)
            .ok_or_else(|| AppError::not_found("EPG file", output_id))?;

        self.state_manager
            .update(
                JobStatusUpdate::new()
                    .running(true)
                    .step(format!("Starting merge for EPG file {}", output.name))
                    .progress(0)
                    .total_steps(1)
                    .start_time(Some(Utc::now()))
                    .end_time(None)
                    .error(None),
            )
            .await;

        let success = match self.merge_output(&registry, output).await {
            Ok(_) => true,
            Err(e) => {
                warn!("EPG merge failed for '{}': {}", output.name, e);
                self.state_manager
                    .update(JobStatusUpdate::new().error(Some(e.to_string())))
                    .await;
                false
            }
        };

        self.state_manager
            .update(
                JobStatusUpdate::new()
                    .running(false)
                    .progress(1)
                    .end_time(Some(Utc::now())),
            )
            .await;

        Ok(success)
    }

    /// Fetch, reconcile and store one output against the pass snapshot.
    ///
    /// Callers must hold the pass lock.
    async fn merge_output(
        &self,
        registry: &SourceRegistry,
        output: &EpgOutput,
    ) -> AppResult<MergeSummary> {
        if output.sources.is_empty() {
            warn!("No sources selected for EPG file '{}'", output.name);
            return Err(AppError::NoSources {
                name: output.name.clone(),
            });
        }

        info!(
            "Starting EPG merge for '{}' - fetching fresh data from {} sources",
            output.name,
            output.sources.len()
        );
        self.state_manager
            .update(
                JobStatusUpdate::new()
                    .epg_file(output.name.as_str())
                    .step(format!("Starting merge for '{}'", output.name))
                    .total_sources(output.sources.len())
                    .sources_completed(0),
            )
            .await;

        let active = registry.active_sources_for(output);
        if active.len() < output.sources.len() {
            debug!(
                "Skipping {} missing or disabled source(s) for '{}'",
                output.sources.len() - active.len(),
                output.name
            );
        }

        let mut merged = MergedEpg::default();
        let mut completed = 0;

        for source in active {
            let source_name = source.display_name();
            self.state_manager
                .update(
                    JobStatusUpdate::new()
                        .source(source_name)
                        .step(format!("Downloading from {}", source_name))
                        .sources_completed(completed),
                )
                .await;

            let document = match self.fetcher.fetch(&source.url).await {
                Ok(document) => document,
                Err(e) => {
                    warn!("Failed to fetch source '{}': {}", source_name, e);
                    completed += 1;
                    self.state_manager
                        .update(
                            JobStatusUpdate::new()
                                .step(format!("Failed to fetch from {}", source_name))
                                .sources_completed(completed),
                        )
                        .await;
                    continue;
                }
            };

            if let Err(e) = self
                .database
                .record_fetch_success(source.id, Utc::now())
                .await
            {
                warn!(
                    "Failed to record fetch time for source '{}': {}",
                    source_name, e
                );
            }

            completed += 1;
            self.state_manager
                .update(
                    JobStatusUpdate::new()
                        .step(format!("Processing data from {}", source_name))
                        .sources_completed(completed),
                )
                .await;

            merged.absorb(document);
        }

        self.state_manager
            .update(JobStatusUpdate::new().step(format!("Merging data for '{}'", output.name)))
            .await;

        let summary = merged.summary();
        let document = merged.into_document(&self.generator);
        self.storage.save(output.id, &document).await?;

        self.state_manager
            .update(JobStatusUpdate::new().step(format!(
                "Completed '{}' - {} channels, {} programmes",
                output.name, summary.channels, summary.programmes
            )))
            .await;

        info!(
            "EPG merge completed for '{}'. Total channels: {}, Total programmes: {}",
            output.name, summary.channels, summary.programmes
        );
        Ok(summary)
    }

    /// Fetch one source outside of any pass and report what it contains
    pub async fn test_fetch(&self, source_id: Uuid) -> AppResult<TestFetchResult> {
        let source = self
            .database
            .get_source(source_id)
            .await?
            .ok_or_else(|| AppError::not_found("source", source_id))?;

        info!("Testing source: {}", source.url);
        match self.fetcher.fetch(&source.url).await {
            Ok(document) => {
                if let Err(e) = self
                    .database
                    .record_fetch_success(source.id, Utc::now())
                    .await
                {
                    warn!(
                        "Failed to record fetch time for source '{}': {}",
                        source.display_name(),
                        e
                    );
                }
                Ok(TestFetchResult {
                    success: true,
                    channels: document.channel_count(),
                    programmes: document.programme_count(),
                    url: Some(source.url),
                    error: None,
                })
            }
            Err(e) => Ok(TestFetchResult {
                success: false,
                channels: 0,
                programmes: 0,
                url: Some(source.url),
                error: Some(e.to_string()),
            }),
        }
    }

    pub async fn current_status(&self) -> JobStatusView {
        self.state_manager.view().await
    }

    /// Remove an output from the configuration along with its stored document
    pub async fn delete_output(&self, output_id: Uuid) -> AppResult<EpgOutput> {
        let _pass = self.pass_lock.try_lock().map_err(|_| {
            warn!("EPG file {} deletion requested while a merge is running", output_id);
            AppError::Busy
        })?;

        let removed = self.database.delete_epg_output(output_id).await?;
        if self.storage.remove(output_id).await? {
            debug!("Removed stored document for '{}'", removed.name);
        }
        Ok(removed)
    }

    pub async fn output_stats(&self) -> AppResult<Vec<EpgOutputStats>> {
        let registry = self.database.snapshot().await?;
        let mut stats = Vec::with_capacity(registry.outputs.len());
        for output in registry.outputs {
            stats.push(EpgOutputStats {
                id: output.id,
                sources_count: output.sources.len(),
                stats: self.storage.stats(output.id).await,
                name: output.name,
            });
        }
        Ok(stats)
    }

    /// Stored document of an output and the file name to offer it under
    pub async fn stored_document(&self, output_id: Uuid) -> AppResult<(String, Vec<u8>)> {
        let contents = self
            .storage
            .read(output_id)
            .await?
            .ok_or_else(|| AppError::not_found("EPG file", output_id))?;
        let name = self
            .database
            .get_epg_output(output_id)
            .await?
            .map(|o| o.name)
            .unwrap_or_else(|| "epg_file".to_string());
        Ok((format!("{}.xml", name), contents))
    }
}
