//! Snapshot of the operator configuration: sources, outputs and schedule

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EpgOutput, Source, DEFAULT_SCHEDULE_INTERVAL_SECS};

/// The whole operator configuration as loaded from the configuration store.
///
/// A merge pass works on one snapshot taken at pass start; writes go through
/// [`crate::database::Database`] so the snapshot itself is never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceRegistry {
    #[serde(default)]
    pub sources: Vec<Source>,
    #[serde(default, rename = "epg_files")]
    pub outputs: Vec<EpgOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_interval: Option<u64>,
}

impl SourceRegistry {
    pub fn find_source(&self, id: Uuid) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn find_source_mut(&mut self, id: Uuid) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.id == id)
    }

    pub fn find_output(&self, id: Uuid) -> Option<&EpgOutput> {
        self.outputs.iter().find(|o| o.id == id)
    }

    pub fn find_output_mut(&mut self, id: Uuid) -> Option<&mut EpgOutput> {
        self.outputs.iter_mut().find(|o| o.id == id)
    }

    /// Configured interval, or the 2 hour default
    pub fn schedule_interval_secs(&self) -> u64 {
        self.schedule_interval
            .unwrap_or(DEFAULT_SCHEDULE_INTERVAL_SECS)
    }

    /// Sources an output will actually fetch, in the output's order.
    ///
    /// References to deleted or disabled sources are dropped silently.
    pub fn active_sources_for<'a>(&'a self, output: &EpgOutput) -> Vec<&'a Source> {
        output
            .sources
            .iter()
            .filter_map(|id| self.find_source(*id))
            .filter(|source| source.enabled)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_sources_keep_output_order_and_skip_unusable() {
        let a = Source::new("http://a/epg.xml", "A");
        let mut b = Source::new("http://b/epg.xml", "B");
        b.enabled = false;
        let c = Source::new("http://c/epg.xml", "C");

        let mut output = EpgOutput::new("main");
        output.sources = vec![c.id, Uuid::new_v4(), b.id, a.id];

        let registry = SourceRegistry {
            sources: vec![a.clone(), b, c.clone()],
            outputs: vec![output.clone()],
            schedule_interval: None,
        };

        let active: Vec<Uuid> = registry
            .active_sources_for(&output)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(active, vec![c.id, a.id]);
        assert_eq!(registry.schedule_interval_secs(), 7200);
    }

    #[test]
    fn test_missing_enabled_flag_defaults_to_true() {
        let json = r#"{
            "sources": [{"id": "6f1c1f50-3c1e-4c4b-9a53-4c1d2f9b3a10", "url": "http://x/guide.xml"}],
            "epg_files": [],
            "schedule_interval": 3600
        }"#;
        let registry: SourceRegistry = serde_json::from_str(json).unwrap();
        assert!(registry.sources[0].enabled);
        assert_eq!(registry.sources[0].display_name(), "Unnamed Source");
        assert_eq!(registry.schedule_interval_secs(), 3600);
    }
}
