//! Service layer
//!
//! Business operations that coordinate the registry, the fetcher, document
//! storage and the job status record.

pub mod epg_merge;

pub use epg_merge::MergeService;
