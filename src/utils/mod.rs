//! Utility helpers shared by the fetch, merge and web layers
//!
//! - `decompression` for gzip detection and inflation of downloaded feeds
//! - `datetime` for lenient timestamp parsing of stored configuration
//! - `time` for human-readable durations

pub mod datetime;
pub mod decompression;
pub mod time;

pub use decompression::{CompressionFormat, DecompressionService};
