//! Centralized configuration for Sluice.
//!
//! All tunable parameters are defined here to avoid hard-coded values
//! scattered throughout the codebase.

use serde::{Deserialize, Serialize};

/// Tunables for the recorder's per-stream packet queues and output metadata.
///
/// Supports deserialization so hosts can override defaults from their own
/// configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Maximum number of packets buffered per stream while attempting to
    /// resync. Should be higher than the highest supported keyframe interval;
    /// packets beyond this are dropped, not queued.
    pub max_queued_packets: usize,
    /// Minimum number of packets a video stream must buffer before its
    /// timestamps are trusted. Codec delay and frame reordering mean the true
    /// minimum presentation timestamp is often not in the first packet.
    pub min_video_packets: usize,
    /// Value written into the output container's `encoding_tool` metadata tag.
    pub encoding_tool: String,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_queued_packets: 256, // > keyframe interval of common encodes
            min_video_packets: 16,
            encoding_tool: concat!("sluice ", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RecorderConfig {
    /// Returns the minimum queue depth required before the given stream's
    /// buffered timestamps are considered trustworthy.
    pub fn min_packets_for(&self, kind: crate::recorder::StreamKind) -> usize {
        match kind {
            crate::recorder::StreamKind::Video => self.min_video_packets,
            _ => 1,
        }
    }
}
