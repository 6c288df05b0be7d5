//! Value types shared across the recorder.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mux::MuxerError;

/// Broad media category of an input stream.
///
/// Drives the resync minimum (video needs look-ahead) and the special cases
/// for subtitles (long legitimate gaps, implicit durations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Other,
}

/// Description of one input stream, consumed opaquely by the muxer's
/// stream declaration at session setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub kind: StreamKind,
    /// Codec name as the demuxer reports it, e.g. "h264".
    pub codec: String,
    /// Opaque codec parameter blob (extradata) passed through to the muxer.
    #[serde(default, skip_serializing_if = "Bytes::is_empty")]
    pub codec_parameters: Bytes,
}

/// A file embedded into the output container when the format supports it
/// (typically fonts for subtitle rendering).
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// One demuxed packet as fed to the recorder.
///
/// Timestamps are seconds on the source timeline; absent timestamps are
/// `None`, never a sentinel value. The recorder owns its copy once fed.
#[derive(Debug, Clone)]
pub struct Packet {
    pub pts: Option<f64>,
    pub dts: Option<f64>,
    pub duration: Option<f64>,
    pub keyframe: bool,
    pub payload: Bytes,
}

/// Errors that can abort recorder session creation.
///
/// Everything here is fatal and all-or-nothing: the output container's
/// stream table cannot be amended after the header is written, so no partial
/// session is ever returned.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// Session was created with an empty stream list.
    #[error("No streams")]
    NoStreams,

    /// The muxer could not open the output target.
    #[error("Failed opening output: {source}")]
    OpenFailed { source: MuxerError },

    /// One input stream could not be declared to the muxer.
    #[error("Can't mux input stream {stream}: {source}")]
    DeclareFailed { stream: usize, source: MuxerError },

    /// An attachment could not be embedded.
    #[error("Can't mux attachment {name}: {source}")]
    AttachmentFailed { name: String, source: MuxerError },

    /// The container header could not be written.
    #[error("Writing header failed: {source}")]
    HeaderFailed { source: MuxerError },
}

/// Maximum of two optional timestamps; an absent side loses.
pub(crate) fn pts_max(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Minimum of two optional timestamps; an absent side loses.
pub(crate) fn pts_min(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Shifts a timestamp, leaving absent timestamps absent.
pub(crate) fn pts_shift(ts: Option<f64>, by: f64) -> Option<f64> {
    ts.map(|t| t + by)
}
