//! Core abstractions for the muxing seam.
//!
//! These traits are the boundary between the resynchronizing buffer and the
//! actual container writer. The recorder calls them synchronously from the
//! single thread that feeds it packets; implementations must not assume any
//! other serialization.

use std::collections::HashMap;

use bytes::Bytes;
use thiserror::Error;

use crate::recorder::StreamDescriptor;

/// Handle for an output stream registered with the muxer.
///
/// Returned by [`StreamDeclarer::declare_stream`] and passed back with every
/// packet so the muxer can route it to the right container track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputStreamId(u32);

impl OutputStreamId {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub const fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for OutputStreamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Container-level metadata written with the header.
#[derive(Debug, Clone, Default)]
pub struct MuxMetadata {
    /// Free-form tag pairs, e.g. `encoding_tool`.
    pub tags: HashMap<String, String>,
}

/// A rebased packet handed to the muxer for writing.
///
/// Timestamps are in seconds on the output timeline. Absent timestamps are
/// propagated as `None`, never synthesized.
#[derive(Debug, Clone)]
pub struct MuxPacket {
    pub pts: Option<f64>,
    pub dts: Option<f64>,
    pub duration: Option<f64>,
    pub keyframe: bool,
    pub payload: Bytes,
}

/// Registers input streams with the output container.
///
/// Invoked once per input stream at session setup, in input-stream order.
/// There is no rollback: any failure aborts the whole session, since the
/// container's stream table cannot be amended after the header is written.
pub trait StreamDeclarer {
    /// Maps an input stream's codec parameters onto an output stream.
    ///
    /// # Errors
    ///
    /// - `MuxerError::UnsupportedCodec` - Codec cannot be represented in the
    ///   output format
    fn declare_stream(&mut self, descriptor: &StreamDescriptor)
    -> Result<OutputStreamId, MuxerError>;
}

/// Optional capability for formats that carry embedded attachments (fonts).
///
/// Formats that do not support attachments keep the defaults; the recorder
/// checks [`supports_attachments`](AttachmentEmbedder::supports_attachments)
/// before embedding anything.
pub trait AttachmentEmbedder {
    fn supports_attachments(&self) -> bool {
        false
    }

    /// Embeds one attachment into the output container.
    ///
    /// # Errors
    ///
    /// - `MuxerError::WriteFailed` - Attachment could not be added
    fn embed_attachment(
        &mut self,
        name: &str,
        mime_type: &str,
        data: &Bytes,
    ) -> Result<(), MuxerError> {
        let _ = (name, mime_type, data);
        Err(MuxerError::WriteFailed {
            reason: "attachments not supported by this muxer".to_string(),
        })
    }
}

/// Writes the output container.
///
/// Call order is fixed: `open`, then stream declaration and optional
/// attachments, then `write_header`, any number of `write_packet` calls
/// (interleaved across streams, per-stream order preserved by the caller),
/// then `write_trailer` and `close`. Implementations should release the
/// target in `Drop` if `close` was never reached (failed setup).
pub trait Muxer: StreamDeclarer + AttachmentEmbedder {
    /// Opens the output target, guessing the container format from it.
    ///
    /// # Errors
    ///
    /// - `MuxerError::UnsupportedFormat` - No container format matches the target
    /// - `MuxerError::TargetUnavailable` - Target cannot be opened for writing
    fn open(&mut self, target: &str) -> Result<(), MuxerError>;

    /// Writes the container header.
    ///
    /// # Errors
    ///
    /// - `MuxerError::WriteFailed` - Header could not be written
    fn write_header(&mut self, metadata: &MuxMetadata) -> Result<(), MuxerError>;

    /// Writes one rebased packet to the given output stream.
    ///
    /// # Errors
    ///
    /// - `MuxerError::WriteFailed` - Packet was rejected by the container layer
    fn write_packet(&mut self, stream: OutputStreamId, packet: &MuxPacket)
    -> Result<(), MuxerError>;

    /// Finalizes the container (trailer, index).
    ///
    /// # Errors
    ///
    /// - `MuxerError::WriteFailed` - Trailer could not be written
    fn write_trailer(&mut self) -> Result<(), MuxerError>;

    /// Closes the output target. Infallible by contract; failures are the
    /// implementation's to log.
    fn close(&mut self);
}

/// Errors surfaced by muxer collaborators.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MuxerError {
    /// No output container format could be determined for the target.
    #[error("Output format not found for target: {target}")]
    UnsupportedFormat { target: String },

    /// A stream's codec parameters cannot be mapped to the output format.
    #[error("Codec not supported by output format: {codec}")]
    UnsupportedCodec { codec: String },

    /// The output target could not be opened for writing.
    #[error("Failed opening output target: {reason}")]
    TargetUnavailable { reason: String },

    /// A header, packet, trailer, or attachment write was rejected.
    #[error("Write failed: {reason}")]
    WriteFailed { reason: String },
}
