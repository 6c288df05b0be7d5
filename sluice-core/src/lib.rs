//! Sluice Core - Segment-resynchronizing multiplexer buffer
//!
//! This crate buffers timestamped packets from several independent input
//! streams (video, audio, subtitles) and decides when enough data has
//! accumulated across all of them to resume writing a continuous output
//! container after a stream start, seek, or gap. Container writing itself is
//! delegated to a [`mux::Muxer`] collaborator; the crate owns the temporal
//! alignment, admission control, and timestamp rebasing.

pub mod config;
pub mod mux;
pub mod recorder;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::RecorderConfig;
pub use mux::{Muxer, MuxerError, SimulationMuxer};
pub use recorder::{Packet, Recorder, RecorderError, StreamDescriptor, StreamKind};

/// Core errors that can bubble up from any Sluice subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SluiceError {
    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Muxer error: {0}")]
    Muxer(#[from] MuxerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SluiceError>;
