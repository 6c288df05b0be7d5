//! Collaborator seam for container multiplexing.
//!
//! The recorder never writes containers itself. It drives an opaque [`Muxer`]
//! through a fixed lifecycle (open, declare streams, header, packets,
//! trailer, close) and stays agnostic to the container format behind it.
//! [`SimulationMuxer`] implements the same seam in-memory for tests.

mod simulation;
mod traits;

pub use simulation::{SimulationMuxer, SimulationMuxerLog, WrittenPacket};
pub use traits::{
    AttachmentEmbedder, MuxMetadata, MuxPacket, Muxer, MuxerError, OutputStreamId, StreamDeclarer,
};
