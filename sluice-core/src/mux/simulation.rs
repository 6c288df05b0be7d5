//! In-memory muxer for tests and simulation runs.
//!
//! Records every lifecycle call instead of writing a container, so tests can
//! assert exactly what the recorder emitted and when. Failure injection flags
//! cover the recoverable and fatal error paths.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tracing::debug;

use super::traits::{
    AttachmentEmbedder, MuxMetadata, MuxPacket, Muxer, MuxerError, OutputStreamId, StreamDeclarer,
};
use crate::recorder::StreamDescriptor;

/// One packet as seen by the simulated container layer.
#[derive(Debug, Clone)]
pub struct WrittenPacket {
    pub stream: OutputStreamId,
    pub pts: Option<f64>,
    pub dts: Option<f64>,
    pub duration: Option<f64>,
    pub keyframe: bool,
    pub payload_len: usize,
}

/// Everything the simulated muxer has been asked to do so far.
#[derive(Debug, Default)]
pub struct SimulationMuxerLog {
    pub target: Option<String>,
    pub declared: Vec<StreamDescriptor>,
    pub attachments: Vec<(String, String, usize)>,
    pub metadata: Option<MuxMetadata>,
    pub header_writes: u32,
    pub packets: Vec<WrittenPacket>,
    pub trailer_writes: u32,
    pub closed: bool,
}

impl SimulationMuxerLog {
    /// Output-timeline pts of every packet written to one stream, in write order.
    pub fn stream_pts(&self, stream: OutputStreamId) -> Vec<Option<f64>> {
        self.packets
            .iter()
            .filter(|p| p.stream == stream)
            .map(|p| p.pts)
            .collect()
    }
}

/// Muxer implementation that records calls instead of writing a container.
#[derive(Default)]
pub struct SimulationMuxer {
    log: Arc<Mutex<SimulationMuxerLog>>,
    supports_attachments: bool,
    fail_declare: bool,
    fail_header: bool,
    fail_packet_writes: bool,
}

impl SimulationMuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the call log; stays valid after the muxer is handed
    /// to a recorder.
    pub fn log(&self) -> Arc<Mutex<SimulationMuxerLog>> {
        Arc::clone(&self.log)
    }

    /// Simulate a format with embedded-attachment support (e.g. Matroska).
    pub fn with_attachment_support(mut self) -> Self {
        self.supports_attachments = true;
        self
    }

    /// Reject every stream declaration.
    pub fn failing_declare(mut self) -> Self {
        self.fail_declare = true;
        self
    }

    /// Reject the header write.
    pub fn failing_header(mut self) -> Self {
        self.fail_header = true;
        self
    }

    /// Reject every packet write while still recording the attempt.
    pub fn failing_packet_writes(mut self) -> Self {
        self.fail_packet_writes = true;
        self
    }
}

impl StreamDeclarer for SimulationMuxer {
    fn declare_stream(
        &mut self,
        descriptor: &StreamDescriptor,
    ) -> Result<OutputStreamId, MuxerError> {
        if self.fail_declare {
            return Err(MuxerError::UnsupportedCodec {
                codec: descriptor.codec.clone(),
            });
        }
        let mut log = self.log.lock().unwrap();
        log.declared.push(descriptor.clone());
        let id = OutputStreamId::new(log.declared.len() as u32 - 1);
        debug!("Simulated muxer declared stream {id} ({:?})", descriptor.kind);
        Ok(id)
    }
}

impl AttachmentEmbedder for SimulationMuxer {
    fn supports_attachments(&self) -> bool {
        self.supports_attachments
    }

    fn embed_attachment(
        &mut self,
        name: &str,
        mime_type: &str,
        data: &Bytes,
    ) -> Result<(), MuxerError> {
        let mut log = self.log.lock().unwrap();
        log.attachments
            .push((name.to_string(), mime_type.to_string(), data.len()));
        Ok(())
    }
}

impl Muxer for SimulationMuxer {
    fn open(&mut self, target: &str) -> Result<(), MuxerError> {
        self.log.lock().unwrap().target = Some(target.to_string());
        Ok(())
    }

    fn write_header(&mut self, metadata: &MuxMetadata) -> Result<(), MuxerError> {
        if self.fail_header {
            return Err(MuxerError::WriteFailed {
                reason: "simulated header failure".to_string(),
            });
        }
        let mut log = self.log.lock().unwrap();
        log.metadata = Some(metadata.clone());
        log.header_writes += 1;
        Ok(())
    }

    fn write_packet(
        &mut self,
        stream: OutputStreamId,
        packet: &MuxPacket,
    ) -> Result<(), MuxerError> {
        let mut log = self.log.lock().unwrap();
        log.packets.push(WrittenPacket {
            stream,
            pts: packet.pts,
            dts: packet.dts,
            duration: packet.duration,
            keyframe: packet.keyframe,
            payload_len: packet.payload.len(),
        });
        if self.fail_packet_writes {
            return Err(MuxerError::WriteFailed {
                reason: "simulated packet rejection".to_string(),
            });
        }
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<(), MuxerError> {
        self.log.lock().unwrap().trailer_writes += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closed = true;
    }
}
