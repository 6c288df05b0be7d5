//! Per-stream sink: one packet queue plus resync state.

use crate::mux::OutputStreamId;

use super::queue::PacketQueue;
use super::types::{Packet, StreamKind};

/// Outcome of offering a packet to a sink's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Packet was appended to the queue.
    Queued,
    /// Dropped: the stream is in a discontinuity and the packet is not a
    /// keyframe, so playback could not resume from it.
    BlockedByDiscontinuity,
    /// Dropped: the queue is at capacity.
    QueueFull,
}

/// One input stream's buffering and resync state.
///
/// Owned exclusively by the recorder; callers address it through an index
/// handle, never a reference.
#[derive(Debug)]
pub(crate) struct StreamSink {
    pub(crate) kind: StreamKind,
    /// Output stream this sink forwards to.
    pub(crate) output: OutputStreamId,
    /// Drop non-keyframe packets until the next keyframe.
    pub(crate) discont: bool,
    /// Caller signaled clean end of stream; the resync decision must not
    /// stall waiting for more packets here.
    pub(crate) proper_eof: bool,
    /// Highest source-timeline pts forwarded, or the rebase floor set at the
    /// last resync.
    pub(crate) max_out_pts: Option<f64>,
    pub(crate) queue: PacketQueue,
}

impl StreamSink {
    pub(crate) fn new(kind: StreamKind, output: OutputStreamId, queue_capacity: usize) -> Self {
        Self {
            kind,
            output,
            discont: false,
            proper_eof: false,
            max_out_pts: None,
            queue: PacketQueue::new(queue_capacity),
        }
    }

    /// Offers a packet to the queue, applying the discontinuity keyframe gate
    /// and the capacity bound.
    pub(crate) fn admit(&mut self, packet: Packet) -> Admission {
        if self.discont && !packet.keyframe {
            return Admission::BlockedByDiscontinuity;
        }
        self.discont = false;

        match self.queue.push(packet) {
            Ok(()) => Admission::Queued,
            Err(_) => Admission::QueueFull,
        }
    }

    pub(crate) fn mark_eof(&mut self) {
        self.proper_eof = true;
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn packet(pts: f64, keyframe: bool) -> Packet {
        Packet {
            pts: Some(pts),
            dts: Some(pts),
            duration: None,
            keyframe,
            payload: Bytes::new(),
        }
    }

    fn sink(capacity: usize) -> StreamSink {
        StreamSink::new(StreamKind::Video, OutputStreamId::new(0), capacity)
    }

    #[test]
    fn test_discontinuity_gate_blocks_until_keyframe() {
        let mut sink = sink(8);
        sink.discont = true;

        assert_eq!(
            sink.admit(packet(0.0, false)),
            Admission::BlockedByDiscontinuity
        );
        assert!(sink.discont);
        assert_eq!(sink.queue.len(), 0);

        assert_eq!(sink.admit(packet(1.0, true)), Admission::Queued);
        assert!(!sink.discont);

        // Once cleared, non-keyframes flow again.
        assert_eq!(sink.admit(packet(2.0, false)), Admission::Queued);
        assert_eq!(sink.queue.len(), 2);
    }

    #[test]
    fn test_capacity_reported_as_queue_full() {
        let mut sink = sink(1);
        assert_eq!(sink.admit(packet(0.0, true)), Admission::Queued);
        assert_eq!(sink.admit(packet(1.0, true)), Admission::QueueFull);
        assert_eq!(sink.queue.len(), 1);
    }

    #[test]
    fn test_mark_eof() {
        let mut sink = sink(1);
        assert!(!sink.proper_eof);
        sink.mark_eof();
        assert!(sink.proper_eof);
    }
}
