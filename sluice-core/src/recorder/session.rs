//! Recorder lifecycle: session setup, packet feeding, discontinuity
//! handling, and emission to the muxer.

use tracing::{debug, error, warn};

use crate::config::RecorderConfig;
use crate::mux::{MuxMetadata, MuxPacket, Muxer};

use super::resync::resync_point;
use super::sink::{Admission, StreamSink};
use super::state::MuxState;
use super::types::{
    Attachment, Packet, RecorderError, StreamDescriptor, StreamKind, pts_max, pts_shift,
};

/// Non-owning handle to one of a recorder's sinks.
///
/// Obtained from [`Recorder::sink`]; only meaningful for the session that
/// issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkHandle(usize);

/// Buffers multi-stream packets and forwards them to a muxer once the
/// cross-stream resync decision allows a continuous output segment.
///
/// Single-threaded and synchronous: every operation runs to completion, and
/// the caller serializes calls. Runtime admission and emission failures are
/// logged and swallowed; only session setup can fail.
pub struct Recorder {
    config: RecorderConfig,
    muxer: Box<dyn Muxer>,
    sinks: Vec<StreamSink>,
    state: MuxState,
    /// No discontinuity has occurred since the session started.
    muxing_from_start: bool,
    /// One-shot flag for the missing-DTS warning.
    dts_warned: bool,
}

impl Recorder {
    /// Opens the output target, declares every input stream, embeds
    /// attachments where the format supports them, and writes the container
    /// header.
    ///
    /// All-or-nothing: the stream table cannot be amended after the header,
    /// so any failure aborts the whole session and no partial session is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `RecorderError::NoStreams` - Empty stream list
    /// - `RecorderError::OpenFailed` - Muxer could not open the target
    /// - `RecorderError::DeclareFailed` - A stream could not be declared
    /// - `RecorderError::AttachmentFailed` - An attachment was rejected
    /// - `RecorderError::HeaderFailed` - Header write failed
    pub fn create(
        mut muxer: Box<dyn Muxer>,
        target: &str,
        streams: &[StreamDescriptor],
        attachments: &[Attachment],
        config: RecorderConfig,
    ) -> Result<Self, RecorderError> {
        if streams.is_empty() {
            return Err(RecorderError::NoStreams);
        }

        muxer
            .open(target)
            .map_err(|source| RecorderError::OpenFailed { source })?;

        let mut sinks = Vec::with_capacity(streams.len());
        for (index, descriptor) in streams.iter().enumerate() {
            let output = muxer
                .declare_stream(descriptor)
                .map_err(|source| RecorderError::DeclareFailed {
                    stream: index,
                    source,
                })?;
            sinks.push(StreamSink::new(
                descriptor.kind,
                output,
                config.max_queued_packets,
            ));
        }

        if muxer.supports_attachments() {
            for attachment in attachments {
                muxer
                    .embed_attachment(&attachment.name, &attachment.mime_type, &attachment.data)
                    .map_err(|source| RecorderError::AttachmentFailed {
                        name: attachment.name.clone(),
                        source,
                    })?;
            }
        }

        let mut metadata = MuxMetadata::default();
        metadata
            .tags
            .insert("encoding_tool".to_string(), config.encoding_tool.clone());

        muxer
            .write_header(&metadata)
            .map_err(|source| RecorderError::HeaderFailed { source })?;

        warn!(
            "Recording output files might be broken or not play correctly \
             with various players."
        );

        Ok(Self {
            config,
            muxer,
            sinks,
            state: MuxState::Preparing,
            muxing_from_start: true,
            dts_warned: false,
        })
    }

    /// Returns a handle for the input stream at `stream` (its position in
    /// the stream list passed to [`Recorder::create`]), or `None` if out of
    /// range. Handles stay valid for the life of the recorder.
    pub fn sink(&self, stream: usize) -> Option<SinkHandle> {
        (stream < self.sinks.len()).then_some(SinkHandle(stream))
    }

    /// Feeds one packet to a sink, or `None` to signal that stream's clean
    /// end. The recorder owns its copy of the packet.
    ///
    /// Re-evaluates the resync decision after buffering and, once muxing,
    /// drains this sink's admitted packets to the muxer in order.
    pub fn feed(&mut self, handle: SinkHandle, packet: Option<Packet>) {
        let SinkHandle(index) = handle;
        if index >= self.sinks.len() {
            warn!("Ignoring packet for unknown sink {index}");
            return;
        }

        let Some(packet) = packet else {
            self.sinks[index].mark_eof();
            self.check_restart();
            self.drain_sink(index);
            return;
        };

        if packet.dts.is_none() && !self.dts_warned {
            warn!(
                "Source stream misses DTS on at least some packets! If the \
                 target file format requires DTS, the written file will be \
                 invalid."
            );
            self.dts_warned = true;
        }

        match self.sinks[index].admit(packet) {
            Admission::BlockedByDiscontinuity => return,
            Admission::QueueFull => {
                error!("Stream {index} has too many queued packets; dropping.");
                return;
            }
            Admission::Queued => {}
        }

        self.check_restart();
        self.drain_sink(index);
    }

    /// Marks a break in the source timeline (seek, gap, or recording started
    /// mid-stream).
    ///
    /// Already-admitted packets still queued are forwarded first; everything
    /// not yet admitted is discarded. The recorder re-enters preparation and
    /// will not emit again until the next successful resync.
    pub fn mark_discontinuity(&mut self) {
        for index in 0..self.sinks.len() {
            self.drain_sink(index);
        }
        for sink in &mut self.sinks {
            sink.discont = true;
            sink.proper_eof = false;
            sink.queue.clear();
        }
        self.state = MuxState::Preparing;
        self.muxing_from_start = false;
    }

    /// Finalizes the session: forwards remaining admitted packets, writes the
    /// trailer, and closes the target. Finalization failures are logged; all
    /// buffers are released regardless.
    pub fn destroy(mut self) {
        for index in 0..self.sinks.len() {
            self.drain_sink(index);
        }

        if let Err(e) = self.muxer.write_trailer() {
            error!("Writing trailer failed: {e}");
        }
        self.muxer.close();
    }

    /// Re-evaluates global eligibility; no-op while already muxing.
    fn check_restart(&mut self) {
        if self.state.is_muxing() {
            return;
        }

        let Some(point) = resync_point(&self.sinks, &self.config) else {
            return;
        };

        // Reset every watermark to the segment start so the next rebase
        // continues from this segment's output.
        for sink in &mut self.sinks {
            sink.max_out_pts = Some(point.base_ts);
        }

        self.state = MuxState::Muxing {
            base_ts: point.base_ts,
            rebase_ts: point.rebase_ts,
        };

        debug!(
            "Resynced: segment base {} rebased to {}",
            point.base_ts, point.rebase_ts
        );

        if !self.muxing_from_start {
            warn!("Discontinuity at timestamp {}.", point.rebase_ts);
        }
    }

    /// Forwards all packets queued in one sink, in order. No-op unless
    /// muxing.
    fn drain_sink(&mut self, index: usize) {
        let Some(offset) = self.state.rebase_offset() else {
            return;
        };
        if self.sinks[index].queue.is_empty() {
            return;
        }

        let packets: Vec<Packet> = self.sinks[index].queue.drain_all().collect();
        for packet in packets {
            self.forward_packet(index, packet, offset);
        }
    }

    /// Rebases one packet onto the output timeline and hands it to the
    /// muxer. A rejected packet is logged and not retried.
    fn forward_packet(&mut self, index: usize, packet: Packet, offset: f64) {
        let sink = &mut self.sinks[index];

        sink.max_out_pts = pts_max(sink.max_out_pts, packet.pts);

        // Unknown duration becomes zero except for subtitles, which keep an
        // implicit duration.
        let duration = match packet.duration {
            None if sink.kind != StreamKind::Subtitle => Some(0.0),
            other => other,
        };

        let rebased = MuxPacket {
            pts: pts_shift(packet.pts, offset),
            dts: pts_shift(packet.dts, offset),
            duration,
            keyframe: packet.keyframe,
            payload: packet.payload,
        };

        if let Err(e) = self.muxer.write_packet(sink.output, &rebased) {
            error!("Failed writing packet on stream {}: {e}", sink.output);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;

    use super::*;
    use crate::mux::{OutputStreamId, SimulationMuxer, SimulationMuxerLog};

    // Type alias for the shared call log handle
    type SharedLog = Arc<Mutex<SimulationMuxerLog>>;

    fn descriptor(kind: StreamKind) -> StreamDescriptor {
        StreamDescriptor {
            kind,
            codec: "test".to_string(),
            codec_parameters: Bytes::new(),
        }
    }

    fn packet(pts: f64, keyframe: bool) -> Packet {
        Packet {
            pts: Some(pts),
            dts: Some(pts),
            duration: Some(1.0),
            keyframe,
            payload: Bytes::from_static(b"payload"),
        }
    }

    fn video_audio_recorder() -> (Recorder, SharedLog) {
        let muxer = SimulationMuxer::new();
        let log = muxer.log();
        let recorder = Recorder::create(
            Box::new(muxer),
            "out.mkv",
            &[descriptor(StreamKind::Video), descriptor(StreamKind::Audio)],
            &[],
            RecorderConfig::default(),
        )
        .unwrap();
        (recorder, log)
    }

    #[test]
    fn test_create_requires_streams() {
        let result = Recorder::create(
            Box::new(SimulationMuxer::new()),
            "out.mkv",
            &[],
            &[],
            RecorderConfig::default(),
        );
        assert!(matches!(result, Err(RecorderError::NoStreams)));
    }

    #[test]
    fn test_declare_failure_aborts_session() {
        let result = Recorder::create(
            Box::new(SimulationMuxer::new().failing_declare()),
            "out.mkv",
            &[descriptor(StreamKind::Video)],
            &[],
            RecorderConfig::default(),
        );
        assert!(matches!(
            result,
            Err(RecorderError::DeclareFailed { stream: 0, .. })
        ));
    }

    #[test]
    fn test_header_failure_aborts_session() {
        let result = Recorder::create(
            Box::new(SimulationMuxer::new().failing_header()),
            "out.mkv",
            &[descriptor(StreamKind::Video)],
            &[],
            RecorderConfig::default(),
        );
        assert!(matches!(result, Err(RecorderError::HeaderFailed { .. })));
    }

    #[test]
    fn test_attachments_embedded_only_when_supported() {
        let attachment = Attachment {
            name: "font.ttf".to_string(),
            mime_type: "font/ttf".to_string(),
            data: Bytes::from_static(b"glyphs"),
        };

        let muxer = SimulationMuxer::new().with_attachment_support();
        let log = muxer.log();
        Recorder::create(
            Box::new(muxer),
            "out.mkv",
            &[descriptor(StreamKind::Video)],
            std::slice::from_ref(&attachment),
            RecorderConfig::default(),
        )
        .unwrap();
        assert_eq!(log.lock().unwrap().attachments.len(), 1);

        let muxer = SimulationMuxer::new();
        let log = muxer.log();
        Recorder::create(
            Box::new(muxer),
            "out.mp4",
            &[descriptor(StreamKind::Video)],
            std::slice::from_ref(&attachment),
            RecorderConfig::default(),
        )
        .unwrap();
        assert!(log.lock().unwrap().attachments.is_empty());
    }

    #[test]
    fn test_sink_lookup() {
        let (recorder, _log) = video_audio_recorder();
        assert!(recorder.sink(0).is_some());
        assert!(recorder.sink(1).is_some());
        assert!(recorder.sink(2).is_none());
    }

    #[test]
    fn test_no_emission_while_preparing() {
        let (mut recorder, log) = video_audio_recorder();
        let video = recorder.sink(0).unwrap();
        let audio = recorder.sink(1).unwrap();

        for n in 0..15 {
            recorder.feed(video, Some(packet(n as f64, n == 0)));
        }
        recorder.feed(audio, Some(packet(5.0, true)));

        assert!(log.lock().unwrap().packets.is_empty());
    }

    #[test]
    fn test_resync_forwards_buffered_packets_in_order() {
        let (mut recorder, log) = video_audio_recorder();
        let video = recorder.sink(0).unwrap();
        let audio = recorder.sink(1).unwrap();

        for n in 0..15 {
            recorder.feed(video, Some(packet(n as f64, n == 0)));
        }
        recorder.feed(audio, Some(packet(5.0, true)));
        // The 16th video packet completes the look-ahead window.
        recorder.feed(video, Some(packet(15.0, false)));

        let log = log.lock().unwrap();
        let video_out: Vec<_> = log.stream_pts(OutputStreamId::new(0));
        assert_eq!(video_out.len(), 16);
        // First segment starts at source pts 0, so timestamps pass unchanged.
        assert_eq!(video_out[0], Some(0.0));
        assert_eq!(video_out[15], Some(15.0));
    }

    #[test]
    fn test_audio_queue_drains_on_next_feed() {
        let (mut recorder, log) = video_audio_recorder();
        let video = recorder.sink(0).unwrap();
        let audio = recorder.sink(1).unwrap();

        recorder.feed(audio, Some(packet(5.0, true)));
        for n in 0..16 {
            recorder.feed(video, Some(packet(n as f64, n == 0)));
        }

        // The resync was triggered by a video feed, so only the video queue
        // has drained so far.
        assert_eq!(
            log.lock()
                .unwrap()
                .stream_pts(OutputStreamId::new(1)),
            Vec::<Option<f64>>::new()
        );

        recorder.feed(audio, Some(packet(6.0, true)));
        assert_eq!(
            log.lock()
                .unwrap()
                .stream_pts(OutputStreamId::new(1)),
            vec![Some(5.0), Some(6.0)]
        );
    }

    #[test]
    fn test_eof_satisfies_resync_and_flushes() {
        let (mut recorder, log) = video_audio_recorder();
        let video = recorder.sink(0).unwrap();
        let audio = recorder.sink(1).unwrap();

        for n in 0..16 {
            recorder.feed(video, Some(packet(n as f64, n == 0)));
        }
        assert!(log.lock().unwrap().packets.is_empty());

        // Clean end of the audio stream unblocks the global decision, but
        // the video queue only drains on its next feed or on destroy.
        recorder.feed(audio, None);
        assert!(log.lock().unwrap().packets.is_empty());

        recorder.destroy();
        assert_eq!(log.lock().unwrap().packets.len(), 16);
    }

    #[test]
    fn test_unknown_duration_defaults_to_zero_except_subtitles() {
        let muxer = SimulationMuxer::new();
        let log = muxer.log();
        let mut recorder = Recorder::create(
            Box::new(muxer),
            "out.mkv",
            &[descriptor(StreamKind::Audio), descriptor(StreamKind::Subtitle)],
            &[],
            RecorderConfig::default(),
        )
        .unwrap();
        let audio = recorder.sink(0).unwrap();
        let subs = recorder.sink(1).unwrap();

        let mut no_duration = packet(0.0, true);
        no_duration.duration = None;
        recorder.feed(audio, Some(no_duration.clone()));
        recorder.feed(subs, Some(no_duration));

        let log = log.lock().unwrap();
        assert_eq!(log.packets[0].duration, Some(0.0));
        assert_eq!(log.packets[1].duration, None);
    }

    #[test]
    fn test_write_failure_does_not_stop_session() {
        let muxer = SimulationMuxer::new().failing_packet_writes();
        let log = muxer.log();
        let mut recorder = Recorder::create(
            Box::new(muxer),
            "out.mkv",
            &[descriptor(StreamKind::Audio)],
            &[],
            RecorderConfig::default(),
        )
        .unwrap();
        let audio = recorder.sink(0).unwrap();

        recorder.feed(audio, Some(packet(0.0, true)));
        recorder.feed(audio, Some(packet(1.0, false)));

        // Both writes were attempted despite the first rejection.
        assert_eq!(log.lock().unwrap().packets.len(), 2);
    }

    #[test]
    fn test_destroy_writes_one_trailer_and_closes() {
        let (mut recorder, log) = video_audio_recorder();
        let video = recorder.sink(0).unwrap();
        let audio = recorder.sink(1).unwrap();
        for n in 0..16 {
            recorder.feed(video, Some(packet(n as f64, n == 0)));
        }
        recorder.feed(audio, Some(packet(5.0, true)));
        recorder.destroy();

        let log = log.lock().unwrap();
        assert_eq!(log.header_writes, 1);
        assert_eq!(log.trailer_writes, 1);
        assert!(log.closed);
    }

    #[test]
    fn test_destroy_with_empty_queues() {
        let (recorder, log) = video_audio_recorder();
        recorder.destroy();

        let log = log.lock().unwrap();
        assert_eq!(log.header_writes, 1);
        assert_eq!(log.trailer_writes, 1);
        assert!(log.packets.is_empty());
    }
}
