//! Cross-stream resync decision.
//!
//! Decides whether every stream collectively holds enough buffered,
//! timestamp-bearing data to start (or resume) forwarding to the muxer, and
//! where the new segment anchors on both timelines. This is the recorder's
//! backpressure mechanism: nothing is emitted until the look-ahead is deep
//! enough to trust the computed minimum timestamp.

use crate::config::RecorderConfig;

use super::sink::StreamSink;
use super::types::{StreamKind, pts_min};

/// Anchor of a newly eligible segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResyncPoint {
    /// Minimum presentation timestamp observed across each stream's
    /// look-ahead window; the segment's start on the source timeline.
    pub(crate) base_ts: f64,
    /// Output-timeline position the segment must continue from: the highest
    /// already-forwarded timestamp across all streams, floored at 0 so the
    /// output never jumps backward.
    pub(crate) rebase_ts: f64,
}

/// Evaluates global eligibility over all sinks.
///
/// A stream is ready once it buffers at least its minimum packet count
/// (deep look-ahead for video, one packet otherwise). A stream below its
/// minimum only defers the decision if it has not signaled a proper end of
/// stream and is not a subtitle stream; subtitles may legitimately stay
/// silent for long stretches.
///
/// Returns `None` while any stream still defers, or when no stream produced
/// a usable timestamp (a segment must not start with an undefined anchor).
pub(crate) fn resync_point(sinks: &[StreamSink], config: &RecorderConfig) -> Option<ResyncPoint> {
    let mut min_ts: Option<f64> = None;
    let mut rebase_ts = 0.0f64;

    for sink in sinks {
        let min_packets = config.min_packets_for(sink.kind);

        if let Some(out_pts) = sink.max_out_pts {
            rebase_ts = rebase_ts.max(out_pts);
        }

        if sink.queue.len() < min_packets {
            if !sink.proper_eof && sink.kind != StreamKind::Subtitle {
                return None;
            }
            continue;
        }

        min_ts = pts_min(min_ts, sink.queue.min_pts_of_first(min_packets));
    }

    // Subtitle-only session, or no packet carried a pts at all.
    let base_ts = min_ts?;

    Some(ResyncPoint { base_ts, rebase_ts })
}
