//! Segment-resynchronizing recorder.
//!
//! Ingests a live, possibly discontinuous stream of timestamped packets from
//! several input streams and decides per output segment when enough data has
//! accumulated across all of them to resume writing a continuous container.
//! The flow is: caller feeds a sink, the sink buffers and validates, the
//! resync check re-evaluates global eligibility, and once eligible the
//! recorder drains queues, rebases timestamps, and forwards packets to the
//! muxer in per-stream order.

mod queue;
mod resync;
mod session;
mod sink;
mod state;
mod types;

pub use session::{Recorder, SinkHandle};
pub use types::{Attachment, Packet, RecorderError, StreamDescriptor, StreamKind};
