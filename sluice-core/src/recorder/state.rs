//! Recorder state machine.

/// Two-state machine over the recorder's lifecycle.
///
/// `Preparing` is the initial state and is re-entered after every
/// discontinuity; `Muxing` is entered only through a successful resync
/// decision. Carrying the rebase pair in the variant means a segment anchor
/// exists exactly while muxing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MuxState {
    /// Buffering packets, waiting for cross-stream eligibility.
    Preparing,
    /// Forwarding packets to the muxer.
    Muxing {
        /// Source-timeline timestamp where the current segment starts.
        base_ts: f64,
        /// Output-timeline timestamp that `base_ts` maps to.
        rebase_ts: f64,
    },
}

impl MuxState {
    pub(crate) fn is_muxing(&self) -> bool {
        matches!(self, MuxState::Muxing { .. })
    }

    /// Offset added to every timestamp of the current segment, if any.
    pub(crate) fn rebase_offset(&self) -> Option<f64> {
        match self {
            MuxState::Preparing => None,
            MuxState::Muxing { base_ts, rebase_ts } => Some(rebase_ts - base_ts),
        }
    }
}
