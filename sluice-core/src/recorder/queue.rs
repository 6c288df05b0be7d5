//! Bounded per-stream packet queue.

use std::collections::VecDeque;

use thiserror::Error;

use super::types::{Packet, pts_min};

/// The queue is at capacity; the incoming packet was not stored.
#[derive(Debug, Error)]
#[error("packet queue at capacity")]
pub(crate) struct QueueFull;

/// Ordered buffer of packets awaiting a resync decision.
///
/// Capacity is fixed at construction. Overflow drops the incoming packet
/// rather than growing or blocking; this is the recorder's only backpressure
/// valve, trading data loss for bounded memory.
#[derive(Debug)]
pub(crate) struct PacketQueue {
    packets: VecDeque<Packet>,
    capacity: usize,
}

impl PacketQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            packets: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.packets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Appends to the tail, preserving source order.
    pub(crate) fn push(&mut self, packet: Packet) -> Result<(), QueueFull> {
        if self.packets.len() >= self.capacity {
            return Err(QueueFull);
        }
        self.packets.push_back(packet);
        Ok(())
    }

    /// Removes and returns all buffered packets in order.
    pub(crate) fn drain_all(&mut self) -> impl Iterator<Item = Packet> + '_ {
        self.packets.drain(..)
    }

    /// Discards all buffered packets.
    pub(crate) fn clear(&mut self) {
        self.packets.clear();
    }

    /// Minimum presentation timestamp among the first `n` buffered packets.
    ///
    /// Compensates for encoder reordering: the true segment start may not be
    /// the first packet received.
    pub(crate) fn min_pts_of_first(&self, n: usize) -> Option<f64> {
        self.packets
            .iter()
            .take(n)
            .fold(None, |acc, packet| pts_min(acc, packet.pts))
    }
}
