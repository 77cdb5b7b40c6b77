//! The seam to the peer-to-peer transport.

use tokio::sync::mpsc;

use basaltbft_core_types::ConsensusMsg;

/// Where the context hands its own signed messages for delivery to peers.
///
/// Sends must not block: the context calls this from its consumer task.
pub trait BroadcastSink: Send + Sync + 'static {
    /// Queue the message for broadcast.
    fn broadcast(&self, msg: ConsensusMsg);
}

impl BroadcastSink for mpsc::UnboundedSender<ConsensusMsg> {
    fn broadcast(&self, msg: ConsensusMsg) {
        // The transport going away must not take consensus down with it.
        let _ = self.send(msg);
    }
}
