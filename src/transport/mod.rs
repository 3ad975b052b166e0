//! Radio transport abstraction
//!
//! The link layer underneath the protocol is treated as given: a
//! connectionless, broadcast-capable datagram service with a per-station peer
//! table. Implementations must handle:
//! - Channel selection and peer registration
//! - Fire-and-forget sends
//! - Invoking the receive callback from their own execution context
//!
//! Sends never block on delivery. The send-complete callback is diagnostic
//! only and must never gate protocol logic.

use crate::contracts::{Channel, PeerAddress};
use crate::errors::TransportError;

pub mod air;

pub use air::{Air, AirTransport, Frame};

/// Invoked with the sender address and raw bytes of every delivered datagram
pub type ReceiveCallback = Box<dyn Fn(PeerAddress, &[u8]) + Send + Sync + 'static>;

/// Invoked with the destination address and delivery result of every send
pub type SendCompleteCallback = Box<dyn Fn(PeerAddress, bool) + Send + Sync + 'static>;

/// Radio transport used by both peers
pub trait RadioTransport {
    /// Bind to `channel` and register `peer` as the initial peer
    ///
    /// Calling it again rebinds the channel and adds `peer`; callbacks and
    /// existing peers are kept.
    fn initialize(&mut self, channel: Channel, peer: PeerAddress) -> Result<(), TransportError>;

    /// Register a peer on `channel`
    fn add_peer(&mut self, peer: PeerAddress, channel: Channel) -> Result<(), TransportError>;

    /// Remove a peer from the peer table
    fn remove_peer(&mut self, peer: &PeerAddress) -> Result<(), TransportError>;

    /// Send a datagram to a registered peer or the broadcast address
    fn send(&mut self, dest: &PeerAddress, bytes: &[u8]) -> Result<(), TransportError>;

    /// Install the receive callback, replacing any previous one
    fn on_receive(&mut self, callback: ReceiveCallback);

    /// Install the send-complete callback, replacing any previous one
    fn on_send_complete(&mut self, callback: SendCompleteCallback);

    /// Own hardware address
    fn local_address(&self) -> PeerAddress;
}
