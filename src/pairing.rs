//! Pairing state machine
//!
//! Both peers start `Unpaired`, register the broadcast address as their only
//! peer (`Discovering`), and wait. The receiver pairs on the first valid
//! Discovery it hears; the controller re-broadcasts Discovery
//! (`AwaitingPeerAck`) until a valid Response arrives from a real address.
//! Pairing then swaps the broadcast peer for a dedicated unicast peer on the
//! same channel. Transitions only go forward; a reboot starts over.

use std::fmt;

use tracing::{debug, info, warn};

use crate::ack_manager::AckManager;
use crate::contracts::{Channel, DiscoveryPacket, PacketKind, PeerAddress};
use crate::errors::{TransportError, ValidationError};
use crate::mailbox::Datagram;
use crate::transport::RadioTransport;
use crate::BROADCAST_ADDRESS;

/// Connection progress of one peer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Boot state, transport not yet bound
    Unpaired,
    /// Broadcast peer registered, listening for a partner
    Discovering,
    /// Controller only: Discovery broadcast, waiting for the acknowledgment
    AwaitingPeerAck,
    /// Unicast peer registered; terminal for the session
    Paired,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unpaired => "unpaired",
            Self::Discovering => "discovering",
            Self::AwaitingPeerAck => "awaiting-peer-ack",
            Self::Paired => "paired",
        };
        f.write_str(name)
    }
}

/// Which side of the link this peer plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Issues commands
    Controller,
    /// Executes commands against the actuators
    Receiver,
}

impl Role {
    /// Packet shape that completes pairing for this role
    pub fn pairing_kind(self) -> PacketKind {
        match self {
            Self::Controller => PacketKind::Response,
            Self::Receiver => PacketKind::Discovery,
        }
    }
}

/// Result of feeding one datagram to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStep {
    /// Zero-length datagram; nothing to report
    Idle,
    /// Pairing completed with this peer
    Paired(PeerAddress),
    /// Datagram failed validation and was discarded
    Rejected(ValidationError),
    /// Datagram not relevant in the current state
    Ignored,
}

/// Pairing state for one peer
#[derive(Debug, Clone)]
pub struct Pairing {
    role: Role,
    channel: Channel,
    state: ConnectionState,
    peer: Option<PeerAddress>,
}

impl Pairing {
    pub fn new(role: Role, channel: Channel) -> Self {
        Self {
            role,
            channel,
            state: ConnectionState::Unpaired,
            peer: None,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_paired(&self) -> bool {
        self.state == ConnectionState::Paired
    }

    /// Paired peer; `None` until pairing completes
    pub fn peer_address(&self) -> Option<PeerAddress> {
        self.peer
    }

    /// Bind the transport to the channel with the broadcast address as peer
    pub fn begin<T: RadioTransport>(&mut self, transport: &mut T) -> Result<(), TransportError> {
        if self.state != ConnectionState::Unpaired {
            return Ok(());
        }
        transport.initialize(self.channel, BROADCAST_ADDRESS)?;
        self.state = ConnectionState::Discovering;
        info!(role = ?self.role, channel = %self.channel, "discovery started");
        Ok(())
    }

    /// Broadcast one Discovery packet (controller side)
    ///
    /// No-op once paired.
    pub fn broadcast_discovery<T: RadioTransport>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        match self.state {
            ConnectionState::Unpaired => Err(TransportError::NotInitialized),
            ConnectionState::Paired => Ok(()),
            ConnectionState::Discovering | ConnectionState::AwaitingPeerAck => {
                transport.send(&BROADCAST_ADDRESS, &DiscoveryPacket::new().encode())?;
                debug!(channel = %self.channel, "discovery broadcast");
                self.state = ConnectionState::AwaitingPeerAck;
                Ok(())
            }
        }
    }

    /// Interpret one inbound datagram while not yet paired
    pub fn process<T: RadioTransport>(
        &mut self,
        transport: &mut T,
        datagram: &Datagram,
    ) -> PairingStep {
        if self.state == ConnectionState::Paired || self.state == ConnectionState::Unpaired {
            return PairingStep::Ignored;
        }
        if datagram.is_empty() {
            return PairingStep::Idle;
        }
        let sender = datagram.sender();
        if self.role == Role::Controller && sender.is_broadcast() {
            return PairingStep::Ignored;
        }

        if let Err(reason) = datagram.check(self.role.pairing_kind()) {
            debug!(%sender, %reason, "pairing datagram rejected");
            return PairingStep::Rejected(reason);
        }

        self.state = ConnectionState::Paired;
        if self.role == Role::Receiver {
            // The controller keeps discovering until it hears this. A failed
            // send is logged by AckManager and the next Discovery is answered.
            let _ = AckManager::send_ok(transport, &BROADCAST_ADDRESS);
        }
        self.peer = Some(sender);
        self.promote(transport, sender);

        info!(role = ?self.role, peer = %sender, channel = %self.channel, "paired");
        PairingStep::Paired(sender)
    }

    /// Swap the broadcast peer for a dedicated unicast peer
    fn promote<T: RadioTransport>(&self, transport: &mut T, peer: PeerAddress) {
        if let Err(err) = transport.remove_peer(&BROADCAST_ADDRESS) {
            warn!(error = %err, "failed to remove broadcast peer");
        }
        if let Err(err) = transport.initialize(self.channel, peer) {
            warn!(%peer, error = %err, "failed to register unicast peer");
        }
    }
}
