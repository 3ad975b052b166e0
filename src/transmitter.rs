//! Transmitter module - the controlling peer
//!
//! Re-broadcasts Discovery until a receiver acknowledges, then unicasts
//! Command packets to it and tallies the Responses that come back.
//! Commands are fire-and-forget: a missing Response is never retried, the
//! next command simply supersedes the previous one.

use tracing::{debug, warn};

use crate::ack_manager::ResponseTally;
use crate::config::LinkConfig;
use crate::contracts::{CommandPacket, PacketKind, PeerAddress, ResponsePacket};
use crate::errors::{BugCommError, Result};
use crate::link::{HaltSwitch, Link};
use crate::pairing::{ConnectionState, PairingStep, Role};
use crate::session::Outcome;
use crate::transport::RadioTransport;

/// Controller peer
pub struct Controller<T> {
    link: Link<T>,
    tally: ResponseTally,
    commands_sent: u64,
}

impl<T: RadioTransport> Controller<T> {
    /// Bind the transport for discovery
    pub fn open(config: LinkConfig, transport: T) -> Result<Self> {
        Ok(Self {
            link: Link::open(Role::Controller, config, transport)?,
            tally: ResponseTally::default(),
            commands_sent: 0,
        })
    }

    pub fn link(&self) -> &Link<T> {
        &self.link
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn peer_address(&self) -> Option<PeerAddress> {
        self.link.peer_address()
    }

    /// Responses received since pairing
    pub fn tally(&self) -> &ResponseTally {
        &self.tally
    }

    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Unicast a command to the paired receiver
    ///
    /// # Errors
    /// `NotPaired` before pairing; the transport error if the send fails.
    pub fn send_command(&mut self, command: &CommandPacket) -> Result<()> {
        let peer = self.link.require_peer()?;
        self.link
            .transport_mut()
            .send(&peer, &command.encode())
            .map_err(|err| {
                warn!(%peer, error = %err, "command send failed");
                BugCommError::from(err)
            })?;
        self.commands_sent += 1;
        debug!(%peer, speeds = ?command.speeds(), "command sent");
        Ok(())
    }

    /// Stop the receiver: all motors zero, lights off
    pub fn send_halt(&mut self) -> Result<()> {
        self.send_command(&CommandPacket::halt())
    }

    /// Drain the mailbox once; `None` when nothing was waiting
    pub fn handle_inbound(&mut self) -> Option<Outcome> {
        let datagram = self.link.take_inbound()?;

        if !self.link.is_paired() {
            let outcome = match self.link.pairing_step(&datagram) {
                PairingStep::Paired(peer) => Outcome::Paired(peer),
                PairingStep::Rejected(reason) => Outcome::Discarded(reason),
                PairingStep::Idle | PairingStep::Ignored => Outcome::Ignored,
            };
            return Some(outcome);
        }

        let decoded = datagram
            .check(PacketKind::Response)
            .and_then(|()| ResponsePacket::decode(datagram.bytes()));
        let outcome = match decoded {
            Ok(response) => {
                self.tally.record(response.status);
                Outcome::Acknowledged(response.status)
            }
            Err(reason) => {
                self.tally.record_invalid();
                warn!(sender = %datagram.sender(), %reason, "response rejected");
                Outcome::Discarded(reason)
            }
        };
        Some(outcome)
    }

    /// One pairing round: check for an acknowledgment, otherwise re-broadcast
    /// Discovery. Returns the peer once paired.
    pub fn poll_pairing(&mut self) -> Option<PeerAddress> {
        if !self.link.is_paired() {
            self.handle_inbound();
        }
        if !self.link.is_paired() {
            if let Err(err) = self.link.broadcast_discovery() {
                warn!(error = %err, "discovery broadcast failed");
            }
        }
        self.link.peer_address()
    }

    /// Broadcast Discovery every `poll_interval` until a receiver answers
    ///
    /// Waits indefinitely unless `halt` is triggered.
    pub async fn run_pairing(&mut self, halt: &HaltSwitch) -> Result<PeerAddress> {
        loop {
            if let Some(peer) = self.poll_pairing() {
                return Ok(peer);
            }
            if halt.is_triggered() {
                debug!("controller pairing halted");
                return Err(BugCommError::Halted);
            }
            tokio::time::sleep(self.link.config().poll_interval()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkBuilder;
    use crate::contracts::{DiscoveryPacket, ResponseStatus};
    use crate::transport::{Air, AirTransport};
    use crate::BROADCAST_ADDRESS;

    const CONTROLLER: PeerAddress = PeerAddress::new([0xC0, 0, 0, 0, 0, 1]);
    const RECEIVER: PeerAddress = PeerAddress::new([0xB0, 0, 0, 0, 0, 2]);

    fn open(air: &Air) -> Controller<AirTransport> {
        let config = LinkBuilder::new()
            .with_channel(5)
            .with_poll_interval_ms(1)
            .build()
            .unwrap();
        Controller::open(config, air.attach(CONTROLLER)).unwrap()
    }

    #[test]
    fn test_send_command_requires_pairing() {
        let air = Air::new();
        let mut controller = open(&air);
        assert_eq!(
            controller.send_command(&CommandPacket::halt()),
            Err(BugCommError::NotPaired)
        );
        assert_eq!(controller.commands_sent(), 0);
    }

    #[test]
    fn test_poll_broadcasts_discovery_until_ack() {
        let air = Air::new();
        let mut controller = open(&air);
        let channel = controller.link().config().channel();

        assert_eq!(controller.poll_pairing(), None);
        assert_eq!(controller.poll_pairing(), None);
        assert_eq!(controller.state(), ConnectionState::AwaitingPeerAck);

        let sent = air.frames_from(&CONTROLLER);
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|frame| frame.to == BROADCAST_ADDRESS
            && frame.bytes == DiscoveryPacket::new().encode()));

        air.inject(RECEIVER, BROADCAST_ADDRESS, channel, &ResponsePacket::ok().encode());
        assert_eq!(controller.poll_pairing(), Some(RECEIVER));
        assert_eq!(air.frames_from(&CONTROLLER).len(), 2);
    }

    #[test]
    fn test_responses_tallied() {
        let air = Air::new();
        let mut controller = open(&air);
        let channel = controller.link().config().channel();
        controller.poll_pairing();
        air.inject(RECEIVER, BROADCAST_ADDRESS, channel, &ResponsePacket::ok().encode());
        controller.poll_pairing();

        controller.send_halt().unwrap();
        let last = air.frames_from(&CONTROLLER).pop().unwrap();
        assert_eq!(last.to, RECEIVER);
        assert_eq!(CommandPacket::decode(&last.bytes), Ok(CommandPacket::halt()));

        air.inject(RECEIVER, CONTROLLER, channel, &ResponsePacket::ok().encode());
        assert_eq!(controller.handle_inbound(), Some(Outcome::Acknowledged(ResponseStatus::Ok)));
        air.inject(RECEIVER, CONTROLLER, channel, &ResponsePacket::error().encode());
        assert_eq!(
            controller.handle_inbound(),
            Some(Outcome::Acknowledged(ResponseStatus::Error))
        );
        air.inject(RECEIVER, CONTROLLER, channel, &[1, 2, 3]);
        assert!(matches!(controller.handle_inbound(), Some(Outcome::Discarded(_))));

        let tally = controller.tally();
        assert_eq!((tally.ok, tally.error, tally.invalid), (1, 1, 1));
        assert_eq!(controller.commands_sent(), 1);
    }

    #[tokio::test]
    async fn test_run_pairing_halts() {
        let air = Air::new();
        let mut controller = open(&air);
        let halt = HaltSwitch::new();
        halt.trigger();
        assert_eq!(controller.run_pairing(&halt).await, Err(BugCommError::Halted));
        assert_eq!(air.frames_from(&CONTROLLER).len(), 1);
    }
}
