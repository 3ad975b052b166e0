//! Receiver module - the obeying peer
//!
//! Waits for a controller's Discovery, pairs, then applies each valid
//! Command to its actuators and answers every Command with one Response.
//! Before pairing, malformed traffic is discarded without a reply.

use tracing::debug;

use crate::ack_manager::AckManager;
use crate::actuator::Actuator;
use crate::config::LinkConfig;
use crate::contracts::PeerAddress;
use crate::errors::{BugCommError, Result};
use crate::link::{HaltSwitch, Link};
use crate::pairing::{ConnectionState, PairingStep, Role};
use crate::session::{CommandSession, Outcome};
use crate::transport::RadioTransport;

/// Receiver peer: link plus command session
pub struct Receiver<T, A> {
    link: Link<T>,
    session: CommandSession<A>,
}

impl<T: RadioTransport, A: Actuator> Receiver<T, A> {
    /// Bind the transport for discovery
    pub fn open(config: LinkConfig, transport: T, actuator: A) -> Result<Self> {
        Ok(Self {
            link: Link::open(Role::Receiver, config, transport)?,
            session: CommandSession::new(actuator),
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

    pub fn session(&self) -> &CommandSession<A> {
        &self.session
    }

    pub fn actuator(&self) -> &A {
        self.session.actuator()
    }

    /// Direct actuator access, e.g. to halt the rover on shutdown
    pub fn actuator_mut(&mut self) -> &mut A {
        self.session.actuator_mut()
    }

    /// Drain the mailbox once; `None` when nothing was waiting
    ///
    /// Before pairing the datagram goes to the pairing state machine; after,
    /// it is treated as a Command and answered with exactly one Response.
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

        let outcome = self.session.apply(&datagram);
        if let (Some(status), Some(peer)) = (outcome.response_status(), self.link.peer_address()) {
            // Logged by AckManager; responses are never retried.
            let _ = AckManager::send_status(self.link.transport_mut(), &peer, status);
        }
        Some(outcome)
    }

    /// One pairing check; returns the peer once paired
    pub fn poll_pairing(&mut self) -> Option<PeerAddress> {
        if !self.link.is_paired() {
            self.handle_inbound();
        }
        self.link.peer_address()
    }

    /// Poll for a controller every `poll_interval` until paired
    ///
    /// Waits indefinitely unless `halt` is triggered.
    pub async fn run_pairing(&mut self, halt: &HaltSwitch) -> Result<PeerAddress> {
        loop {
            if let Some(peer) = self.poll_pairing() {
                return Ok(peer);
            }
            if halt.is_triggered() {
                debug!("receiver pairing halted");
                return Err(BugCommError::Halted);
            }
            tokio::time::sleep(self.link.config().poll_interval()).await;
        }
    }
}
