//! Link - the per-peer session object
//!
//! Owns everything one peer mutates: the transport, the inbound mailbox and
//! the pairing state. The receive callback only ever touches the mailbox;
//! the control loop owning the `Link` is the only place state changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::ack_manager::DeliveryStats;
use crate::config::LinkConfig;
use crate::contracts::PeerAddress;
use crate::errors::{BugCommError, Result, TransportError};
use crate::mailbox::{Datagram, Mailbox};
use crate::pairing::{ConnectionState, Pairing, PairingStep, Role};
use crate::transport::RadioTransport;

/// Shared flag that aborts a pairing wait
///
/// Models the operator's halt input; clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct HaltSwitch(Arc<AtomicBool>);

impl HaltSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Transport, mailbox and pairing state of one peer
pub struct Link<T> {
    config: LinkConfig,
    transport: T,
    mailbox: Mailbox,
    pairing: Pairing,
    delivery: DeliveryStats,
}

impl<T: RadioTransport> Link<T> {
    /// Install callbacks and bind the transport for discovery
    ///
    /// # Errors
    /// Returns the transport error if the broadcast peer cannot be registered.
    pub fn open(role: Role, config: LinkConfig, mut transport: T) -> Result<Self> {
        let mailbox = Mailbox::new();
        let delivery = DeliveryStats::new();
        transport.on_receive(mailbox.receive_callback());
        transport.on_send_complete(delivery.send_complete_callback());

        let mut pairing = Pairing::new(role, config.channel());
        pairing.begin(&mut transport)?;
        info!(
            ?role,
            address = %transport.local_address(),
            channel = %config.channel(),
            "link open"
        );

        Ok(Self {
            config,
            transport,
            mailbox,
            pairing,
            delivery,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.pairing.role()
    }

    pub fn state(&self) -> ConnectionState {
        self.pairing.state()
    }

    pub fn is_paired(&self) -> bool {
        self.pairing.is_paired()
    }

    pub fn peer_address(&self) -> Option<PeerAddress> {
        self.pairing.peer_address()
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn delivery(&self) -> &DeliveryStats {
        &self.delivery
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drain the mailbox
    pub fn take_inbound(&self) -> Option<Datagram> {
        self.mailbox.take()
    }

    pub(crate) fn pairing_step(&mut self, datagram: &Datagram) -> PairingStep {
        self.pairing.process(&mut self.transport, datagram)
    }

    pub(crate) fn broadcast_discovery(&mut self) -> std::result::Result<(), TransportError> {
        self.pairing.broadcast_discovery(&mut self.transport)
    }

    /// Paired peer, or `NotPaired`
    pub fn require_peer(&self) -> Result<PeerAddress> {
        self.peer_address().ok_or(BugCommError::NotPaired)
    }
}
