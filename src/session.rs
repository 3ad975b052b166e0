//! Command session - validate before apply
//!
//! Once paired, each inbound datagram is checked as a Command. A valid one is
//! forwarded to the actuators; an invalid one leaves them exactly as they
//! were. Either way the caller owes the peer one Response.

use tracing::{debug, warn};

use crate::actuator::Actuator;
use crate::contracts::{clamp_speed, CommandPacket, PacketKind, PeerAddress, ResponseStatus};
use crate::errors::ValidationError;
use crate::mailbox::Datagram;

/// What one control-loop drain did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Pairing completed with this peer
    Paired(PeerAddress),
    /// Command validated and applied; Response{Ok} owed
    Applied(CommandPacket),
    /// Command rejected after pairing; Response{Error} owed
    Rejected(ValidationError),
    /// Datagram discarded without a reply
    Discarded(ValidationError),
    /// Controller received a Response from its peer
    Acknowledged(ResponseStatus),
    /// Nothing to act on (empty or out-of-context datagram)
    Ignored,
}

impl Outcome {
    /// Status the receiver reports for this outcome, if any
    pub fn response_status(&self) -> Option<ResponseStatus> {
        match self {
            Self::Applied(_) => Some(ResponseStatus::Ok),
            Self::Rejected(_) => Some(ResponseStatus::Error),
            _ => None,
        }
    }
}

/// Applies validated commands to an actuator
#[derive(Debug)]
pub struct CommandSession<A> {
    actuator: A,
    applied: u64,
    rejected: u64,
}

impl<A: Actuator> CommandSession<A> {
    pub fn new(actuator: A) -> Self {
        Self {
            actuator,
            applied: 0,
            rejected: 0,
        }
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }

    /// Commands applied so far
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Commands rejected so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Validate `datagram` as a Command and apply it on success
    ///
    /// Returns `Applied` or `Rejected`; a rejected datagram never reaches the
    /// actuator.
    pub fn apply(&mut self, datagram: &Datagram) -> Outcome {
        let decoded = datagram
            .check(PacketKind::Command)
            .and_then(|()| CommandPacket::decode(datagram.bytes()));

        match decoded {
            Ok(command) => {
                self.actuator
                    .set_all_motor_speeds(command.speeds().map(clamp_speed));
                self.actuator
                    .set_lights(command.light_color(0), command.light_color(1));
                self.actuator.set_digital_output(command.button());
                self.applied += 1;
                debug!(
                    speeds = ?command.speeds(),
                    left = %command.light_color(0),
                    right = %command.light_color(1),
                    button = command.button(),
                    "command applied"
                );
                Outcome::Applied(command)
            }
            Err(reason) => {
                self.rejected += 1;
                warn!(sender = %datagram.sender(), %reason, "command rejected");
                Outcome::Rejected(reason)
            }
        }
    }
}
