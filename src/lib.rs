//! BugComm Core - pairing and command protocol for radio-linked peers
//!
//! **Creator**: Shayan Golmezerji
//! **License**: Creative Commons Attribution 4.0 International (CC BY 4.0)
//!
//! A controller and a receiver/actuator unit find each other over a
//! connectionless, broadcast-capable datagram link, promote the discovered
//! address to a dedicated unicast peer, then exchange fixed-format
//! command/response packets.
//!
//! # Design Principles
//! - Fixed-size little-endian wire packets, classified by length only
//! - Validate before apply: a rejected command never moves an actuator
//! - The receive callback only publishes into a single-slot mailbox;
//!   all interpretation happens in the control loop
//! - Channel and peer identity are rediscovered on every boot

pub mod ack_manager;
pub mod actuator;
pub mod codec;
pub mod config;
pub mod contracts;
pub mod errors;
pub mod link;
pub mod mailbox;
pub mod pairing;
pub mod receiver;
pub mod session;
pub mod transmitter;
pub mod transport;

pub use actuator::{Actuator, ActuatorState, SimulatedRover};
pub use config::{LinkBuilder, LinkConfig};
pub use contracts::{
    Channel, CommandPacket, DiscoveryPacket, PacketKind, PeerAddress, ResponsePacket,
    ResponseStatus, Rgb,
};
pub use errors::{BugCommError, Result, TransportError, ValidationError};
pub use link::HaltSwitch;
pub use pairing::{ConnectionState, Role};
pub use receiver::Receiver;
pub use session::Outcome;
pub use transmitter::Controller;

/// Packet signature shared by every packet kind and both peers
pub const SIGNATURE: u32 = 0x4255_4743;

/// Protocol version shared by every packet kind and both peers
pub const VERSION: u8 = 1;

/// Well-known all-ones hardware address used during discovery
pub const BROADCAST_ADDRESS: PeerAddress = PeerAddress::new([0xFF; 6]);

/// Fixed delay between discovery checks
pub const PAIRING_POLL_INTERVAL_MS: u64 = 500;

/// Mailbox slot size: the larger of Command and Response
pub const MAILBOX_CAPACITY: usize = if CommandPacket::SIZE > ResponsePacket::SIZE {
    CommandPacket::SIZE
} else {
    ResponsePacket::SIZE
};

/// Motors on the receiver: 0/1 front, 2/3 rear
pub const NUM_MOTORS: usize = 4;

/// RGB indicators on the receiver (left, right)
pub const NUM_LIGHTS: usize = 2;

/// Saturation bound for motor speed in either direction
pub const MAX_SPEED: i8 = 100;
