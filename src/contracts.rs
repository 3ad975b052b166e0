//! Core data structures for the BugComm protocol
//!
//! Three packet shapes travel over the link. They share a signature and
//! version header and carry no kind tag: a receiver tells them apart purely by
//! byte length, interpreted according to its current connection state.
use std::fmt;

use crate::errors::{BugCommError, Result};
use crate::{MAX_SPEED, NUM_LIGHTS, NUM_MOTORS, SIGNATURE, VERSION};

/// Physical radio channel, 1 through 14
///
/// Chosen once per session by the operator and shared by both peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 14;

    /// Create a channel, rejecting values outside 1..=14
    pub fn new(channel: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&channel) {
            return Err(BugCommError::InvalidChannel(channel));
        }
        Ok(Self(channel))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Channel {
    fn default() -> Self {
        Self(Self::MIN)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 6-byte hardware address of a radio station
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PeerAddress([u8; 6]);

impl PeerAddress {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == crate::BROADCAST_ADDRESS
    }
}

impl From<[u8; 6]> for PeerAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// 24-bit RGB color; the top byte of the backing `u32` is always zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgb(u32);

impl Rgb {
    pub const OFF: Rgb = Rgb(0);

    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self(((red as u32) << 16) | ((green as u32) << 8) | blue as u32)
    }

    /// Build from a packed `0x00RRGGBB` value, discarding the unused top byte
    pub const fn from_u32(value: u32) -> Self {
        Self(value & 0x00FF_FFFF)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn blue(self) -> u8 {
        self.0 as u8
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06X}", self.0)
    }
}

/// Saturating clamp of a motor speed to [-100, 100]
pub fn clamp_speed(speed: i8) -> i8 {
    speed.clamp(-MAX_SPEED, MAX_SPEED)
}

/// Packet shapes known to the codec, identified by exact wire length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Discovery,
    Command,
    Response,
}

impl PacketKind {
    /// Exact wire size of this packet kind
    pub const fn size(self) -> usize {
        match self {
            Self::Discovery => DiscoveryPacket::SIZE,
            Self::Command => CommandPacket::SIZE,
            Self::Response => ResponsePacket::SIZE,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Discovery => "discovery",
            Self::Command => "command",
            Self::Response => "response",
        };
        f.write_str(name)
    }
}

/// Discovery - mutual liveness/identity confirmation before pairing
///
/// Carries nothing beyond the common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryPacket {
    pub signature: u32,
    pub version: u8,
}

impl DiscoveryPacket {
    /// Wire size: signature (4) + version (1)
    pub const SIZE: usize = 5;

    pub const fn new() -> Self {
        Self {
            signature: SIGNATURE,
            version: VERSION,
        }
    }
}

impl Default for DiscoveryPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome reported back for each command or discovery acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    Ok,
    Error,
}

impl ResponseStatus {
    /// Zero is Ok; any other value is Error
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 0 {
            Self::Ok
        } else {
            Self::Error
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::Error => 1,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Response - one per received command, also used as the pairing acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePacket {
    pub signature: u32,
    pub version: u8,
    pub status: ResponseStatus,
}

impl ResponsePacket {
    /// Wire size: header (5) + status (1)
    pub const SIZE: usize = 6;

    pub const fn new(status: ResponseStatus) -> Self {
        Self {
            signature: SIGNATURE,
            version: VERSION,
            status,
        }
    }

    pub const fn ok() -> Self {
        Self::new(ResponseStatus::Ok)
    }

    pub const fn error() -> Self {
        Self::new(ResponseStatus::Error)
    }
}

/// Command - motor speeds, indicator colors and a button flag
///
/// # Memory Layout (wire)
/// Total size: 16 bytes
/// - signature: 4 bytes (u32 LE)
/// - version: 1 byte
/// - speeds: 4 bytes (i8 each, pre-clamped to [-100, 100])
/// - colors: 6 bytes (two 24-bit LE values)
/// - button: 1 byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandPacket {
    pub signature: u32,
    pub version: u8,
    speeds: [i8; NUM_MOTORS],
    pub colors: [Rgb; NUM_LIGHTS],
    pub button: bool,
}

impl CommandPacket {
    /// Wire size: header (5) + speeds (4) + colors (6) + button (1)
    pub const SIZE: usize = 16;

    /// Create a command; speeds are clamped to [-100, 100]
    pub fn new(speeds: [i8; NUM_MOTORS], colors: [Rgb; NUM_LIGHTS], button: bool) -> Self {
        Self {
            signature: SIGNATURE,
            version: VERSION,
            speeds: speeds.map(clamp_speed),
            colors,
            button,
        }
    }

    /// All motors stopped, lights off, button released
    pub fn halt() -> Self {
        Self::new([0; NUM_MOTORS], [Rgb::OFF; NUM_LIGHTS], false)
    }

    pub fn speeds(&self) -> [i8; NUM_MOTORS] {
        self.speeds
    }

    /// Speed for motor `pos`; 0 for positions that do not exist
    pub fn motor_speed(&self, pos: usize) -> i8 {
        self.speeds.get(pos).copied().unwrap_or(0)
    }

    /// Set one motor speed, clamping it; out-of-range positions are ignored
    pub fn set_motor_speed(&mut self, pos: usize, speed: i8) {
        if let Some(slot) = self.speeds.get_mut(pos) {
            *slot = clamp_speed(speed);
        }
    }

    /// Color for light `pos`; off for positions that do not exist
    pub fn light_color(&self, pos: usize) -> Rgb {
        self.colors.get(pos).copied().unwrap_or(Rgb::OFF)
    }

    pub fn button(&self) -> bool {
        self.button
    }
}
