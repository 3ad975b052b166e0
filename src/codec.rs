//! Packet codec - fixed little-endian wire layout
//!
//! Every packet starts with a 4-byte signature and a 1-byte version. Length
//! is checked before any field is read, so a truncated buffer is never
//! interpreted as a smaller packet kind.
use byteorder::{ByteOrder, LittleEndian};

use crate::contracts::{
    clamp_speed, CommandPacket, DiscoveryPacket, PacketKind, ResponsePacket, ResponseStatus, Rgb,
};
use crate::errors::ValidationError;
use crate::{SIGNATURE, VERSION};

/// Signature (4) + version (1)
pub const HEADER_SIZE: usize = 5;

const SPEEDS_OFFSET: usize = HEADER_SIZE;
const LEFT_COLOR_OFFSET: usize = SPEEDS_OFFSET + crate::NUM_MOTORS;
const RIGHT_COLOR_OFFSET: usize = LEFT_COLOR_OFFSET + 3;
const BUTTON_OFFSET: usize = RIGHT_COLOR_OFFSET + 3;
const STATUS_OFFSET: usize = HEADER_SIZE;

/// Check a received length against the exact size of `kind`
pub fn check_len(len: usize, kind: PacketKind) -> Result<(), ValidationError> {
    if len != kind.size() {
        return Err(ValidationError::SizeMismatch {
            expected: kind.size(),
            actual: len,
        });
    }
    Ok(())
}

/// Check signature then version; `buf` must hold at least a header
pub(crate) fn check_header(buf: &[u8]) -> Result<(), ValidationError> {
    if buf.len() < HEADER_SIZE {
        return Err(ValidationError::SizeMismatch {
            expected: HEADER_SIZE,
            actual: buf.len(),
        });
    }

    let signature = LittleEndian::read_u32(&buf[0..4]);
    if signature != SIGNATURE {
        return Err(ValidationError::SignatureMismatch {
            expected: SIGNATURE,
            actual: signature,
        });
    }

    let version = buf[4];
    if version != VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: VERSION,
            actual: version,
        });
    }

    Ok(())
}

/// Validate `buf` as a packet of `kind`, reporting the first failing check
///
/// Size is checked first, then signature, then version.
pub fn check(buf: &[u8], kind: PacketKind) -> Result<(), ValidationError> {
    check_len(buf.len(), kind)?;
    check_header(buf)
}

/// Boolean form of [`check`]
pub fn validate(buf: &[u8], kind: PacketKind) -> bool {
    check(buf, kind).is_ok()
}

fn write_header(buf: &mut [u8], signature: u32, version: u8) {
    LittleEndian::write_u32(&mut buf[0..4], signature);
    buf[4] = version;
}

impl DiscoveryPacket {
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        write_header(&mut buf, self.signature, self.version);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ValidationError> {
        check(buf, PacketKind::Discovery)?;
        Ok(Self::new())
    }
}

impl ResponsePacket {
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        write_header(&mut buf, self.signature, self.version);
        buf[STATUS_OFFSET] = self.status.to_byte();
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, ValidationError> {
        check(buf, PacketKind::Response)?;
        Ok(Self::new(ResponseStatus::from_byte(buf[STATUS_OFFSET])))
    }
}

impl CommandPacket {
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        write_header(&mut buf, self.signature, self.version);
        for (i, speed) in self.speeds().iter().enumerate() {
            buf[SPEEDS_OFFSET + i] = *speed as u8;
        }
        LittleEndian::write_u24(
            &mut buf[LEFT_COLOR_OFFSET..RIGHT_COLOR_OFFSET],
            self.colors[0].value(),
        );
        LittleEndian::write_u24(
            &mut buf[RIGHT_COLOR_OFFSET..BUTTON_OFFSET],
            self.colors[1].value(),
        );
        buf[BUTTON_OFFSET] = self.button as u8;
        buf
    }

    /// Decode a validated command; speeds are clamped on the way in
    pub fn decode(buf: &[u8]) -> Result<Self, ValidationError> {
        check(buf, PacketKind::Command)?;

        let mut speeds = [0i8; crate::NUM_MOTORS];
        for (i, speed) in speeds.iter_mut().enumerate() {
            *speed = clamp_speed(buf[SPEEDS_OFFSET + i] as i8);
        }
        let left = Rgb::from_u32(LittleEndian::read_u24(
            &buf[LEFT_COLOR_OFFSET..RIGHT_COLOR_OFFSET],
        ));
        let right = Rgb::from_u32(LittleEndian::read_u24(
            &buf[RIGHT_COLOR_OFFSET..BUTTON_OFFSET],
        ));

        Ok(Self::new(speeds, [left, right], buf[BUTTON_OFFSET] != 0))
    }
}
