//! CEC frames and the hex text form used to type them.
//!
//! A frame is written as pairs of hex digits, optionally split by `:`, `-`, `_` or ` `:
//! byte 0 is `initiator << 4 | destination`, byte 1 the opcode and the rest parameters.
//! ```
//! # use cec_control::{CecFrame, LogicalAddress};
//! let frame: CecFrame = "4f:82:10:00".parse().unwrap();
//! assert_eq!(frame.initiator(), LogicalAddress::PLAYBACK);
//! assert!(frame.destination().is_broadcast());
//! assert_eq!(frame.opcode(), Some(0x82));
//! assert_eq!(frame.parameters(), &[0x10, 0x00]);
//! assert_eq!(frame.to_string(), "4f:82:10:00");
//! ```

use crate::{CecError, LogicalAddress, Result};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::{fmt, str::FromStr};

/// Header and opcode plus this many parameter bytes make the 16 byte maximum of a CEC message.
pub const MAX_PARAMETERS: usize = 14;

/// A structured CEC message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CecFrame {
    initiator: LogicalAddress,
    destination: LogicalAddress,
    /// `None` for a polling message, which is not the same as opcode `0x00`
    opcode: Option<u8>,
    params: [u8; MAX_PARAMETERS],
    len: u8,
}

impl CecFrame {
    /// Fails with [CecError::FrameTooLong] for more than [MAX_PARAMETERS] bytes,
    /// or with [CecError::MalformedFrame] for parameters without an opcode.
    pub fn new(
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Option<u8>,
        parameters: &[u8],
    ) -> Result<Self> {
        if parameters.len() > MAX_PARAMETERS {
            return Err(CecError::FrameTooLong(parameters.len()));
        }
        if opcode.is_none() && !parameters.is_empty() {
            return Err(CecError::MalformedFrame(format!(
                "{} parameter bytes without opcode",
                parameters.len()
            )));
        }
        let mut params = [0; MAX_PARAMETERS];
        params[..parameters.len()].copy_from_slice(parameters);
        Ok(Self {
            initiator,
            destination,
            opcode,
            params,
            len: parameters.len() as u8,
        })
    }
    /// A header only frame, used to check if `destination` is present.
    pub fn poll(initiator: LogicalAddress, destination: LogicalAddress) -> Self {
        Self {
            initiator,
            destination,
            ..Default::default()
        }
    }
    #[inline]
    pub fn initiator(&self) -> LogicalAddress {
        self.initiator
    }
    #[inline]
    pub fn destination(&self) -> LogicalAddress {
        self.destination
    }
    #[inline]
    pub fn opcode(&self) -> Option<u8> {
        self.opcode
    }
    #[inline]
    pub fn parameters(&self) -> &[u8] {
        &self.params[..self.len as usize]
    }
    /// true if this frame carries no opcode
    #[inline]
    pub fn is_poll(&self) -> bool {
        self.opcode.is_none()
    }
    /// The frame as it goes on the wire
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(2 + self.len as usize);
        bytes.push(u8::from(self.initiator) << 4 | u8::from(self.destination));
        if let Some(opcode) = self.opcode {
            bytes.push(opcode);
            bytes.extend_from_slice(self.parameters());
        }
        bytes
    }
    /// Inverse of [CecFrame::to_bytes]. Empty input gives the default frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [] => Ok(Self::default()),
            [header] => Ok(Self::poll(
                LogicalAddress::from_nibble(header >> 4),
                LogicalAddress::from_nibble(*header),
            )),
            [header, opcode, params @ ..] => Self::new(
                LogicalAddress::from_nibble(header >> 4),
                LogicalAddress::from_nibble(*header),
                Some(*opcode),
                params,
            ),
        }
    }
}

impl FromStr for CecFrame {
    type Err = CecError;
    fn from_str(s: &str) -> Result<Self> {
        encode(s)
    }
}

impl fmt::Display for CecFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.to_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Parse the hex text form of a frame.
///
/// An empty string is not an error: it gives a zeroed frame
/// (TV to TV, no opcode).
pub fn encode(hex: &str) -> Result<CecFrame> {
    let digits: Vec<u8> = hex
        .bytes()
        .filter(|c| !matches!(c, b':' | b'-' | b'_' | b' '))
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CecError::MalformedFrame(hex.to_string()));
    }
    let bytes = digits
        .chunks_exact(2)
        .map(|pair| Some(hex_value(pair[0])? << 4 | hex_value(pair[1])?))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| CecError::MalformedFrame(hex.to_string()))?;
    if bytes.len() > 2 + MAX_PARAMETERS {
        return Err(CecError::FrameTooLong(bytes.len() - 2));
    }
    CecFrame::from_bytes(&bytes)
}

fn hex_value(c: u8) -> Option<u8> {
    (c as char).to_digit(16).map(|d| d as u8)
}

/// Power Status Operand of `Report Power Status`
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum PowerStatus {
    On = 0,
    Standby = 1,
    InTransitionStandbyToOn = 2,
    InTransitionOnToStandby = 3,
}

impl PowerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerStatus::On => "on",
            PowerStatus::Standby => "standby",
            PowerStatus::InTransitionStandbyToOn => "starting",
            PowerStatus::InTransitionOnToStandby => "shutting down",
        }
    }
}

/// CEC Version Operand
#[derive(Debug, Eq, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy)]
#[repr(u8)]
pub enum CecVersion {
    V1_2 = 1,
    V1_2A = 2,
    V1_3 = 3,
    V1_3A = 4,
    V1_4 = 5,
    V2_0 = 6,
}

impl CecVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            CecVersion::V1_2 => "1.2",
            CecVersion::V1_2A => "1.2a",
            CecVersion::V1_3 => "1.3",
            CecVersion::V1_3A => "1.3a",
            CecVersion::V1_4 => "1.4",
            CecVersion::V2_0 => "2.0",
        }
    }
}

/// `"on"`, `"standby"`, `"starting"`, `"shutting down"` or `""` for anything unknown.
pub fn decode_power_status(code: u8) -> &'static str {
    PowerStatus::try_from(code)
        .map(PowerStatus::as_str)
        .unwrap_or_default()
}

/// `"1.2"` ... `"2.0"`, `""` for anything unknown.
pub fn decode_cec_version(code: u8) -> &'static str {
    CecVersion::try_from(code)
        .map(CecVersion::as_str)
        .unwrap_or_default()
}

/// e.g. 0x3300 -> `"3.3.0.0"`
pub fn decode_physical_address(raw: u16) -> String {
    format!(
        "{:x}.{:x}.{:x}.{:x}",
        (raw >> 12) & 0xf,
        (raw >> 8) & 0xf,
        (raw >> 4) & 0xf,
        raw & 0xf
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_image_view_on() {
        let frame = encode("40:04").unwrap();
        assert_eq!(frame.initiator(), LogicalAddress::PLAYBACK);
        assert_eq!(frame.destination(), LogicalAddress::TV);
        assert_eq!(frame.opcode(), Some(0x04));
        assert!(frame.parameters().is_empty());
    }

    #[test]
    fn encode_empty_is_default() {
        let frame = encode("").unwrap();
        assert_eq!(frame, CecFrame::default());
        assert_eq!(frame.initiator().value(), 0);
        assert_eq!(frame.destination().value(), 0);
        assert!(frame.is_poll());
        assert_eq!(encode(" : - ").unwrap(), CecFrame::default());
    }

    #[test]
    fn encode_poll_and_zero_opcode_differ() {
        let poll = encode("05").unwrap();
        assert!(poll.is_poll());
        assert_eq!(poll.destination(), LogicalAddress::AUDIO);

        let abort = encode("05 00").unwrap();
        assert_eq!(abort.opcode(), Some(0x00));
        assert_ne!(poll, abort);
    }

    #[test]
    fn encode_rejects_bad_hex() {
        assert!(matches!(encode("4"), Err(CecError::MalformedFrame(_))));
        assert!(matches!(encode("4:0:4"), Err(CecError::MalformedFrame(_))));
        assert!(matches!(encode("4g"), Err(CecError::MalformedFrame(_))));
        assert!(matches!(encode("40.04"), Err(CecError::MalformedFrame(_))));
    }

    #[test]
    fn encode_length_limit() {
        let full = "4f".to_string() + &"00".repeat(15);
        assert_eq!(encode(&full).unwrap().parameters().len(), MAX_PARAMETERS);

        let too_long = "4f".to_string() + &"00".repeat(16);
        assert!(matches!(encode(&too_long), Err(CecError::FrameTooLong(15))));
    }

    #[test]
    fn frame_text_form() {
        let frame = encode("1F-84-30-00-01").unwrap();
        assert_eq!(frame.parameters(), &[0x30, 0x00, 0x01]);
        assert_eq!(frame.to_string(), "1f:84:30:00:01");
        assert_eq!(frame.to_bytes(), vec![0x1f, 0x84, 0x30, 0x00, 0x01]);
        assert_eq!(CecFrame::poll(LogicalAddress::FREE, LogicalAddress::TV).to_string(), "e0");
    }

    #[test]
    fn new_checks_parameters() {
        let tv = LogicalAddress::TV;
        assert!(matches!(
            CecFrame::new(tv, tv, Some(0x47), &[b'x'; 15]),
            Err(CecError::FrameTooLong(15))
        ));
        assert!(CecFrame::new(tv, tv, None, &[1]).is_err());
    }

    #[test]
    fn power_status_strings() {
        assert_eq!(decode_power_status(0), "on");
        assert_eq!(decode_power_status(1), "standby");
        assert_eq!(decode_power_status(2), "starting");
        assert_eq!(decode_power_status(3), "shutting down");
        assert_eq!(decode_power_status(0x99), "");
        assert_eq!(decode_power_status(4), "");
    }

    #[test]
    fn version_strings() {
        let expected = ["", "1.2", "1.2a", "1.3", "1.3a", "1.4", "2.0", ""];
        for (code, s) in expected.iter().enumerate() {
            assert_eq!(decode_cec_version(code as u8), *s);
        }
    }

    #[test]
    fn physical_address_nibbles() {
        assert_eq!(decode_physical_address(0x0000), "0.0.0.0");
        assert_eq!(decode_physical_address(0x3300), "3.3.0.0");
        assert_eq!(decode_physical_address(0xabcd), "a.b.c.d");
        assert_eq!(decode_physical_address(0xffff), "f.f.f.f");
    }
}
