//! Status words and ISO 7816-4 command layouts
//!
//! This module knows the handful of byte layouts the terminal has to build or
//! inspect on its own: the trailing status word of every card response, the
//! SELECT-by-name command, and the two chaining replies a card may give
//! (`61XX` "more data available" and `6CXX` "wrong Le").

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{FileControlInformation, FileOccurrence};

/// Standard ISO 7816-4 byte values
pub mod iso7816 {
    /// Interindustry class byte
    pub const CLA: u8 = 0x00;
    /// SELECT instruction
    pub const INS_SELECT: u8 = 0xA4;
    /// GET RESPONSE instruction
    pub const INS_GET_RESPONSE: u8 = 0xC0;
    /// SELECT P1: select by DF name (AID)
    pub const P1_SELECT_BY_NAME: u8 = 0x04;
    /// SW1 announcing more response bytes
    pub const SW1_MORE_DATA: u8 = 0x61;
    /// SW1 announcing a wrong Le field
    pub const SW1_WRONG_LENGTH: u8 = 0x6C;
}

/// A 2-byte card status word (SW1 SW2)
///
/// On the wire a status word is a 4 digit hex string (`"9000"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatusWord(u16);

impl StatusWord {
    /// Normal processing
    pub const SUCCESS: StatusWord = StatusWord(0x9000);

    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    pub const fn from_u16(value: u16) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn sw1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub const fn sw2(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Extract the status word from the last two bytes of a response
    ///
    /// Returns `None` for responses shorter than two bytes.
    pub fn from_response(response: &[u8]) -> Option<Self> {
        match response {
            [.., sw1, sw2] => Some(Self::new(*sw1, *sw2)),
            _ => None,
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl FromStr for StatusWord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 4 {
            return Err(format!("Invalid status word '{}': expected 4 hex digits", s));
        }
        u16::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| format!("Invalid status word '{}': {}", s, e))
    }
}

impl Serialize for StatusWord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StatusWord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FileOccurrence {
    /// P2 bits b1-b2 of a SELECT command
    pub const fn p2_bits(self) -> u8 {
        match self {
            FileOccurrence::First => 0x00,
            FileOccurrence::Last => 0x01,
            FileOccurrence::Next => 0x02,
            FileOccurrence::Previous => 0x03,
        }
    }
}

impl FileControlInformation {
    /// P2 bits b3-b4 of a SELECT command
    pub const fn p2_bits(self) -> u8 {
        match self {
            FileControlInformation::Fci => 0x00,
            FileControlInformation::Fcp => 0x04,
            FileControlInformation::Fmd => 0x08,
            FileControlInformation::NoResponse => 0x0C,
        }
    }
}

/// Build a SELECT-by-name command for an application identifier
///
/// Layout: `00 A4 04 P2 Lc AID 00`. An AID is 5 to 16 bytes, so Lc is a
/// short (single byte) length.
pub fn select_by_name(
    aid: &[u8],
    occurrence: FileOccurrence,
    control: FileControlInformation,
) -> Vec<u8> {
    let mut command = Vec::with_capacity(6 + aid.len());
    command.extend_from_slice(&[
        iso7816::CLA,
        iso7816::INS_SELECT,
        iso7816::P1_SELECT_BY_NAME,
        occurrence.p2_bits() | control.p2_bits(),
        aid.len() as u8,
    ]);
    command.extend_from_slice(aid);
    command.push(0x00);
    command
}

/// GET RESPONSE command fetching `length` pending bytes
pub fn get_response(length: u8) -> Vec<u8> {
    vec![
        iso7816::CLA,
        iso7816::INS_GET_RESPONSE,
        0x00,
        0x00,
        length,
    ]
}

/// Copy of `command` with its trailing Le byte replaced by `le`
///
/// A 4 byte (case 1) command has no Le byte; one is appended.
pub fn with_le(command: &[u8], le: u8) -> Vec<u8> {
    let mut corrected = command.to_vec();
    if corrected.len() > 4 {
        corrected.pop();
    }
    corrected.push(le);
    corrected
}

/// What the card asked the terminal to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// `61XX`: issue GET RESPONSE for `XX` bytes
    GetResponse(u8),
    /// `6CXX`: resend the command with Le set to `XX`
    CorrectLe(u8),
    /// The response is final
    Done,
}

impl Continuation {
    pub fn for_status(sw: StatusWord) -> Self {
        match sw.sw1() {
            iso7816::SW1_MORE_DATA => Continuation::GetResponse(sw.sw2()),
            iso7816::SW1_WRONG_LENGTH => Continuation::CorrectLe(sw.sw2()),
            _ => Continuation::Done,
        }
    }
}
