//! Static lookup tables: logical address roles, vendor IDs and remote control keys.
//!
//! Names are compared after [normalizing](normalize) them, so `"Volume Up"`,
//! `"volume-up"` and `"VOLUMEUP"` all name the same key.

use crate::{CecError, Result};
use std::{fmt, str::FromStr};

/// Number of logical address slots on a CEC bus.
pub const LOGICAL_ADDRESS_COUNT: usize = 16;

const LOGICAL_NAMES: [&str; LOGICAL_ADDRESS_COUNT] = [
    "TV",
    "Recording",
    "Recording2",
    "Tuner",
    "Playback",
    "Audio",
    "Tuner2",
    "Tuner3",
    "Playback2",
    "Recording3",
    "Tuner4",
    "Playback3",
    "Reserved",
    "Reserved2",
    "Free",
    "Broadcast",
];

/// A 4 bit, role based device address on the bus.
///
/// ```
/// # use cec_control::LogicalAddress;
/// let audio: LogicalAddress = "audio".parse().unwrap();
/// assert_eq!(audio, LogicalAddress::AUDIO);
/// assert_eq!(audio.to_string(), "Audio");
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalAddress(u8);

impl LogicalAddress {
    pub const TV: Self = Self(0);
    pub const RECORDING: Self = Self(1);
    pub const PLAYBACK: Self = Self(4);
    pub const AUDIO: Self = Self(5);
    pub const FREE: Self = Self(14);
    /// Broadcast as destination, unregistered as initiator.
    pub const BROADCAST: Self = Self(15);

    /// Fails with [CecError::OutOfRange] for anything above 15.
    pub fn new(addr: u8) -> Result<Self> {
        if (addr as usize) < LOGICAL_ADDRESS_COUNT {
            Ok(Self(addr))
        } else {
            Err(CecError::OutOfRange(addr.into()))
        }
    }
    /// Build from the low nibble, ignoring the high one.
    #[inline]
    pub(crate) fn from_nibble(bits: u8) -> Self {
        Self(bits & 0x0f)
    }
    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
    /// The role name, e.g. `"Playback2"`
    #[inline]
    pub fn name(self) -> &'static str {
        LOGICAL_NAMES[self.0 as usize]
    }
    #[inline]
    pub fn is_broadcast(self) -> bool {
        self.0 == 15
    }
    /// all 16 slots in ascending order
    pub fn all() -> impl Iterator<Item = LogicalAddress> {
        (0..LOGICAL_ADDRESS_COUNT as u8).map(Self)
    }
}

impl TryFrom<u8> for LogicalAddress {
    type Error = CecError;
    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalAddress> for u8 {
    fn from(value: LogicalAddress) -> Self {
        value.0
    }
}

impl fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts a role name (see [address_for_name]), a decimal number or a `0x` hex number.
impl FromStr for LogicalAddress {
    type Err = CecError;
    fn from_str(s: &str) -> Result<Self> {
        if let Some(addr) = address_for_name(s) {
            return Ok(addr);
        }
        let num = match s.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse::<u32>(),
        }
        .map_err(|_| CecError::UnknownAddress(s.to_string()))?;
        u8::try_from(num)
            .map_err(|_| CecError::OutOfRange(num))
            .and_then(Self::new)
    }
}

/// Drop the separators `:`, `-`, `_` and ` ` and lowercase the rest.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ':' | '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Role name of a logical address. Fails with [CecError::OutOfRange] above 15.
pub fn name_for_address(addr: u8) -> Result<&'static str> {
    LogicalAddress::new(addr).map(LogicalAddress::name)
}

/// Resolve a role name to its logical address.
///
/// A trailing `1` is dropped first so that `"Tuner1"` means `"Tuner"`.
/// `"unregistered"` always resolves to address 15.
/// `None` means "no such name" and is never a stand-in for address 15.
pub fn address_for_name(name: &str) -> Option<LogicalAddress> {
    let mut name = normalize(name);
    if name.ends_with('1') {
        name.pop();
    }
    if name.is_empty() {
        return None;
    }
    LOGICAL_NAMES
        .iter()
        .position(|n| n.eq_ignore_ascii_case(&name))
        .map(|i| LogicalAddress(i as u8))
        .or_else(|| (name == "unregistered").then_some(LogicalAddress::BROADCAST))
}

// sorted by id for binary search
const VENDORS: &[(u32, &str)] = &[
    (0x000039, "Toshiba"),
    (0x0000F0, "Samsung"),
    (0x0005CD, "Denon"),
    (0x000678, "Marantz"),
    (0x000982, "Loewe"),
    (0x0009B0, "Onkyo"),
    (0x000CB8, "Medion"),
    (0x000CE7, "Toshiba"),
    (0x001582, "Pulse Eight"),
    (0x0020C7, "Akai"),
    (0x002467, "Aoc"),
    (0x008045, "Panasonic"),
    (0x00903E, "Philips"),
    (0x009053, "Daewoo"),
    (0x00A0DE, "Yamaha"),
    (0x00D0D5, "Grundig"),
    (0x00E036, "Pioneer"),
    (0x00E091, "LG"),
    (0x08001F, "Sharp"),
    (0x080046, "Sony"),
    (0x18C086, "Broadcom"),
    (0x6B746D, "Vizio"),
    (0x8065E9, "Benq"),
    (0x9C645E, "Harman Kardon"),
];

/// Display name of a 24 bit vendor ID, `""` if unknown.
pub fn vendor_name(id: u32) -> &'static str {
    VENDORS
        .binary_search_by_key(&id, |(v, _)| *v)
        .map(|i| VENDORS[i].1)
        .unwrap_or_default()
}

// sorted by code; a name listed twice resolves to its lowest code
const KEYS: &[(u8, &str)] = &[
    (0x00, "Select"),
    (0x01, "Up"),
    (0x02, "Down"),
    (0x03, "Left"),
    (0x04, "Right"),
    (0x05, "RightUp"),
    (0x06, "RightDown"),
    (0x07, "LeftUp"),
    (0x08, "LeftDown"),
    (0x09, "RootMenu"),
    (0x0A, "SetupMenu"),
    (0x0B, "ContentsMenu"),
    (0x0C, "FavoriteMenu"),
    (0x0D, "Exit"),
    (0x20, "0"),
    (0x21, "1"),
    (0x22, "2"),
    (0x23, "3"),
    (0x24, "4"),
    (0x25, "5"),
    (0x26, "6"),
    (0x27, "7"),
    (0x28, "8"),
    (0x29, "9"),
    (0x2A, "Dot"),
    (0x2B, "Enter"),
    (0x2C, "Clear"),
    (0x2F, "NextFavorite"),
    (0x30, "ChannelUp"),
    (0x31, "ChannelDown"),
    (0x32, "PreviousChannel"),
    (0x33, "SoundSelect"),
    (0x34, "InputSelect"),
    (0x35, "DisplayInformation"),
    (0x36, "Help"),
    (0x37, "PageUp"),
    (0x38, "PageDown"),
    (0x40, "Power"),
    (0x41, "VolumeUp"),
    (0x42, "VolumeDown"),
    (0x43, "Mute"),
    (0x44, "Play"),
    (0x45, "Stop"),
    (0x46, "Pause"),
    (0x47, "Record"),
    (0x48, "Rewind"),
    (0x49, "FastForward"),
    (0x4A, "Eject"),
    (0x4B, "Forward"),
    (0x4C, "Backward"),
    (0x4D, "StopRecord"),
    (0x4E, "PauseRecord"),
    (0x50, "Angle"),
    (0x51, "SubPicture"),
    (0x52, "VideoOnDemand"),
    (0x53, "ElectronicProgramGuide"),
    (0x54, "TimerProgramming"),
    (0x55, "InitialConfiguration"),
    (0x60, "PlayFunction"),
    (0x61, "PausePlay"),
    (0x62, "RecordFunction"),
    (0x63, "PauseRecordFunction"),
    (0x64, "StopFunction"),
    (0x65, "Mute"),
    (0x66, "RestoreVolume"),
    (0x67, "Tune"),
    (0x68, "SelectMedia"),
    (0x69, "SelectAvInput"),
    (0x6A, "SelectAudioInput"),
    (0x6B, "PowerToggle"),
    (0x6C, "PowerOff"),
    (0x6D, "PowerOn"),
    (0x71, "Blue"),
    (0x72, "Red"),
    (0x73, "Green"),
    (0x74, "Yellow"),
    (0x75, "F5"),
    (0x76, "Data"),
    (0x91, "AnReturn"),
    (0x96, "Max"),
];

/// User control code of a key name, `None` if there is no such key.
pub fn key_code_for_name(name: &str) -> Option<u8> {
    let name = normalize(name);
    KEYS.iter()
        .find(|(_, n)| n.eq_ignore_ascii_case(&name))
        .map(|(code, _)| *code)
}

/// Canonical name of a user control code.
pub fn name_for_key_code(code: u8) -> Option<&'static str> {
    KEYS.binary_search_by_key(&code, |(c, _)| *c)
        .ok()
        .map(|i| KEYS[i].1)
}

/// A remote control key, given either as raw user control code or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Code(u8),
    Name(String),
}

impl Key {
    /// Turn the key into its user control code.
    pub fn resolve(&self) -> Result<u8> {
        match self {
            Key::Code(code) => Ok(*code),
            Key::Name(name) => {
                key_code_for_name(name).ok_or_else(|| CecError::UnknownKey(name.clone()))
            }
        }
    }
}

impl From<u8> for Key {
    fn from(value: u8) -> Self {
        Key::Code(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Name(value.to_string())
    }
}

/// `"0x41"` is read as a raw code, anything else as a key name.
impl FromStr for Key {
    type Err = CecError;
    fn from_str(s: &str) -> Result<Self> {
        match s.strip_prefix("0x") {
            Some(hex) if hex.len() == 2 => u8::from_str_radix(hex, 16)
                .map(Key::Code)
                .map_err(|_| CecError::UnknownKey(s.to_string())),
            _ => Ok(Key::Name(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_names_round_trip() {
        for addr in 0..16u8 {
            let name = name_for_address(addr).unwrap();
            assert_eq!(address_for_name(name), Some(LogicalAddress(addr)), "{name}");
        }
    }

    #[test]
    fn address_out_of_range() {
        assert!(matches!(name_for_address(16), Err(CecError::OutOfRange(16))));
        assert!(LogicalAddress::new(0x10).is_err());
    }

    #[test]
    fn address_name_aliases() {
        assert_eq!(address_for_name("unregistered"), Some(LogicalAddress::BROADCAST));
        assert_eq!(address_for_name("Un-Registered"), Some(LogicalAddress::BROADCAST));
        assert_eq!(address_for_name("Playback2"), address_for_name("playback2"));
        assert_eq!(address_for_name("Tuner-2"), address_for_name("tuner2"));
        assert_eq!(address_for_name("Tuner 2"), Some(LogicalAddress(6)));
        // trailing 1 is the base name
        assert_eq!(address_for_name("Playback1"), Some(LogicalAddress::PLAYBACK));
        assert_eq!(address_for_name("recording_1"), Some(LogicalAddress::RECORDING));
    }

    #[test]
    fn address_name_misses() {
        assert_eq!(address_for_name("toaster"), None);
        assert_eq!(address_for_name(""), None);
        assert_eq!(address_for_name("1"), None);
    }

    #[test]
    fn parse_logical_address() {
        assert_eq!("tv".parse::<LogicalAddress>().unwrap(), LogicalAddress::TV);
        assert_eq!("4".parse::<LogicalAddress>().unwrap(), LogicalAddress::PLAYBACK);
        assert_eq!("0xf".parse::<LogicalAddress>().unwrap(), LogicalAddress::BROADCAST);
        assert!(matches!(
            "16".parse::<LogicalAddress>(),
            Err(CecError::OutOfRange(16))
        ));
        assert!(matches!(
            "nope".parse::<LogicalAddress>(),
            Err(CecError::UnknownAddress(n)) if n == "nope"
        ));
        assert_eq!(
            "0xzz".parse::<LogicalAddress>().unwrap_err().to_string(),
            "\"0xzz\" is neither a logical address name nor a number"
        );
    }

    #[test]
    fn vendors() {
        assert_eq!(vendor_name(0x0000F0), "Samsung");
        assert_eq!(vendor_name(0x9C645E), "Harman Kardon");
        assert_eq!(vendor_name(0x123456), "");
    }

    #[test]
    fn vendor_table_is_sorted() {
        assert!(VENDORS.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(KEYS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn key_names() {
        assert_eq!(key_code_for_name("Volume Up"), Some(0x41));
        assert_eq!(key_code_for_name("volume-up"), Some(0x41));
        assert_eq!(key_code_for_name("SELECT"), Some(0x00));
        assert_eq!(key_code_for_name("Mute"), Some(0x43));
        assert_eq!(key_code_for_name("Fire"), None);
        assert_eq!(name_for_key_code(0x6d), Some("PowerOn"));
        assert_eq!(name_for_key_code(0x0e), None);
    }

    #[test]
    fn key_arguments() {
        assert_eq!("0x41".parse::<Key>().unwrap(), Key::Code(0x41));
        assert_eq!("Select".parse::<Key>().unwrap().resolve().unwrap(), 0);
        assert!("0xzz".parse::<Key>().is_err());
        assert!(matches!(
            Key::from("Launch").resolve(),
            Err(CecError::UnknownKey(_))
        ));
        assert_eq!(Key::from(0x44).resolve().unwrap(), 0x44);
    }
}
