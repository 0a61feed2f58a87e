//! Network and member identifiers
//!
//! Both are non-zero 64-bit values. Networks render as 16 lowercase hex
//! digits, members as 10 (a 40-bit address). Zero is reserved and can never
//! be constructed.

use crate::error::StoreError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Hex digits in a network id
pub const NETWORK_ID_HEX_LEN: usize = 16;

/// Hex digits in a member address
pub const MEMBER_ID_HEX_LEN: usize = 10;

/// Parse `s` as hex into a non-zero u64, requiring exactly `len` digits when given.
fn parse_hex(s: &str, len: Option<usize>) -> Option<NonZeroU64> {
    if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    if let Some(len) = len {
        if s.len() != len {
            return None;
        }
    }
    u64::from_str_radix(s, 16).ok().and_then(NonZeroU64::new)
}

/// Identifier of a virtual network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(NonZeroU64);

impl NetworkId {
    /// Returns `None` for the reserved value `0`
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Decode a canonical 16-digit hex id
    pub fn from_hex(s: &str) -> Option<Self> {
        parse_hex(s, Some(NETWORK_ID_HEX_LEN)).map(Self)
    }

    /// Decode a hex id of any width up to 16 digits, as found in `nwid` fields
    pub fn from_hex_lenient(s: &str) -> Option<Self> {
        parse_hex(s, None).map(Self)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0.get())
    }
}

impl FromStr for NetworkId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_lenient(s)
            .ok_or_else(|| StoreError::InvalidId(format!("bad network id '{}'", s)))
    }
}

impl Serialize for NetworkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NetworkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Address of a member device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(NonZeroU64);

impl MemberId {
    /// Returns `None` for the reserved value `0`
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Decode a canonical 10-digit hex address
    pub fn from_hex(s: &str) -> Option<Self> {
        parse_hex(s, Some(MEMBER_ID_HEX_LEN)).map(Self)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010x}", self.0.get())
    }
}

impl FromStr for MemberId {
    type Err = StoreError;

    /// Accepts up to 10 hex digits; leading zeros may be omitted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Some(s)
            .filter(|s| s.len() <= MEMBER_ID_HEX_LEN)
            .and_then(|s| parse_hex(s, None))
            .map(Self)
            .ok_or_else(|| StoreError::InvalidId(format!("bad member id '{}'", s)))
    }
}

impl Serialize for MemberId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MemberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
