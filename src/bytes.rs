/*!
 * Owned byte sequences
 *
 * `Bytes` carries MAC addresses, nonces, MICs and raw frames around the crate.
 * Ordering is length-first, then byte-wise, which is also the ordering the
 * PTK expansion uses to place addresses and nonces.
 */

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(Vec<u8>);

/// Length-first, then lexicographic comparison of two byte slices
pub fn compare_slices(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

impl Bytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Parse a hex string in any of the formats this type prints.
    ///
    /// Colons and spaces are ignored, so `00:14:6C:7E:40:80`, `00 14 6C 7E 40 80`
    /// and `00146c7e4080` all decode to the same six bytes.
    pub fn from_hex(input: &str) -> Result<Self> {
        let dense: String = input.chars().filter(|c| *c != ':' && *c != ' ').collect();
        hex::decode(&dense).map(Self).map_err(|source| Error::Format {
            input: input.to_string(),
            source,
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when there is nothing or only zeroes (an unset nonce or MIC)
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    pub fn compare(&self, other: &Bytes) -> Ordering {
        compare_slices(&self.0, &other.0)
    }

    /// `XX:XX:XX:XX:XX:XX`
    pub fn mac_string(&self) -> String {
        self.join_upper(":")
    }

    /// `XXXXXXXXXXXX`
    pub fn hex_string(&self) -> String {
        hex::encode_upper(&self.0)
    }

    /// `XX XX XX XX XX XX`
    pub fn hex_space_string(&self) -> String {
        self.join_upper(" ")
    }

    pub fn utf8_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    fn join_upper(&self, separator: &str) -> String {
        self.0
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl Ord for Bytes {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for Bytes {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex_space_string())
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes({})", self.hex_space_string())
    }
}

impl FromStr for Bytes {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(bytes: [u8; N]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Serialize for Bytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.hex_string())
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Bytes::from_hex(&text).map_err(serde::de::Error::custom)
    }
}
