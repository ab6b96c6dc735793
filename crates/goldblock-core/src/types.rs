//! Strong type definitions for gold block records.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::EncodingError;

/// Decode a hex string, accepting an optional `0x` prefix.
pub fn decode_hex(s: &str) -> Result<Vec<u8>, EncodingError> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(trimmed).map_err(|e| EncodingError::InvalidHex(e.to_string()))
}

fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N], EncodingError> {
    let bytes = decode_hex(s)?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        EncodingError::InvalidHex(format!("expected {} bytes, got {}", N, b.len()))
    })
}

/// Serialize as a `0x`-prefixed hex string so configs and JSON stay readable.
macro_rules! hex_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&format!("0x{}", self.to_hex()))
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                <$ty>::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

/// A 32-byte content identifier: Keccak-256 of a record's canonical encoding.
///
/// Two records with the same field values have the same ContentId.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(pub [u8; 32]);

impl ContentId {
    /// Create a new ContentId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, EncodingError> {
        decode_hex_array(s).map(Self)
    }

    /// The zero content id (sentinel).
    pub const ZERO: Self = Self([0u8; 32]);
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for ContentId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for ContentId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for ContentId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

hex_serde!(ContentId);

/// A 20-byte signer address, as recovered by the ledger contract.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex, no prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without `0x`. Checksum casing is ignored.
    pub fn from_hex(s: &str) -> Result<Self, EncodingError> {
        decode_hex_array(&s.to_ascii_lowercase()).map(Self)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

hex_serde!(Address);

/// The fixed 2-byte producer code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProducerCode(pub [u8; 2]);

impl ProducerCode {
    pub const fn new(bytes: [u8; 2]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 2 bytes long.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let arr: [u8; 2] = bytes
            .try_into()
            .map_err(|_| EncodingError::ProducerWidth(bytes.len()))?;
        Ok(Self(arr))
    }

    pub const fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }
}

impl fmt::Debug for ProducerCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProducerCode(0x{})", hex::encode(self.0))
    }
}

/// An unsigned 256-bit integer, stored big-endian.
///
/// Only the ledger-facing conversions are provided; there is no arithmetic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct U256(pub [u8; 32]);

impl U256 {
    pub const ZERO: Self = Self([0u8; 32]);
    pub const MAX: Self = Self([0xff; 32]);

    pub fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    pub fn from_u128(value: u128) -> Self {
        let mut out = [0u8; 32];
        out[16..].copy_from_slice(&value.to_be_bytes());
        Self(out)
    }

    /// Build from big-endian bytes of any length. Leading zero bytes are
    /// ignored; more than 32 significant bytes is an overflow.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, EncodingError> {
        let significant = match bytes.iter().position(|&b| b != 0) {
            Some(start) => &bytes[start..],
            None => return Ok(Self::ZERO),
        };
        if significant.len() > 32 {
            return Err(EncodingError::TimestampOverflow(significant.len()));
        }
        let mut out = [0u8; 32];
        out[32 - significant.len()..].copy_from_slice(significant);
        Ok(Self(out))
    }

    /// Parse a base-10 literal.
    pub fn from_dec_str(s: &str) -> Result<Self, EncodingError> {
        if s.is_empty() {
            return Err(EncodingError::InvalidTimestamp("empty".into()));
        }
        let mut out = [0u8; 32];
        for ch in s.chars() {
            let digit = ch
                .to_digit(10)
                .ok_or_else(|| EncodingError::InvalidTimestamp(s.to_string()))?;
            let mut carry = digit;
            for byte in out.iter_mut().rev() {
                let v = (*byte as u32) * 10 + carry;
                *byte = (v & 0xff) as u8;
                carry = v >> 8;
            }
            if carry != 0 {
                return Err(EncodingError::TimestampOverflow(33));
            }
        }
        Ok(Self(out))
    }

    pub const fn to_be_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Narrow to u128 if the value fits.
    pub fn to_u128(&self) -> Option<u128> {
        if self.0[..16].iter().any(|&b| b != 0) {
            return None;
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&self.0[16..]);
        Some(u128::from_be_bytes(low))
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(small) = self.to_u128() {
            return write!(f, "{}", small);
        }
        let mut work = self.0;
        let mut digits = Vec::with_capacity(78);
        while work.iter().any(|&b| b != 0) {
            let mut rem = 0u32;
            for byte in work.iter_mut() {
                let cur = (rem << 8) | *byte as u32;
                *byte = (cur / 10) as u8;
                rem = cur % 10;
            }
            digits.push(b'0' + rem as u8);
        }
        digits.reverse();
        f.write_str(&String::from_utf8_lossy(&digits))
    }
}

impl fmt::Debug for U256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U256({})", self)
    }
}

impl From<u64> for U256 {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for U256 {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl Serialize for U256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for U256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_hex_roundtrip() {
        let id = ContentId::from_bytes([0x42; 32]);
        let recovered = ContentId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);

        let prefixed = ContentId::from_hex(&format!("0x{}", id.to_hex())).unwrap();
        assert_eq!(id, prefixed);
    }

    #[test]
    fn test_content_id_debug() {
        let id = ContentId::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", id), "ContentId(cdcdcdcdcdcdcdcd)");
    }

    #[test]
    fn test_address_ignores_checksum_case() {
        let lower = Address::from_hex("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266").unwrap();
        let mixed = Address::from_hex("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap();
        assert_eq!(lower, mixed);
        assert_eq!(lower.to_string(), "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    }

    #[test]
    fn test_address_wrong_length() {
        assert!(matches!(
            Address::from_hex("0x1234"),
            Err(EncodingError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_producer_width() {
        assert!(ProducerCode::from_slice(b"AB").is_ok());
        assert_eq!(
            ProducerCode::from_slice(b"ABC"),
            Err(EncodingError::ProducerWidth(3))
        );
        assert_eq!(
            ProducerCode::from_slice(b""),
            Err(EncodingError::ProducerWidth(0))
        );
    }

    #[test]
    fn test_u256_from_be_slice() {
        let mut wide = vec![0u8; 40];
        wide[39] = 7;
        assert_eq!(U256::from_be_slice(&wide).unwrap(), U256::from_u64(7));

        let mut too_wide = vec![0u8; 33];
        too_wide[0] = 1;
        assert_eq!(
            U256::from_be_slice(&too_wide),
            Err(EncodingError::TimestampOverflow(33))
        );

        assert_eq!(U256::from_be_slice(&[0xff; 32]).unwrap(), U256::MAX);
    }

    #[test]
    fn test_u256_decimal() {
        let t = U256::from_dec_str("1672531200000").unwrap();
        assert_eq!(t, U256::from_u64(1_672_531_200_000));
        assert_eq!(t.to_string(), "1672531200000");

        let max = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
        assert_eq!(U256::from_dec_str(max).unwrap(), U256::MAX);
        assert_eq!(U256::MAX.to_string(), max);

        let over = "115792089237316195423570985008687907853269984665640564039457584007913129639936";
        assert!(matches!(
            U256::from_dec_str(over),
            Err(EncodingError::TimestampOverflow(_))
        ));
        assert!(matches!(
            U256::from_dec_str("12a"),
            Err(EncodingError::InvalidTimestamp(_))
        ));
        assert_eq!(U256::ZERO.to_string(), "0");
    }

    #[test]
    fn test_serde_uses_hex_and_decimal_strings() {
        let addr = Address::from_bytes([0x11; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "11".repeat(20)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);

        let ts = U256::from_u64(100);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "\"100\"");
    }
}
