//! Cryptographic primitives: Keccak-256 hashing and recoverable secp256k1
//! signatures.
//!
//! These are the primitives the ledger contract uses (`keccak256`,
//! `ecrecover`), so every byte produced here must match its conventions.

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::error::AuthError;
use crate::types::{decode_hex, Address};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LEN: usize = 65;

/// Compute the Keccak-256 hash of the given data.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Derive the ledger address of a public key.
///
/// Keccak-256 over the uncompressed point without its `0x04` tag, keeping the
/// last 20 bytes.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Address(out)
}

/// A 65-byte recoverable signature: `r (32) || s (32) || v (1)`.
///
/// `v` is stored as produced by the signer (27 or 28). Parsing also accepts
/// the raw recovery ids 0 and 1.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, rejecting anything that is not exactly 65 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, AuthError> {
        let arr: [u8; SIGNATURE_LEN] = bytes.try_into().map_err(|_| {
            AuthError::MalformedSignature(format!(
                "expected {} bytes, got {}",
                SIGNATURE_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Parse from hex string, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, AuthError> {
        let bytes = decode_hex(s).map_err(|e| AuthError::MalformedSignature(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// Convert to hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// The trailing `v` byte.
    pub fn v(&self) -> u8 {
        self.0[64]
    }

    /// Split into the ECDSA part and the recovery id.
    ///
    /// Rejects unknown `v` values, zero scalars and high-S forms, which the
    /// ledger's `ecrecover` wrapper also refuses.
    pub(crate) fn to_parts(self) -> Result<(EcdsaSignature, RecoveryId), AuthError> {
        let recid = match self.v() {
            27 | 28 => self.v() - 27,
            0 | 1 => self.v(),
            other => {
                return Err(AuthError::MalformedSignature(format!(
                    "invalid recovery byte {}",
                    other
                )))
            }
        };
        let recid = RecoveryId::from_byte(recid)
            .ok_or_else(|| AuthError::MalformedSignature("invalid recovery id".into()))?;

        let sig = EcdsaSignature::from_slice(&self.0[..64])
            .map_err(|e| AuthError::MalformedSignature(e.to_string()))?;
        if sig.normalize_s().is_some() {
            return Err(AuthError::MalformedSignature("non-canonical high-S value".into()));
        }
        Ok((sig, recid))
    }

    pub(crate) fn from_parts(sig: &EcdsaSignature, recid: RecoveryId) -> Self {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = 27 + recid.to_byte();
        Self(out)
    }

    /// The zero signature (invalid, used as placeholder).
    pub const ZERO: Self = Self([0u8; SIGNATURE_LEN]);
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", self.to_hex()))
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A secp256k1 signing key that authorizes records.
///
/// Key custody is the caller's concern; this type only holds the key for the
/// duration of a signing session.
#[derive(Clone)]
pub struct Signer {
    signing_key: SigningKey,
}

impl Signer {
    /// Generate a new random signer.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::random(&mut rng),
        }
    }

    /// Create from a 32-byte secret scalar.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self, AuthError> {
        let signing_key =
            SigningKey::from_slice(secret).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        Ok(Self { signing_key })
    }

    /// Parse a hex secret, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, AuthError> {
        let bytes = decode_hex(s).map_err(|e| AuthError::InvalidKey(e.to_string()))?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|_| AuthError::InvalidKey("secret must be 32 bytes".into()))?;
        Self::from_bytes(&secret)
    }

    /// The ledger address of this signer.
    pub fn address(&self) -> Address {
        address_of(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte hash as-is (RFC 6979, low-S).
    ///
    /// Callers authorizing records go through [`crate::auth::sign`], which
    /// applies the domain-separation step first.
    pub fn sign_hash(&self, hash: &[u8; 32]) -> Result<Signature, AuthError> {
        let (sig, recid) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(Signature::from_parts(&sig, recid))
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signer({})", self.address())
    }
}

/// Recover the address that produced `signature` over a 32-byte hash.
pub fn recover_hash(hash: &[u8; 32], signature: &Signature) -> Result<Address, AuthError> {
    let (sig, recid) = signature.to_parts()?;
    let key = VerifyingKey::recover_from_prehash(hash, &sig, recid)
        .map_err(|e| AuthError::MalformedSignature(e.to_string()))?;
    Ok(address_of(&key))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (first default account of local EVM nodes).
    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_keccak256_vectors() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_eq!(
            hex::encode(keccak256(b"abc")),
            "4e03657aea45a94fc7d47ba826c8d667c0d1e6e33a64a036ec44f58fa12d6c45"
        );
    }

    #[test]
    fn test_dev_key_address() {
        let signer = Signer::from_hex(DEV_KEY).unwrap();
        assert_eq!(
            signer.address().to_string(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_sign_recover_hash() {
        let signer = Signer::generate();
        let hash = keccak256(b"hello world");
        let sig = signer.sign_hash(&hash).unwrap();

        assert!(sig.v() == 27 || sig.v() == 28);
        assert_eq!(recover_hash(&hash, &sig).unwrap(), signer.address());

        let other = keccak256(b"hello worlD");
        assert_ne!(recover_hash(&other, &sig).ok(), Some(signer.address()));
    }

    #[test]
    fn test_sign_is_deterministic() {
        let signer = Signer::from_hex(DEV_KEY).unwrap();
        let hash = keccak256(b"payload");
        assert_eq!(signer.sign_hash(&hash).unwrap(), signer.sign_hash(&hash).unwrap());
    }

    #[test]
    fn test_raw_recovery_id_accepted() {
        let signer = Signer::generate();
        let hash = keccak256(b"raw v");
        let mut sig = signer.sign_hash(&hash).unwrap();
        sig.0[64] -= 27;
        assert_eq!(recover_hash(&hash, &sig).unwrap(), signer.address());
    }

    #[test]
    fn test_malformed_signatures() {
        let hash = keccak256(b"x");

        assert!(matches!(
            Signature::from_slice(&[0u8; 64]),
            Err(AuthError::MalformedSignature(_))
        ));

        assert!(matches!(
            recover_hash(&hash, &Signature::ZERO),
            Err(AuthError::MalformedSignature(_))
        ));

        let signer = Signer::generate();
        let mut bad_v = signer.sign_hash(&hash).unwrap();
        bad_v.0[64] = 5;
        assert!(matches!(
            recover_hash(&hash, &bad_v),
            Err(AuthError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_high_s_rejected() {
        // secp256k1 group order
        const N: [u8; 32] = [
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
            0xff, 0xfe, 0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c,
            0xd0, 0x36, 0x41, 0x41,
        ];
        let signer = Signer::generate();
        let hash = keccak256(b"malleable");
        let sig = signer.sign_hash(&hash).unwrap();

        // s' = n - s, the malleated twin of a low-S signature
        let mut flipped = sig;
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let diff = N[i] as i16 - sig.0[32 + i] as i16 - borrow;
            borrow = if diff < 0 { 1 } else { 0 };
            flipped.0[32 + i] = (diff + 256 * borrow) as u8;
        }
        flipped.0[64] = if sig.v() == 27 { 28 } else { 27 };

        assert!(matches!(
            recover_hash(&hash, &flipped),
            Err(AuthError::MalformedSignature(_))
        ));
    }

    #[test]
    fn test_signature_hex_roundtrip() {
        let signer = Signer::generate();
        let sig = signer.sign_hash(&keccak256(b"hex")).unwrap();
        let parsed = Signature::from_hex(&format!("0x{}", sig.to_hex())).unwrap();
        assert_eq!(sig, parsed);
    }
}
