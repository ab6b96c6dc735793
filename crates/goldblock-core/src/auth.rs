//! Signer authorization over content ids.
//!
//! The bytes actually signed are produced by an explicit domain-separation
//! step, [`signed_message`]: the personal-message prefix followed by the raw
//! 32-byte content id. Keccak-256 of that message is what the key signs and
//! what the ledger's `ecrecover` checks. The prefix keeps a record
//! authorization from ever being a valid signature over a raw transaction.

use std::collections::HashSet;

use crate::crypto::{keccak256, recover_hash, Signature, Signer};
use crate::error::AuthError;
use crate::types::{Address, ContentId};

/// Domain-separation prefix for a 32-byte message.
pub const SIGNED_MESSAGE_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

/// Build the exact message bytes that get hashed and signed.
pub fn signed_message(content_id: &ContentId) -> Vec<u8> {
    let mut msg = Vec::with_capacity(SIGNED_MESSAGE_PREFIX.len() + 32);
    msg.extend_from_slice(SIGNED_MESSAGE_PREFIX);
    msg.extend_from_slice(content_id.as_bytes());
    msg
}

/// Keccak-256 of [`signed_message`].
pub fn signed_message_hash(content_id: &ContentId) -> [u8; 32] {
    keccak256(&signed_message(content_id))
}

/// Sign a content id.
pub fn sign(content_id: &ContentId, signer: &Signer) -> Result<Signature, AuthError> {
    signer.sign_hash(&signed_message_hash(content_id))
}

/// Recover the address that signed `content_id`.
pub fn recover_signer(content_id: &ContentId, signature: &Signature) -> Result<Address, AuthError> {
    recover_hash(&signed_message_hash(content_id), signature)
}

/// Check that `signature` over `content_id` was produced by `expected`.
///
/// Malformed signatures verify as false; use [`recover_signer`] to tell the
/// cases apart.
pub fn verify(content_id: &ContentId, signature: &Signature, expected: &Address) -> bool {
    matches!(recover_signer(content_id, signature), Ok(addr) if addr == *expected)
}

impl Signer {
    /// Authorize a content id with this key.
    pub fn sign(&self, content_id: &ContentId) -> Result<Signature, AuthError> {
        sign(content_id, self)
    }
}

/// The set of addresses allowed to admit records.
///
/// An empty set authorizes nobody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedSigners {
    signers: HashSet<Address>,
}

impl AuthorizedSigners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address. Returns false if it was already present.
    pub fn insert(&mut self, address: Address) -> bool {
        self.signers.insert(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.signers.contains(address)
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.signers.iter()
    }

    /// Recover the signer of `content_id` and require it to be in the set.
    pub fn authorize(
        &self,
        content_id: &ContentId,
        signature: &Signature,
    ) -> Result<Address, AuthError> {
        let signer = recover_signer(content_id, signature)?;
        if !self.contains(&signer) {
            return Err(AuthError::UnauthorizedSubmission(signer));
        }
        Ok(signer)
    }
}

impl FromIterator<Address> for AuthorizedSigners {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            signers: iter.into_iter().collect(),
        }
    }
}

impl Extend<Address> for AuthorizedSigners {
    fn extend<I: IntoIterator<Item = Address>>(&mut self, iter: I) {
        self.signers.extend(iter);
    }
}
