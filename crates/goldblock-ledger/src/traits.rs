//! LedgerClient trait: the interface to the ledger that stores records.
//!
//! The production ledger is a contract reached over RPC; this crate ships
//! local implementations with the same admission rules so the harness can run
//! without one.

use async_trait::async_trait;
use goldblock_core::{recover_signer, AuthorizedSigners, ContentId, ProvenanceRecord, Signature};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A record as stored by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Sequence index assigned by the ledger.
    pub index: u32,
    /// Stored fields.
    pub record: ProvenanceRecord,
    /// Content id the ledger derived at append time.
    pub content_id: ContentId,
    /// Signature submitted with the record.
    pub signature: Signature,
}

/// Async interface to a provenance ledger.
///
/// # Design Notes
///
/// - **Contiguous indices**: entries are numbered from 0 in append order.
/// - **Idempotent appends**: appending a record whose fields match an existing
///   entry returns that entry's index.
/// - **Rejections**: a conflicting id, an unassigned parent index or a
///   signature that does not authorize the record is `LedgerError::Rejected`,
///   and nothing is stored.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read the entry at `index`.
    async fn read(&self, index: u32) -> Result<Option<LedgerEntry>>;

    /// Append a record, returning its sequence index.
    async fn append(&self, record: &ProvenanceRecord, signature: &Signature) -> Result<u32>;

    /// Number of stored entries.
    async fn len(&self) -> Result<u32>;

    /// Look up the index of a record id.
    async fn find(&self, id: &[u8]) -> Result<Option<u32>>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Read entries `start..end`, stopping early at the end of the ledger.
    async fn read_range(&self, start: u32, end: u32) -> Result<Vec<LedgerEntry>> {
        let mut out = Vec::new();
        for index in start..end {
            match self.read(index).await? {
                Some(entry) => out.push(entry),
                None => break,
            }
        }
        Ok(out)
    }
}

/// Admission rule shared by the local ledgers.
///
/// `existing` is the stored entry with the same id, if any; `len` the current
/// entry count. The signature must recover over `content_id`, and when
/// `signers` is set the recovered address must be in it. Returns the index to
/// reuse for an identical resubmission.
pub(crate) fn check_append(
    record: &ProvenanceRecord,
    content_id: &ContentId,
    signature: &Signature,
    signers: Option<&AuthorizedSigners>,
    existing: Option<&LedgerEntry>,
    len: u32,
) -> Result<Option<u32>> {
    use crate::error::LedgerError;

    if let Some(entry) = existing {
        if entry.record == *record {
            return Ok(Some(entry.index));
        }
        return Err(LedgerError::Rejected(format!(
            "record id already stored at index {} with different fields",
            entry.index
        )));
    }

    if let Some(parent) = record.parent_ids.iter().find(|&&p| p >= len) {
        return Err(LedgerError::Rejected(format!(
            "parent index {} has not been assigned",
            parent
        )));
    }

    let authorized = match signers {
        Some(signers) => signers.authorize(content_id, signature),
        None => recover_signer(content_id, signature),
    };
    if let Err(e) = authorized {
        return Err(LedgerError::Rejected(format!("signature rejected: {}", e)));
    }

    if len == u32::MAX {
        return Err(LedgerError::Rejected("sequence index space exhausted".into()));
    }

    Ok(None)
}
