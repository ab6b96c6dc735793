//! In-memory implementation of the LedgerClient trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use goldblock_core::{ArrayPacking, AuthorizedSigners, ProvenanceRecord, Signature};

use crate::error::{LedgerError, Result};
use crate::traits::{check_append, LedgerClient, LedgerEntry};

/// In-memory ledger.
///
/// All data is lost when the ledger is dropped. Thread-safe via RwLock.
pub struct MemoryLedger {
    packing: ArrayPacking,
    signers: Option<AuthorizedSigners>,
    inner: RwLock<MemoryLedgerInner>,
}

#[derive(Default)]
struct MemoryLedgerInner {
    /// Entries by sequence index.
    entries: Vec<LedgerEntry>,

    /// Record id -> sequence index.
    by_id: HashMap<Bytes, u32>,
}

impl MemoryLedger {
    /// Create a new empty ledger using the default packing.
    pub fn new() -> Self {
        Self::with_packing(ArrayPacking::default())
    }

    /// Create a new empty ledger that derives content ids with `packing`.
    pub fn with_packing(packing: ArrayPacking) -> Self {
        Self {
            packing,
            signers: None,
            inner: RwLock::new(MemoryLedgerInner::default()),
        }
    }

    /// Only admit records signed by one of `signers`.
    ///
    /// Without a set the ledger still requires a recoverable signature.
    pub fn with_signers(mut self, signers: AuthorizedSigners) -> Self {
        self.signers = Some(signers);
        self
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, MemoryLedgerInner>> {
        self.inner
            .read()
            .map_err(|_| LedgerError::Unavailable("memory ledger lock poisoned".into()))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, MemoryLedgerInner>> {
        self.inner
            .write()
            .map_err(|_| LedgerError::Unavailable("memory ledger lock poisoned".into()))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    async fn read(&self, index: u32) -> Result<Option<LedgerEntry>> {
        Ok(self.read_inner()?.entries.get(index as usize).cloned())
    }

    async fn append(&self, record: &ProvenanceRecord, signature: &Signature) -> Result<u32> {
        let content_id = record.content_id_with(self.packing);
        let mut inner = self.write_inner()?;

        let len = inner.entries.len() as u32;
        let existing = inner
            .by_id
            .get(&record.id)
            .and_then(|&i| inner.entries.get(i as usize));
        if let Some(index) = check_append(
            record,
            &content_id,
            signature,
            self.signers.as_ref(),
            existing,
            len,
        )? {
            debug!(index, "ledger append is a resubmission");
            return Ok(index);
        }

        inner.by_id.insert(record.id.clone(), len);
        inner.entries.push(LedgerEntry {
            index: len,
            record: record.clone(),
            content_id,
            signature: *signature,
        });
        Ok(len)
    }

    async fn len(&self) -> Result<u32> {
        Ok(self.read_inner()?.entries.len() as u32)
    }

    async fn find(&self, id: &[u8]) -> Result<Option<u32>> {
        Ok(self.read_inner()?.by_id.get(id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use goldblock_core::{RecordBuilder, Signer, U256};

    const DEV_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn record(id: &str, parents: &[u64]) -> ProvenanceRecord {
        RecordBuilder::new(id.as_bytes().to_vec())
            .producer(b"AB")
            .location(b"shenzhen".to_vec())
            .weight(100)
            .timestamp(U256::from_u64(1_672_531_200_000))
            .parents(parents.iter().copied())
            .build()
            .unwrap()
    }

    fn dev() -> Signer {
        Signer::from_hex(DEV_KEY).unwrap()
    }

    fn signed(r: &ProvenanceRecord) -> Signature {
        dev().sign(&r.content_id()).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_read() {
        let ledger = MemoryLedger::new();
        let signer = Signer::generate();
        let r = record("R1", &[]);
        let sig = signer.sign(&r.content_id()).unwrap();

        assert_eq!(ledger.append(&r, &sig).await.unwrap(), 0);
        assert_eq!(ledger.len().await.unwrap(), 1);

        let entry = ledger.read(0).await.unwrap().unwrap();
        assert_eq!(entry.index, 0);
        assert_eq!(entry.record, r);
        assert_eq!(entry.content_id, r.content_id());
        assert_eq!(entry.signature, sig);

        assert!(ledger.read(1).await.unwrap().is_none());
        assert_eq!(ledger.find(b"R1").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_resubmission_returns_existing_index() {
        let ledger = MemoryLedger::new();
        let r = record("R1", &[]);
        ledger.append(&r, &signed(&r)).await.unwrap();
        assert_eq!(ledger.append(&r, &signed(&r)).await.unwrap(), 0);
        assert_eq!(ledger.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejections_store_nothing() {
        let ledger = MemoryLedger::new();
        let r1 = record("R1", &[]);
        ledger.append(&r1, &signed(&r1)).await.unwrap();

        let dangling = record("R2", &[3]);
        let err = ledger
            .append(&dangling, &signed(&dangling))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));

        let conflict = record("R1", &[0]);
        let err = ledger
            .append(&conflict, &signed(&conflict))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));

        assert_eq!(ledger.len().await.unwrap(), 1);
        assert_eq!(ledger.find(b"R2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsigned_append_rejected() {
        let ledger = MemoryLedger::new();
        let err = ledger
            .append(&record("junk", &[]), &Signature::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(ref msg) if msg.contains("signature")));
        assert!(ledger.is_empty().await.unwrap());
        assert_eq!(ledger.find(b"junk").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_signer_set_enforced() {
        let signers: AuthorizedSigners = [dev().address()].into_iter().collect();
        let ledger = MemoryLedger::new().with_signers(signers);

        let r = record("R1", &[]);
        let outsider = Signer::generate().sign(&r.content_id()).unwrap();
        assert!(matches!(
            ledger.append(&r, &outsider).await,
            Err(LedgerError::Rejected(_))
        ));
        assert!(ledger.is_empty().await.unwrap());

        assert_eq!(ledger.append(&r, &signed(&r)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_word_aligned_content_id() {
        let ledger = MemoryLedger::with_packing(ArrayPacking::WordAligned);
        let sign = |r: &ProvenanceRecord| {
            dev()
                .sign(&r.content_id_with(ArrayPacking::WordAligned))
                .unwrap()
        };
        let root = record("R1", &[]);
        ledger.append(&root, &sign(&root)).await.unwrap();
        let child = record("R2", &[0]);
        ledger.append(&child, &sign(&child)).await.unwrap();

        let entry = ledger.read(1).await.unwrap().unwrap();
        assert_eq!(
            entry.content_id,
            child.content_id_with(ArrayPacking::WordAligned)
        );
        assert_ne!(entry.content_id, child.content_id());
    }

    #[tokio::test]
    async fn test_read_range() {
        let ledger = MemoryLedger::new();
        for i in 0..5u64 {
            let parents: Vec<u64> = if i == 0 { vec![] } else { vec![i - 1] };
            let r = record(&format!("R{}", i), &parents);
            ledger.append(&r, &signed(&r)).await.unwrap();
        }

        let entries = ledger.read_range(1, 10).await.unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries.iter().map(|e| e.index).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }
}
