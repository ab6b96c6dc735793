//! The Harness: a validated lineage graph in front of a ledger client.
//!
//! The ledger is the source of truth for record storage and index
//! assignment. The harness keeps a local [`ProvenanceGraph`] mirroring it,
//! validates every submission locally before it reaches the ledger, and
//! re-derives content ids on the way back out.

use std::collections::BTreeSet;
use std::sync::Arc;

use goldblock_core::{
    verify_batch, Admission, AuthError, ContentId, GraphError, ProvenanceGraph, ProvenanceRecord,
    Signature, Signer, Verified,
};
use goldblock_ledger::{LedgerClient, LedgerEntry};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};

/// Per-entry outcome of [`Harness::verify_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    /// Content id matches the fields and the signer is authorized.
    Valid(Verified),
    /// The stored content id does not match the stored fields.
    ContentIdMismatch { stored: ContentId, computed: ContentId },
    /// The signature does not authorize the record.
    Unauthorized(AuthError),
}

impl EntryStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, EntryStatus::Valid(_))
    }
}

/// Result of re-verifying every ledger entry.
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    /// `(index, status)` for every entry, in index order.
    pub entries: Vec<(u32, EntryStatus)>,
}

impl VerificationReport {
    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|(_, s)| s.is_valid()).count()
    }

    /// Indices of entries that failed verification.
    pub fn failures(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, s)| !s.is_valid())
            .map(|(i, _)| *i)
            .collect()
    }

    pub fn all_valid(&self) -> bool {
        self.entries.iter().all(|(_, s)| s.is_valid())
    }
}

/// The provenance harness.
///
/// Provides a unified API for:
/// - Submitting signed records
/// - Fetching records with read-back verification
/// - Lineage queries over the ledger's contents
/// - Re-verifying the whole ledger
pub struct Harness<L: LedgerClient> {
    /// The ledger backend.
    ledger: Arc<L>,
    /// Local mirror of the ledger's graph.
    graph: ProvenanceGraph,
    /// Configuration.
    config: HarnessConfig,
    /// Serializes the check -> append -> admit sequence.
    submit_lock: Mutex<()>,
}

impl<L: LedgerClient> Harness<L> {
    /// Create a harness over `ledger` with an empty local graph.
    ///
    /// Call [`Harness::sync`] (or use [`Harness::open`]) before querying a
    /// ledger that already has entries.
    pub fn new(ledger: L, config: HarnessConfig) -> Self {
        let graph = ProvenanceGraph::with_packing(config.signers(), config.array_packing);
        Self {
            ledger: Arc::new(ledger),
            graph,
            config,
            submit_lock: Mutex::new(()),
        }
    }

    /// Create a harness and rebuild its graph from the ledger.
    pub async fn open(ledger: L, config: HarnessConfig) -> Result<Self> {
        let harness = Self::new(ledger, config);
        let imported = harness.sync().await?;
        info!(imported, "graph rebuilt from ledger");
        Ok(harness)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn graph(&self) -> &ProvenanceGraph {
        &self.graph
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate a record locally, append it to the ledger, then admit it.
    ///
    /// Rejections from the local graph never reach the ledger. An identical
    /// resubmission returns the original admission without touching the
    /// ledger.
    pub async fn submit(&self, record: ProvenanceRecord, signature: &Signature) -> Result<Admission> {
        let _guard = self.submit_lock.lock().await;
        self.sync_locked().await?;

        let preview = self.graph.check(&record, signature)?;
        if preview.is_duplicate() {
            debug!(index = preview.index(), "resubmission of admitted record");
            return Ok(preview);
        }

        let assigned = self.ledger.append(&record, signature).await?;
        if assigned != preview.index() {
            warn!(
                ledger = assigned,
                local = preview.index(),
                "ledger index diverged from local graph"
            );
            return Err(HarnessError::IndexMismatch {
                ledger: assigned,
                local: preview.index(),
            });
        }

        let admission = self.graph.submit(record, signature)?;
        info!(
            index = admission.index(),
            content_id = %admission.content_id(),
            "record submitted"
        );
        Ok(admission)
    }

    /// Sign a record with `signer` and submit it.
    pub async fn sign_and_submit(
        &self,
        record: ProvenanceRecord,
        signer: &Signer,
    ) -> Result<(Admission, Signature)> {
        let content_id = record.content_id_with(self.config.array_packing);
        let signature = signer.sign(&content_id)?;
        let admission = self.submit(record, &signature).await?;
        Ok((admission, signature))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    /// Fetch a ledger entry.
    ///
    /// With `verify_on_read`, the content id is re-derived from the stored
    /// fields and must match both the ledger's stored id and the local graph,
    /// and the signature must still authorize it.
    pub async fn fetch(&self, index: u32) -> Result<LedgerEntry> {
        let entry = self
            .ledger
            .read(index)
            .await?
            .ok_or(HarnessError::NotFound(index))?;

        if entry.index != index {
            warn!(requested = index, returned = entry.index, "ledger returned the wrong entry");
            return Err(HarnessError::NotFound(index));
        }

        if self.config.verify_on_read {
            self.verify_entry(&entry)?;
        }
        Ok(entry)
    }

    fn verify_entry(&self, entry: &LedgerEntry) -> Result<()> {
        let computed = entry.record.content_id_with(self.config.array_packing);

        if computed != entry.content_id {
            warn!(index = entry.index, stored = %entry.content_id, %computed, "stored content id mismatch");
            return Err(GraphError::ContentIdMismatch {
                index: entry.index,
                stored: entry.content_id,
                computed,
            }
            .into());
        }

        if let Ok(local) = self.graph.content_id(entry.index) {
            if local != computed {
                warn!(index = entry.index, %local, %computed, "ledger record differs from admitted record");
                return Err(GraphError::ContentIdMismatch {
                    index: entry.index,
                    stored: local,
                    computed,
                }
                .into());
            }
        }

        self.graph
            .signers()
            .authorize(&computed, &entry.signature)
            .map_err(|e| {
                warn!(index = entry.index, error = %e, "stored signature no longer authorizes record");
                HarnessError::from(e)
            })?;
        Ok(())
    }

    /// All ancestors of the record at `index`, after catching up with the
    /// ledger.
    pub async fn ancestors(&self, index: u32) -> Result<BTreeSet<u32>> {
        self.sync().await?;
        Ok(self.graph.ancestors(index)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger synchronization
    // ─────────────────────────────────────────────────────────────────────────

    /// Import ledger entries the local graph has not seen yet.
    ///
    /// Every entry is validated as on submission; the first invalid entry
    /// stops the import with [`HarnessError::InvalidEntry`]. Returns the
    /// number of entries imported.
    pub async fn sync(&self) -> Result<usize> {
        let _guard = self.submit_lock.lock().await;
        self.sync_locked().await
    }

    async fn sync_locked(&self) -> Result<usize> {
        let have = u32::try_from(self.graph.len()?).map_err(|_| GraphError::IndexSpaceExhausted)?;
        let total = self.ledger.len().await?;
        if total <= have {
            return Ok(0);
        }

        let entries = self.ledger.read_range(have, total).await?;
        let mut imported = 0;
        for entry in entries {
            let index = entry.index;
            self.graph
                .import(index, entry.record, &entry.signature, Some(entry.content_id))
                .map_err(|source| {
                    warn!(index, error = %source, "ledger entry rejected during sync");
                    HarnessError::InvalidEntry { index, source }
                })?;
            imported += 1;
        }

        debug!(imported, total, "graph synced with ledger");
        Ok(imported)
    }

    /// Re-verify every ledger entry in parallel.
    ///
    /// Unlike [`Harness::sync`], a failing entry does not stop the run: each
    /// entry gets its own status.
    pub async fn verify_all(&self) -> Result<VerificationReport> {
        let total = self.ledger.len().await?;
        let entries = self.ledger.read_range(0, total).await?;

        let signers = self.graph.signers().clone();
        let packing = self.config.array_packing;

        tokio::task::spawn_blocking(move || {
            let items: Vec<(ProvenanceRecord, Signature)> = entries
                .iter()
                .map(|e| (e.record.clone(), e.signature))
                .collect();
            let results = verify_batch(&items, &signers, packing);

            let entries = entries
                .iter()
                .zip(results)
                .map(|(entry, result)| {
                    // A tampered record no longer recovers its signer either;
                    // report the mismatch, which is the root cause.
                    let computed = entry.record.content_id_with(packing);
                    let status = if computed != entry.content_id {
                        EntryStatus::ContentIdMismatch {
                            stored: entry.content_id,
                            computed,
                        }
                    } else {
                        match result {
                            Ok(v) => EntryStatus::Valid(v),
                            Err(e) => EntryStatus::Unauthorized(e),
                        }
                    };
                    (entry.index, status)
                })
                .collect();

            VerificationReport { entries }
        })
        .await
        .map_err(|e| HarnessError::Task(e.to_string()))
    }
}
