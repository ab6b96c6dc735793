//! ProvenanceGraph: the admitted records and their parent edges.
//!
//! Records are assigned sequence indices in admission order, starting at 0.
//! Parents are referenced by index and must already be admitted, which keeps
//! the edge relation acyclic. Traversals still check for cycles and poison the
//! graph if one is ever found.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::auth::AuthorizedSigners;
use crate::canonical::ArrayPacking;
use crate::crypto::Signature;
use crate::error::GraphError;
use crate::record::ProvenanceRecord;
use crate::types::{Address, ContentId};

/// An admitted record with everything derived at admission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    /// Sequence index assigned at admission.
    pub index: u32,
    /// The record fields.
    pub record: ProvenanceRecord,
    /// Content id under the graph's packing.
    pub content_id: ContentId,
    /// Address recovered from the signature.
    pub signer: Address,
    /// The authorizing signature.
    pub signature: Signature,
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The record was new and has been inserted.
    Accepted { index: u32, content_id: ContentId },
    /// An identical record was already admitted; nothing changed.
    Duplicate { index: u32, content_id: ContentId },
}

impl Admission {
    pub fn index(&self) -> u32 {
        match self {
            Admission::Accepted { index, .. } | Admission::Duplicate { index, .. } => *index,
        }
    }

    pub fn content_id(&self) -> ContentId {
        match self {
            Admission::Accepted { content_id, .. } | Admission::Duplicate { content_id, .. } => {
                *content_id
            }
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Admission::Duplicate { .. })
    }
}

/// The provenance DAG.
///
/// Mutation is serialized behind a single write lock covering every check and
/// the insert, so concurrent submissions cannot slip a duplicate id or a
/// dangling parent past each other. Queries share a read lock.
pub struct ProvenanceGraph {
    signers: AuthorizedSigners,
    packing: ArrayPacking,
    inner: RwLock<GraphInner>,
    corrupted: AtomicBool,
}

#[derive(Default)]
struct GraphInner {
    /// Nodes by sequence index.
    nodes: Vec<GraphNode>,

    /// Record id -> sequence index.
    by_id: HashMap<Bytes, u32>,

    /// Child adjacency, by parent index.
    children: Vec<Vec<u32>>,
}

/// Admission checks that passed, ready to be committed.
struct Checked {
    content_id: ContentId,
    signer: Address,
}

impl ProvenanceGraph {
    /// Create an empty graph that admits records signed by `signers`.
    pub fn new(signers: AuthorizedSigners) -> Self {
        Self::with_packing(signers, ArrayPacking::default())
    }

    /// Create an empty graph with a specific array packing.
    pub fn with_packing(signers: AuthorizedSigners, packing: ArrayPacking) -> Self {
        Self {
            signers,
            packing,
            inner: RwLock::new(GraphInner::default()),
            corrupted: AtomicBool::new(false),
        }
    }

    pub fn packing(&self) -> ArrayPacking {
        self.packing
    }

    pub fn signers(&self) -> &AuthorizedSigners {
        &self.signers
    }

    /// Whether corruption has been detected. A corrupted graph refuses all
    /// mutation.
    pub fn is_corrupted(&self) -> bool {
        self.corrupted.load(Ordering::SeqCst)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and admit a record.
    ///
    /// 1. An existing id with identical fields is a no-op; with different
    ///    fields it is a `DuplicateIdConflict`.
    /// 2. Every parent index must already be assigned.
    /// 3. The content id is derived from the fields.
    /// 4. The signature must recover to an authorized signer.
    /// 5. The record is inserted at the next index.
    ///
    /// Nothing is committed unless every step passes.
    pub fn submit(
        &self,
        record: ProvenanceRecord,
        signature: &Signature,
    ) -> Result<Admission, GraphError> {
        let mut inner = self.write()?;

        if let Some(existing) = inner.existing_admission(&record)? {
            debug!(index = existing.index(), "duplicate submission ignored");
            return Ok(existing);
        }

        let checked = self.check_new(&inner, &record, signature)?;
        let index = inner.next_index()?;
        Ok(self.commit(&mut inner, index, record, *signature, checked))
    }

    /// Dry run of [`ProvenanceGraph::submit`]: report what it would return
    /// without changing anything. `Accepted` carries the index the record
    /// would receive.
    pub fn check(
        &self,
        record: &ProvenanceRecord,
        signature: &Signature,
    ) -> Result<Admission, GraphError> {
        let inner = self.read()?;

        if let Some(existing) = inner.existing_admission(record)? {
            return Ok(existing);
        }

        let checked = self.check_new(&inner, record, signature)?;
        Ok(Admission::Accepted {
            index: inner.next_index()?,
            content_id: checked.content_id,
        })
    }

    /// Replay a ledger entry at its ledger-assigned index.
    ///
    /// Used to rebuild the graph from a ledger. Indices must arrive
    /// contiguously, and when the ledger stored a content id it must match
    /// the one derived from the fields.
    pub fn import(
        &self,
        index: u32,
        record: ProvenanceRecord,
        signature: &Signature,
        stored: Option<ContentId>,
    ) -> Result<Admission, GraphError> {
        let mut inner = self.write()?;

        let expected = inner.next_index()?;
        if index != expected {
            return Err(GraphError::OutOfOrder {
                expected,
                got: index,
            });
        }

        if let Some(&existing) = inner.by_id.get(&record.id) {
            return Err(GraphError::DuplicateIdConflict {
                id: hex::encode(&record.id),
                index: existing,
            });
        }

        let checked = self.check_new(&inner, &record, signature)?;
        if let Some(stored) = stored {
            if stored != checked.content_id {
                warn!(
                    index,
                    %stored,
                    computed = %checked.content_id,
                    "ledger content id does not match record fields"
                );
                return Err(GraphError::ContentIdMismatch {
                    index,
                    stored,
                    computed: checked.content_id,
                });
            }
        }

        Ok(self.commit(&mut inner, index, record, *signature, checked))
    }

    /// Steps 2-4 of admission.
    fn check_new(
        &self,
        inner: &GraphInner,
        record: &ProvenanceRecord,
        signature: &Signature,
    ) -> Result<Checked, GraphError> {
        self.ensure_healthy()?;

        for &parent in &record.parent_ids {
            if parent as usize >= inner.nodes.len() {
                return Err(GraphError::UnknownParent { parent });
            }
        }

        let content_id = record.content_id_with(self.packing);

        let signer = self.signers.authorize(&content_id, signature).map_err(|e| {
            warn!(content_id = %content_id, error = %e, "record authorization rejected");
            GraphError::from(e)
        })?;

        Ok(Checked { content_id, signer })
    }

    fn commit(
        &self,
        inner: &mut GraphInner,
        index: u32,
        record: ProvenanceRecord,
        signature: Signature,
        checked: Checked,
    ) -> Admission {
        for &parent in &record.parent_ids {
            if let Some(children) = inner.children.get_mut(parent as usize) {
                if !children.contains(&index) {
                    children.push(index);
                }
            }
        }

        inner.by_id.insert(record.id.clone(), index);
        inner.children.push(Vec::new());
        inner.nodes.push(GraphNode {
            index,
            record,
            content_id: checked.content_id,
            signer: checked.signer,
            signature,
        });

        info!(index, content_id = %checked.content_id, signer = %checked.signer, "record admitted");

        Admission::Accepted {
            index,
            content_id: checked.content_id,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of admitted records. A poisoned lock is `GraphCorruption`.
    pub fn len(&self) -> Result<usize, GraphError> {
        Ok(self.read()?.nodes.len())
    }

    pub fn is_empty(&self) -> Result<bool, GraphError> {
        Ok(self.len()? == 0)
    }

    /// Get an admitted record by index.
    pub fn get(&self, index: u32) -> Result<GraphNode, GraphError> {
        let inner = self.read()?;
        inner
            .nodes
            .get(index as usize)
            .cloned()
            .ok_or(GraphError::UnknownIndex(index))
    }

    /// Look up the index assigned to a record id.
    pub fn index_of(&self, id: &[u8]) -> Result<Option<u32>, GraphError> {
        Ok(self.read()?.by_id.get(id).copied())
    }

    /// Content id of the record at `index`.
    pub fn content_id(&self, index: u32) -> Result<ContentId, GraphError> {
        let inner = self.read()?;
        inner
            .nodes
            .get(index as usize)
            .map(|n| n.content_id)
            .ok_or(GraphError::UnknownIndex(index))
    }

    /// Indices of records with no parents.
    pub fn roots(&self) -> Result<Vec<u32>, GraphError> {
        let inner = self.read()?;
        Ok(inner
            .nodes
            .iter()
            .filter(|n| n.record.is_origin())
            .map(|n| n.index)
            .collect())
    }

    /// Direct children of `index`, in admission order.
    pub fn children(&self, index: u32) -> Result<Vec<u32>, GraphError> {
        let inner = self.read()?;
        inner
            .children
            .get(index as usize)
            .cloned()
            .ok_or(GraphError::UnknownIndex(index))
    }

    /// All records reachable from `index` through parent edges.
    ///
    /// Never contains `index` itself. A cycle or a dangling edge means the
    /// graph is corrupted: the graph is poisoned and `GraphCorruption`
    /// returned.
    pub fn ancestors(&self, index: u32) -> Result<BTreeSet<u32>, GraphError> {
        let inner = self.read()?;
        if index as usize >= inner.nodes.len() {
            return Err(GraphError::UnknownIndex(index));
        }
        inner.ancestors(index).map_err(|e| self.poison(e))
    }

    /// Walk every node and confirm the graph is a DAG with no dangling edges.
    pub fn check_integrity(&self) -> Result<(), GraphError> {
        let inner = self.read()?;
        for node in &inner.nodes {
            inner.ancestors(node.index).map_err(|e| self.poison(e))?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn ensure_healthy(&self) -> Result<(), GraphError> {
        if self.is_corrupted() {
            return Err(GraphError::GraphCorruption(
                "graph was poisoned by an earlier integrity failure".into(),
            ));
        }
        Ok(())
    }

    fn poison(&self, e: GraphError) -> GraphError {
        if e.is_fatal() {
            error!(error = %e, "provenance graph corrupted, refusing further mutation");
            self.corrupted.store(true, Ordering::SeqCst);
        }
        e
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, GraphInner>, GraphError> {
        self.inner
            .read()
            .map_err(|_| self.poison(GraphError::GraphCorruption("graph lock poisoned".into())))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, GraphInner>, GraphError> {
        self.ensure_healthy()?;
        self.inner
            .write()
            .map_err(|_| self.poison(GraphError::GraphCorruption("graph lock poisoned".into())))
    }

    #[cfg(test)]
    fn inject_parent(&self, child: u32, parent: u32) {
        let mut inner = self.inner.write().unwrap();
        inner.nodes[child as usize].record.parent_ids.push(parent);
    }
}

impl GraphInner {
    fn next_index(&self) -> Result<u32, GraphError> {
        u32::try_from(self.nodes.len()).map_err(|_| GraphError::IndexSpaceExhausted)
    }

    /// Step 1 of admission: detect a resubmission of an existing id.
    fn existing_admission(
        &self,
        record: &ProvenanceRecord,
    ) -> Result<Option<Admission>, GraphError> {
        let Some(&index) = self.by_id.get(&record.id) else {
            return Ok(None);
        };
        let existing = self.nodes.get(index as usize).ok_or_else(|| {
            GraphError::GraphCorruption(format!("id index points at missing node {}", index))
        })?;

        if existing.record == *record {
            Ok(Some(Admission::Duplicate {
                index,
                content_id: existing.content_id,
            }))
        } else {
            Err(GraphError::DuplicateIdConflict {
                id: hex::encode(&record.id),
                index,
            })
        }
    }

    /// Iterative depth-first walk over parent edges.
    ///
    /// Nodes on the current path are `Open`; meeting an `Open` node again is a
    /// cycle. Every node is expanded at most once, so the walk terminates on
    /// any edge set.
    fn ancestors(&self, start: u32) -> Result<BTreeSet<u32>, GraphError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Open,
            Done,
        }

        let mut marks: HashMap<u32, Mark> = HashMap::new();
        // (node, position of the next parent to visit)
        let mut stack: Vec<(u32, usize)> = vec![(start, 0)];
        marks.insert(start, Mark::Open);

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            let parents = &self
                .nodes
                .get(node as usize)
                .ok_or_else(|| {
                    GraphError::GraphCorruption(format!("edge to unassigned index {}", node))
                })?
                .record
                .parent_ids;

            if let Some(&parent) = parents.get(next) {
                top.1 += 1;
                match marks.get(&parent) {
                    Some(Mark::Open) => {
                        return Err(GraphError::GraphCorruption(format!(
                            "cycle through index {} reached from {}",
                            parent, start
                        )));
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(parent, Mark::Open);
                        stack.push((parent, 0));
                    }
                }
            } else {
                marks.insert(node, Mark::Done);
                stack.pop();
            }
        }

        marks.remove(&start);
        Ok(marks.into_keys().collect())
    }
}
