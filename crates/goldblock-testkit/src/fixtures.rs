//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use goldblock::{Harness, HarnessConfig};
use goldblock_core::{
    Address, ArrayPacking, AuthorizedSigners, ProvenanceGraph, ProvenanceRecord, RecordBuilder,
    Signature, Signer, U256,
};
use goldblock_ledger::MemoryLedger;

/// Well-known development keys (the default accounts of local EVM nodes).
///
/// Public knowledge; never use them outside tests.
pub const DEV_KEYS: [&str; 2] = [
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
    "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d",
];

/// Addresses of [`DEV_KEYS`], in the same order.
pub const DEV_ADDRESSES: [&str; 2] = [
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
    "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
];

/// Timestamp used by fixture records (2023-01-01T00:00:00Z).
pub const FIXTURE_TIMESTAMP: u64 = 1_672_531_200_000;

/// A test fixture with a signer authorized to admit records.
pub struct TestFixture {
    pub signer: Signer,
    pub packing: ArrayPacking,
}

impl TestFixture {
    /// Create a new test fixture with a random signer.
    pub fn new() -> Self {
        Self {
            signer: Signer::generate(),
            packing: ArrayPacking::default(),
        }
    }

    /// Create with a deterministic signer from seed.
    ///
    /// Panics if the seed is not a valid secp256k1 scalar.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            signer: Signer::from_bytes(&seed).expect("seed is not a valid secret key"),
            packing: ArrayPacking::default(),
        }
    }

    /// Create with one of the [`DEV_KEYS`].
    pub fn dev(index: usize) -> Self {
        Self {
            signer: Signer::from_hex(DEV_KEYS[index]).expect("dev key parses"),
            packing: ArrayPacking::default(),
        }
    }

    /// Use a different array packing for signing.
    pub fn with_packing(mut self, packing: ArrayPacking) -> Self {
        self.packing = packing;
        self
    }

    /// The signer's address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// A signer set containing only this fixture's signer.
    pub fn signers(&self) -> AuthorizedSigners {
        [self.address()].into_iter().collect()
    }

    /// A harness config authorizing this fixture's signer.
    pub fn config(&self) -> HarnessConfig {
        HarnessConfig {
            array_packing: self.packing,
            ..HarnessConfig::default()
        }
        .authorize(self.address())
    }

    /// An empty graph authorizing this fixture's signer.
    pub fn graph(&self) -> ProvenanceGraph {
        ProvenanceGraph::with_packing(self.signers(), self.packing)
    }

    /// A harness over a fresh in-memory ledger admitting the same signers.
    pub fn harness(&self) -> Harness<MemoryLedger> {
        let ledger = MemoryLedger::with_packing(self.packing).with_signers(self.signers());
        Harness::new(ledger, self.config())
    }

    /// A record with standard field values and the given parents.
    pub fn record(&self, id: &str, parents: &[u32]) -> ProvenanceRecord {
        RecordBuilder::new(id.as_bytes().to_vec())
            .producer(b"AB")
            .location(b"shenzhen".to_vec())
            .weight(100)
            .timestamp(U256::from_u64(FIXTURE_TIMESTAMP))
            .parents(parents.iter().map(|&p| p as u64))
            .build()
            .expect("fixture fields fit their widths")
    }

    /// Sign a record under this fixture's packing.
    pub fn sign(&self, record: &ProvenanceRecord) -> Signature {
        self.signer
            .sign(&record.content_id_with(self.packing))
            .expect("signing a fixture record")
    }

    /// Build and sign a record in one step.
    pub fn signed(&self, id: &str, parents: &[u32]) -> (ProvenanceRecord, Signature) {
        let record = self.record(id, parents);
        let signature = self.sign(&record);
        (record, signature)
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[31] = (i as u8).wrapping_add(1);
            seed[0] = 0x10;
            TestFixture::with_seed(seed)
        })
        .collect()
}
