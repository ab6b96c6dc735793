//! # Gold Block
//!
//! The harness for the gold block provenance ledger: records describing
//! production events, linked to their inputs, signed by authorized producers
//! and stored on an append-only ledger.
//!
//! ## Overview
//!
//! - **Records**: immutable production events with ordered parent references
//! - **Content ids**: Keccak-256 over a packed canonical encoding
//! - **Authorization**: recoverable secp256k1 signatures from an allow-list
//! - **Lineage**: a validated DAG of admitted records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use goldblock::{Harness, HarnessConfig, MemoryLedger, RecordBuilder, Signer, U256};
//!
//! async fn example() -> goldblock::Result<()> {
//!     let signer = Signer::generate();
//!     let config = HarnessConfig::default().authorize(signer.address());
//!     let ledger = MemoryLedger::new().with_signers(config.signers());
//!     let harness = Harness::new(ledger, config);
//!
//!     let ore = RecordBuilder::new(b"ORE-0001".to_vec())
//!         .producer(b"AB")
//!         .location(b"shenzhen".to_vec())
//!         .weight(100)
//!         .timestamp(U256::from_u64(1_672_531_200_000))
//!         .build()?;
//!
//!     let (admission, _sig) = harness.sign_and_submit(ore, &signer).await?;
//!     let entry = harness.fetch(admission.index()).await?;
//!     println!("{} -> {}", entry.index, entry.content_id);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `goldblock::core` - Records, encoding, signatures, the lineage graph
//! - `goldblock::ledger` - Ledger client trait and local ledgers

pub mod config;
pub mod error;
pub mod harness;

// Re-export component crates
pub use goldblock_core as core;
pub use goldblock_ledger as ledger;

// Re-export main types for convenience
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use harness::{EntryStatus, Harness, VerificationReport};

// Re-export commonly used types
pub use goldblock_core::{
    Address, Admission, ArrayPacking, AuthorizedSigners, ContentId, ProvenanceGraph,
    ProvenanceRecord, RecordBuilder, Signature, Signer, U256,
};
pub use goldblock_ledger::{LedgerClient, LedgerEntry, MemoryLedger, SqliteLedger};
