//! # Gold Block Core
//!
//! Pure primitives for gold block provenance: records, canonical encoding,
//! content ids, signer authorization, and the lineage graph.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! deterministic computation, except key generation.
//!
//! ## Key Types
//!
//! - [`ProvenanceRecord`] - One production event and its parent references
//! - [`ContentId`] - Keccak-256 of the packed canonical encoding
//! - [`Signature`] - 65-byte recoverable secp256k1 signature
//! - [`AuthorizedSigners`] - The addresses allowed to admit records
//! - [`ProvenanceGraph`] - Validated DAG of admitted records
//!
//! ## Canonicalization
//!
//! Records are hashed over a delimiter-free packed layout. See [`canonical`].

pub mod auth;
pub mod batch;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod graph;
pub mod record;
pub mod types;

pub use auth::{recover_signer, sign, signed_message_hash, verify, AuthorizedSigners};
pub use batch::{verify_batch, verify_one, Verified};
pub use canonical::{encode, encode_with, ArrayPacking};
pub use crypto::{keccak256, Signature, Signer};
pub use error::{AuthError, EncodingError, GraphError};
pub use graph::{Admission, GraphNode, ProvenanceGraph};
pub use record::{ProvenanceRecord, RecordBuilder};
pub use types::{Address, ContentId, ProducerCode, U256};
