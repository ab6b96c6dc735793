//! # Gold Block Testkit
//!
//! Testing utilities for gold block provenance.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Pinned encodings and content ids for cross-implementation checks
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Signers, records and harnesses for setting up test scenarios
//!
//! ## Golden Vectors
//!
//! ```rust
//! use goldblock_testkit::vectors::verify_all_vectors;
//!
//! for result in verify_all_vectors() {
//!     assert!(result.matches, "{} diverged", result.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use goldblock_testkit::generators::{record_from_params, RecordParams};
//!
//! proptest! {
//!     #[test]
//!     fn content_id_is_deterministic(params: RecordParams) {
//!         let r1 = record_from_params(&params);
//!         let r2 = record_from_params(&params);
//!         prop_assert_eq!(r1.content_id(), r2.content_id());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use goldblock_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let (record, signature) = fixture.signed("ORE-0001", &[]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, TestFixture, DEV_ADDRESSES, DEV_KEYS};
