//! # Gold Block Ledger
//!
//! The ledger collaborator behind the harness. Provides the [`LedgerClient`]
//! trait plus local implementations with the same admission rules as the
//! on-chain contract.
//!
//! ## Key Types
//!
//! - [`LedgerClient`] - The async trait for ledger reads and appends
//! - [`SqliteLedger`] - SQLite-based persistent ledger
//! - [`MemoryLedger`] - In-memory ledger for tests
//! - [`LedgerEntry`] - A stored record with its index, content id and signature
//!
//! ## Usage
//!
//! ```rust,no_run
//! use goldblock_ledger::{LedgerClient, SqliteLedger};
//!
//! async fn example() -> goldblock_ledger::Result<()> {
//!     let ledger = SqliteLedger::open("goldblock.db")?;
//!     if let Some(entry) = ledger.read(0).await? {
//!         println!("{} -> {}", entry.index, entry.content_id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent appends**: the same record twice returns the same index
//! - **Same admission rules as the graph**: id uniqueness, parent existence
//!   and a recoverable signature, restricted to a signer set when one is
//!   given with `with_signers`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{LedgerError, Result};
pub use memory::MemoryLedger;
pub use sqlite::SqliteLedger;
pub use traits::{LedgerClient, LedgerEntry};
