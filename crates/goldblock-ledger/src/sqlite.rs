//! SQLite implementation of the LedgerClient trait.
//!
//! The persistent local ledger. It uses rusqlite with bundled SQLite, wrapped
//! in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use goldblock_core::{
    ArrayPacking, AuthorizedSigners, ContentId, ProvenanceRecord, RecordBuilder, Signature,
};

use crate::error::{LedgerError, Result};
use crate::migration;
use crate::traits::{check_append, LedgerClient, LedgerEntry};

const SELECT_ENTRY: &str = "SELECT seq, record_id, producer, location, weight, timestamp,
                                   parent_ids, kind, content_id, signature
                            FROM records";

/// SQLite-based ledger.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteLedger {
    conn: Arc<Mutex<Connection>>,
    packing: ArrayPacking,
    signers: Option<AuthorizedSigners>,
}

impl SqliteLedger {
    /// Open a SQLite ledger at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        info!(path = %path.display(), "opened sqlite ledger");
        Ok(Self::from_conn(conn))
    }

    /// Open an in-memory SQLite ledger.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self::from_conn(conn))
    }

    fn from_conn(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            packing: ArrayPacking::default(),
            signers: None,
        }
    }

    /// Derive content ids with `packing` at append time.
    pub fn with_packing(mut self, packing: ArrayPacking) -> Self {
        self.packing = packing;
        self
    }

    /// Only admit records signed by one of `signers`.
    pub fn with_signers(mut self, signers: AuthorizedSigners) -> Self {
        self.signers = Some(signers);
        self
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| LedgerError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| LedgerError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

/// Raw column values of one `records` row.
struct RawEntry {
    seq: i64,
    record_id: Vec<u8>,
    producer: Vec<u8>,
    location: Vec<u8>,
    weight: i64,
    timestamp: Vec<u8>,
    parent_ids: Vec<u8>,
    kind: i64,
    content_id: Vec<u8>,
    signature: Vec<u8>,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            seq: row.get("seq")?,
            record_id: row.get("record_id")?,
            producer: row.get("producer")?,
            location: row.get("location")?,
            weight: row.get("weight")?,
            timestamp: row.get("timestamp")?,
            parent_ids: row.get("parent_ids")?,
            kind: row.get("kind")?,
            content_id: row.get("content_id")?,
            signature: row.get("signature")?,
        })
    }

    /// Rebuild the entry, re-checking every field width.
    fn into_entry(self) -> Result<LedgerEntry> {
        let index = u32::try_from(self.seq)
            .map_err(|_| LedgerError::InvalidData(format!("sequence index {}", self.seq)))?;
        let weight = u64::try_from(self.weight)
            .map_err(|_| LedgerError::InvalidData(format!("negative weight {}", self.weight)))?;
        let kind = u8::try_from(self.kind)
            .map_err(|_| LedgerError::InvalidData(format!("kind {} exceeds one byte", self.kind)))?;

        let record = RecordBuilder::new(self.record_id)
            .producer(&self.producer)
            .location(self.location)
            .weight(weight)
            .timestamp_be(&self.timestamp)
            .parents(decode_parents(&self.parent_ids)?.into_iter().map(u64::from))
            .kind(kind)
            .build()?;

        let content_id = ContentId::try_from(self.content_id.as_slice())
            .map_err(|_| LedgerError::InvalidData("content_id must be 32 bytes".into()))?;
        let signature = Signature::from_slice(&self.signature)
            .map_err(|e| LedgerError::InvalidData(e.to_string()))?;

        Ok(LedgerEntry {
            index,
            record,
            content_id,
            signature,
        })
    }
}

fn encode_parents(parents: &[u32]) -> Vec<u8> {
    parents.iter().flat_map(|p| p.to_be_bytes()).collect()
}

fn decode_parents(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(LedgerError::InvalidData(format!(
            "parent_ids blob of {} bytes is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn read_entry(
    conn: &Connection,
    sql_filter: &str,
    key: &dyn rusqlite::ToSql,
) -> Result<Option<LedgerEntry>> {
    let sql = format!("{} WHERE {}", SELECT_ENTRY, sql_filter);
    conn.query_row(&sql, params![key], RawEntry::from_row)
        .optional()?
        .map(RawEntry::into_entry)
        .transpose()
}

fn count(conn: &Connection) -> Result<u32> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    u32::try_from(n).map_err(|_| LedgerError::InvalidData(format!("record count {}", n)))
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl LedgerClient for SqliteLedger {
    async fn read(&self, index: u32) -> Result<Option<LedgerEntry>> {
        self.blocking(move |conn| read_entry(conn, "seq = ?1", &(index as i64)))
            .await
    }

    async fn append(&self, record: &ProvenanceRecord, signature: &Signature) -> Result<u32> {
        let record = record.clone();
        let signature = *signature;
        let content_id = record.content_id_with(self.packing);
        let signers = self.signers.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let len = count(&tx)?;
            let id: &[u8] = &record.id;
            let existing = read_entry(&tx, "record_id = ?1", &id)?;
            if let Some(index) = check_append(
                &record,
                &content_id,
                &signature,
                signers.as_ref(),
                existing.as_ref(),
                len,
            )? {
                debug!(index, "ledger append is a resubmission");
                return Ok(index);
            }

            tx.execute(
                "INSERT INTO records (
                    seq, record_id, producer, location, weight, timestamp,
                    parent_ids, kind, content_id, signature, appended_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    len as i64,
                    id,
                    record.producer.as_bytes().as_slice(),
                    record.location.as_ref(),
                    record.weight as i64,
                    record.timestamp.to_be_bytes().as_slice(),
                    encode_parents(&record.parent_ids),
                    record.kind as i64,
                    content_id.as_bytes().as_slice(),
                    signature.as_bytes().as_slice(),
                    now_millis(),
                ],
            )?;
            tx.commit()?;

            Ok(len)
        })
        .await
    }

    async fn len(&self) -> Result<u32> {
        self.blocking(|conn| count(conn)).await
    }

    async fn find(&self, id: &[u8]) -> Result<Option<u32>> {
        let id = id.to_vec();
        self.blocking(move |conn| {
            let seq: Option<i64> = conn
                .query_row(
                    "SELECT seq FROM records WHERE record_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            seq.map(|s| {
                u32::try_from(s)
                    .map_err(|_| LedgerError::InvalidData(format!("sequence index {}", s)))
            })
            .transpose()
        })
        .await
    }

    async fn read_range(&self, start: u32, end: u32) -> Result<Vec<LedgerEntry>> {
        self.blocking(move |conn| {
            let sql = format!("{} WHERE seq >= ?1 AND seq < ?2 ORDER BY seq", SELECT_ENTRY);
            let mut stmt = conn.prepare(&sql)?;
            let raws = stmt
                .query_map(params![start as i64, end as i64], RawEntry::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            raws.into_iter().map(RawEntry::into_entry).collect()
        })
        .await
    }
}
