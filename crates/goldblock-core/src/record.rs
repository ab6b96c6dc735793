//! ProvenanceRecord: one production event in the gold block ledger.
//!
//! A record is immutable once admitted. Lineage is expressed through
//! `parent_ids`, which name the ledger sequence indices of earlier records.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::{self, ArrayPacking};
use crate::error::EncodingError;
use crate::types::{ContentId, ProducerCode, U256};

/// A production event with its lineage references.
///
/// Every field is already constrained to its wire width, so a constructed
/// record always encodes. Use [`RecordBuilder`] to build one from wider or
/// untrusted inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Caller-chosen unique id. Not the content id.
    pub id: Bytes,

    /// Producing entity.
    pub producer: ProducerCode,

    /// Location text as raw bytes.
    pub location: Bytes,

    /// Mass units.
    pub weight: u32,

    /// Epoch milliseconds, ledger-native width.
    pub timestamp: U256,

    /// Sequence indices of parent records. Order is part of the encoding.
    pub parent_ids: Vec<u32>,

    /// Opaque record-type tag (`type` on the ledger).
    pub kind: u8,
}

impl ProvenanceRecord {
    /// Compute the content id under the default tight layout.
    pub fn content_id(&self) -> ContentId {
        self.content_id_with(ArrayPacking::Tight)
    }

    /// Compute the content id under the given array packing.
    pub fn content_id_with(&self, packing: ArrayPacking) -> ContentId {
        canonical::content_id(self, packing)
    }

    /// The canonical bytes under the default tight layout.
    pub fn encode(&self) -> Vec<u8> {
        canonical::encode(self)
    }

    /// A record with no parents starts a lineage.
    pub fn is_origin(&self) -> bool {
        self.parent_ids.is_empty()
    }

    /// Location as text, if it is valid UTF-8.
    pub fn location_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.location).ok()
    }
}

/// Builder for records from wide or untrusted inputs.
///
/// Width violations are collected and reported by [`RecordBuilder::build`].
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    id: Bytes,
    producer: Vec<u8>,
    location: Bytes,
    weight: u64,
    timestamp: Result<U256, EncodingError>,
    parent_ids: Vec<u64>,
    kind: u8,
}

impl RecordBuilder {
    /// Start building a record with the given id.
    pub fn new(id: impl Into<Bytes>) -> Self {
        Self {
            id: id.into(),
            producer: Vec::new(),
            location: Bytes::new(),
            weight: 0,
            timestamp: Ok(U256::ZERO),
            parent_ids: Vec::new(),
            kind: 0,
        }
    }

    /// Set the producer code (must end up exactly 2 bytes).
    pub fn producer(mut self, code: &[u8]) -> Self {
        self.producer = code.to_vec();
        self
    }

    /// Set the location bytes.
    pub fn location(mut self, location: impl Into<Bytes>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the weight (must fit in 32 bits).
    pub fn weight(mut self, weight: u64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, ts: U256) -> Self {
        self.timestamp = Ok(ts);
        self
    }

    /// Set the timestamp from big-endian bytes of any length.
    pub fn timestamp_be(mut self, bytes: &[u8]) -> Self {
        self.timestamp = U256::from_be_slice(bytes);
        self
    }

    /// Set the timestamp from a decimal literal.
    pub fn timestamp_dec(mut self, literal: &str) -> Self {
        self.timestamp = U256::from_dec_str(literal);
        self
    }

    /// Append a parent index (must fit in 32 bits).
    pub fn parent(mut self, index: u64) -> Self {
        self.parent_ids.push(index);
        self
    }

    /// Append several parent indices, keeping their order.
    pub fn parents(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.parent_ids.extend(indices);
        self
    }

    /// Set the record-type tag.
    pub fn kind(mut self, kind: u8) -> Self {
        self.kind = kind;
        self
    }

    /// Validate widths and build the record.
    pub fn build(self) -> Result<ProvenanceRecord, EncodingError> {
        let producer = ProducerCode::from_slice(&self.producer)?;
        let weight =
            u32::try_from(self.weight).map_err(|_| EncodingError::WeightOverflow(self.weight))?;
        let timestamp = self.timestamp?;

        let parent_ids = self
            .parent_ids
            .iter()
            .enumerate()
            .map(|(position, &value)| {
                u32::try_from(value).map_err(|_| EncodingError::ParentOverflow { position, value })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ProvenanceRecord {
            id: self.id,
            producer,
            location: self.location,
            weight,
            timestamp,
            parent_ids,
            kind: self.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RecordBuilder {
        RecordBuilder::new(b"ABCDEFGH".to_vec())
            .producer(b"AB")
            .location(b"shenzhen".to_vec())
            .weight(100)
            .timestamp(U256::from_u64(1_672_531_200_000))
    }

    #[test]
    fn test_builder() {
        let record = base().parent(0).kind(3).build().unwrap();
        assert_eq!(record.id.as_ref(), b"ABCDEFGH");
        assert_eq!(record.producer, ProducerCode::new(*b"AB"));
        assert_eq!(record.location_str(), Some("shenzhen"));
        assert_eq!(record.weight, 100);
        assert_eq!(record.parent_ids, vec![0]);
        assert_eq!(record.kind, 3);
        assert!(!record.is_origin());
    }

    #[test]
    fn test_weight_overflow() {
        let err = base().weight(u32::MAX as u64 + 1).build().unwrap_err();
        assert_eq!(err, EncodingError::WeightOverflow(u32::MAX as u64 + 1));

        assert!(base().weight(u32::MAX as u64).build().is_ok());
    }

    #[test]
    fn test_parent_overflow_reports_position() {
        let err = base()
            .parents([0, 1, u32::MAX as u64 + 5])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            EncodingError::ParentOverflow {
                position: 2,
                value: u32::MAX as u64 + 5
            }
        );
    }

    #[test]
    fn test_timestamp_overflow() {
        let mut wide = vec![0u8; 33];
        wide[0] = 1;
        let err = base().timestamp_be(&wide).build().unwrap_err();
        assert_eq!(err, EncodingError::TimestampOverflow(33));

        let ok = base().timestamp_be(&[0xff; 32]).build().unwrap();
        assert_eq!(ok.timestamp, U256::MAX);
    }

    #[test]
    fn test_timestamp_decimal() {
        let record = base().timestamp_dec("1672531200000").build().unwrap();
        assert_eq!(record.timestamp, U256::from_u64(1_672_531_200_000));

        assert!(matches!(
            base().timestamp_dec("soon").build(),
            Err(EncodingError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_producer_must_be_two_bytes() {
        assert_eq!(
            base().producer(b"A").build().unwrap_err(),
            EncodingError::ProducerWidth(1)
        );
    }

    #[test]
    fn test_content_id_deterministic() {
        let a = base().parent(0).build().unwrap();
        let b = base().parent(0).build().unwrap();
        assert_eq!(a.content_id(), b.content_id());
    }

    #[test]
    fn test_every_field_changes_content_id() {
        let original = base().parents([0, 1]).kind(1).build().unwrap();
        let id = original.content_id();

        let mut variants = Vec::new();

        let mut r = original.clone();
        r.id = Bytes::from_static(b"ABCDEFGI");
        variants.push(r);

        let mut r = original.clone();
        r.producer = ProducerCode::new(*b"AC");
        variants.push(r);

        let mut r = original.clone();
        r.location = Bytes::from_static(b"shanghai");
        variants.push(r);

        let mut r = original.clone();
        r.weight += 1;
        variants.push(r);

        let mut r = original.clone();
        r.timestamp = U256::from_u64(1_672_531_200_001);
        variants.push(r);

        let mut r = original.clone();
        r.parent_ids.reverse();
        variants.push(r);

        let mut r = original.clone();
        r.parent_ids.pop();
        variants.push(r);

        let mut r = original.clone();
        r.kind = 2;
        variants.push(r);

        for variant in variants {
            assert_ne!(variant.content_id(), id, "variant {:?} collided", variant);
        }
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let record = base().parents([0, 2]).build().unwrap();
        let json = serde_json::to_string(&record).unwrap();
        let back: ProvenanceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
