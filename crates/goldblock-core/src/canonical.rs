//! Packed canonical encoding of provenance records.
//!
//! The layout is a delimiter-free concatenation, in this order:
//!
//! | field        | width     | encoding                         |
//! |--------------|-----------|----------------------------------|
//! | `id`         | variable  | raw bytes                        |
//! | `producer`   | 2         | raw bytes                        |
//! | `location`   | variable  | raw bytes                        |
//! | `weight`     | 4         | big-endian                       |
//! | `timestamp`  | 32        | big-endian                       |
//! | `parent_ids` | 4 per elt | big-endian, no count prefix      |
//! | `kind`       | 1         | single byte                      |
//!
//! Field boundaries are implicit: the consumer must know them from context.
//!
//! **CRITICAL**: This layout is FROZEN. The on-chain verifier hashes the same
//! bytes; any change invalidates every existing signature.

use serde::{Deserialize, Serialize};

use crate::crypto::keccak256;
use crate::record::ProvenanceRecord;
use crate::types::ContentId;

/// Width of one `parent_ids` element under [`ArrayPacking::WordAligned`].
const WORD: usize = 32;

/// How elements of `parent_ids` are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayPacking {
    /// Each element at its declared 4-byte width.
    #[default]
    Tight,
    /// Each element left-padded to a 32-byte word, as `abi.encodePacked` does
    /// for the elements of a dynamic array.
    WordAligned,
}

impl ArrayPacking {
    /// Bytes used per `parent_ids` element.
    pub const fn element_width(self) -> usize {
        match self {
            ArrayPacking::Tight => 4,
            ArrayPacking::WordAligned => WORD,
        }
    }
}

impl ContentId {
    /// Derive the content id of a record.
    pub fn compute(record: &ProvenanceRecord, packing: ArrayPacking) -> Self {
        content_id(record, packing)
    }
}

/// Exact length of the encoding of `record`.
pub fn encoded_len(record: &ProvenanceRecord, packing: ArrayPacking) -> usize {
    record.id.len()
        + 2
        + record.location.len()
        + 4
        + 32
        + record.parent_ids.len() * packing.element_width()
        + 1
}

/// Encode a record with the default tight layout.
pub fn encode(record: &ProvenanceRecord) -> Vec<u8> {
    encode_with(record, ArrayPacking::Tight)
}

/// Encode a record with the given array packing.
pub fn encode_with(record: &ProvenanceRecord, packing: ArrayPacking) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(record, packing));

    buf.extend_from_slice(&record.id);
    buf.extend_from_slice(record.producer.as_bytes());
    buf.extend_from_slice(&record.location);
    buf.extend_from_slice(&record.weight.to_be_bytes());
    buf.extend_from_slice(&record.timestamp.to_be_bytes());

    for parent in &record.parent_ids {
        if packing == ArrayPacking::WordAligned {
            buf.extend_from_slice(&[0u8; WORD - 4]);
        }
        buf.extend_from_slice(&parent.to_be_bytes());
    }

    buf.push(record.kind);
    buf
}

/// Hash an encoded buffer into a content id.
pub fn hash_encoding(encoded: &[u8]) -> ContentId {
    ContentId(keccak256(encoded))
}

/// Encode and hash in one step.
pub fn content_id(record: &ProvenanceRecord, packing: ArrayPacking) -> ContentId {
    hash_encoding(&encode_with(record, packing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordBuilder;
    use crate::types::U256;

    fn reference_record() -> ProvenanceRecord {
        RecordBuilder::new(b"ABCDEFGH".to_vec())
            .producer(b"AB")
            .location(b"shenzhen".to_vec())
            .weight(100)
            .timestamp(U256::from_u64(1_672_531_200_000))
            .parent(0)
            .kind(0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_reference_layout() {
        let bytes = encode(&reference_record());
        assert_eq!(bytes.len(), 59);
        assert_eq!(
            hex::encode(&bytes),
            "414243444546474841427368656e7a68656e00000064\
             00000000000000000000000000000000000000000000000000000185\
             6aa0c800\
             00000000\
             00"
        );
    }

    #[test]
    fn test_reference_digest() {
        assert_eq!(
            content_id(&reference_record(), ArrayPacking::Tight).to_hex(),
            "5b79fd38f974cfc38603d5277b570c15b5d76afa772af19fd0e8fc58a5f71020"
        );
    }

    #[test]
    fn test_word_aligned_layout() {
        let record = reference_record();
        let bytes = encode_with(&record, ArrayPacking::WordAligned);
        assert_eq!(bytes.len(), 87);
        assert_eq!(bytes.len(), encoded_len(&record, ArrayPacking::WordAligned));
        assert!(bytes[54..86].iter().all(|&b| b == 0));
        assert_eq!(
            content_id(&record, ArrayPacking::WordAligned).to_hex(),
            "0935f7c7b92ba0860294972cdfd8c28b6789a268bc0155fc50977c77523a111f"
        );
    }

    #[test]
    fn test_field_offsets() {
        let record = RecordBuilder::new(vec![0xaa])
            .producer(&[0xbb, 0xcc])
            .location(vec![0xdd, 0xee])
            .weight(0x01020304)
            .timestamp(U256::from_u64(0x0506))
            .parents([0x0a0b0c0d, 0x11121314])
            .kind(0x7f)
            .build()
            .unwrap();

        let bytes = encode(&record);
        assert_eq!(bytes.len(), encoded_len(&record, ArrayPacking::Tight));
        assert_eq!(&bytes[0..1], &[0xaa]);
        assert_eq!(&bytes[1..3], &[0xbb, 0xcc]);
        assert_eq!(&bytes[3..5], &[0xdd, 0xee]);
        assert_eq!(&bytes[5..9], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&bytes[9..39][..], &[0u8; 30][..]);
        assert_eq!(&bytes[39..41], &[0x05, 0x06]);
        assert_eq!(&bytes[41..45], &[0x0a, 0x0b, 0x0c, 0x0d]);
        assert_eq!(&bytes[45..49], &[0x11, 0x12, 0x13, 0x14]);
        assert_eq!(bytes[49], 0x7f);
    }

    #[test]
    fn test_empty_parents_and_fields() {
        let record = RecordBuilder::new(Vec::new())
            .producer(b"AB")
            .build()
            .unwrap();
        let bytes = encode(&record);
        assert_eq!(bytes.len(), 2 + 4 + 32 + 1);
    }

    #[test]
    fn test_encoding_deterministic() {
        let record = reference_record();
        assert_eq!(encode(&record), encode(&record));
        assert_eq!(
            content_id(&record, ArrayPacking::Tight),
            content_id(&record, ArrayPacking::Tight)
        );
    }

    #[test]
    fn test_parent_order_changes_digest() {
        let a = RecordBuilder::new(b"x".to_vec())
            .producer(b"AB")
            .parents([1, 2])
            .build()
            .unwrap();
        let mut b = a.clone();
        b.parent_ids.reverse();
        assert_ne!(encode(&a), encode(&b));
        assert_ne!(
            content_id(&a, ArrayPacking::Tight),
            content_id(&b, ArrayPacking::Tight)
        );
    }
}
