//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the packed encoding and content ids so that every
//! implementation hashing the same fields (including the on-chain verifier)
//! agrees byte for byte.

use goldblock_core::{
    encode, encode_with, ArrayPacking, EncodingError, ProvenanceRecord, RecordBuilder,
};
use serde::Serialize;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// What the vector exercises.
    pub description: &'static str,
    /// Record id bytes.
    pub id: &'static [u8],
    /// Producer code.
    pub producer: [u8; 2],
    /// Location bytes.
    pub location: &'static [u8],
    /// Weight.
    pub weight: u32,
    /// Timestamp, decimal.
    pub timestamp: &'static str,
    /// Parent indices, in order.
    pub parent_ids: &'static [u32],
    /// Record-type tag.
    pub kind: u8,
    /// Expected tight encoding (hex).
    pub expected_encoding: &'static str,
    /// Expected content id under tight packing (hex).
    pub expected_content_id: &'static str,
    /// Expected content id under word-aligned packing (hex).
    pub expected_word_aligned_id: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "reference",
            description: "Reference record: one parent at index 0",
            id: b"ABCDEFGH",
            producer: *b"AB",
            location: b"shenzhen",
            weight: 100,
            timestamp: "1672531200000", // 2023-01-01T00:00:00Z
            parent_ids: &[0],
            kind: 0,
            expected_encoding: "414243444546474841427368656e7a68656e00000064000000000000000000000000000000000000000000000000000001856aa0c8000000000000",
            expected_content_id: "5b79fd38f974cfc38603d5277b570c15b5d76afa772af19fd0e8fc58a5f71020",
            expected_word_aligned_id: "0935f7c7b92ba0860294972cdfd8c28b6789a268bc0155fc50977c77523a111f",
        },
        GoldenVector {
            name: "origin",
            description: "Origin record: no parents, so both packings agree",
            id: b"ABCDEFGH",
            producer: *b"AB",
            location: b"shenzhen",
            weight: 100,
            timestamp: "1672531200000",
            parent_ids: &[],
            kind: 0,
            expected_encoding: "414243444546474841427368656e7a68656e00000064000000000000000000000000000000000000000000000000000001856aa0c80000",
            expected_content_id: "3457ce36f54d4083c2cc9c15272c37004af9722ef1964988726ad6b46bff9fe4",
            expected_word_aligned_id: "3457ce36f54d4083c2cc9c15272c37004af9722ef1964988726ad6b46bff9fe4",
        },
        GoldenVector {
            name: "multi_parent",
            description: "Three ordered parents",
            id: b"INGOT-0042",
            producer: *b"ZX",
            location: b"zurich",
            weight: 12500,
            timestamp: "1700000000000",
            parent_ids: &[0, 1, 2],
            kind: 2,
            expected_encoding: "494e474f542d303034325a587a7572696368000030d40000000000000000000000000000000000000000000000000000018bcfe5680000000000000000010000000202",
            expected_content_id: "25a6747dd235e47c47bc85503ab66b3715478a5167883d8ae4a5be95d293e0a8",
            expected_word_aligned_id: "caa3e38095b44319d69a89a031a9f3ba9cccc847a2428b4a970b8794d4cc70d3",
        },
        GoldenVector {
            name: "empty_fields",
            description: "Empty id and location, zero numerics",
            id: b"",
            producer: *b"AB",
            location: b"",
            weight: 0,
            timestamp: "0",
            parent_ids: &[],
            kind: 0,
            expected_encoding: "414200000000000000000000000000000000000000000000000000000000000000000000000000",
            expected_content_id: "4b60d88cb8796df28e63f317a3ec1f44bf02b526f3ee5148bc61490999456f64",
            expected_word_aligned_id: "4b60d88cb8796df28e63f317a3ec1f44bf02b526f3ee5148bc61490999456f64",
        },
        GoldenVector {
            name: "max_widths",
            description: "Every fixed-width field at its maximum",
            id: b"MAX",
            producer: *b"\xff\xff",
            location: b"x",
            weight: u32::MAX,
            timestamp: "115792089237316195423570985008687907853269984665640564039457584007913129639935",
            parent_ids: &[u32::MAX],
            kind: 255,
            expected_encoding: "4d4158ffff78ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
            expected_content_id: "a82c6983080402b57dab9f909c57f6339804ed3c2ab3e56b61e8fe8f667d3557",
            expected_word_aligned_id: "50aec3824c8c26a3abb0d872d05f0c55411303e272d1343ddc4620f743406a87",
        },
        GoldenVector {
            name: "utf8_location",
            description: "Multi-byte UTF-8 location, parents out of order",
            id: b"CN-1",
            producer: *b"SZ",
            location: b"\xe6\xb7\xb1\xe5\x9c\xb3",
            weight: 1,
            timestamp: "1672531200000",
            parent_ids: &[3, 1],
            kind: 1,
            expected_encoding: "434e2d31535ae6b7b1e59cb300000001000000000000000000000000000000000000000000000000000001856aa0c800000000030000000101",
            expected_content_id: "fc83b5f3a9a995cd2796840d8ab794a54b8ba510a381b212f10b90189cd3f058",
            expected_word_aligned_id: "e50e4bd53400b8626dcc16587b982390d33d9cf9348f8496e4619d0a21ab7c46",
        },
    ]
}

/// Build the record a golden vector describes.
pub fn record_from_vector(vector: &GoldenVector) -> Result<ProvenanceRecord, EncodingError> {
    RecordBuilder::new(vector.id.to_vec())
        .producer(&vector.producer)
        .location(vector.location.to_vec())
        .weight(vector.weight as u64)
        .timestamp_dec(vector.timestamp)
        .parents(vector.parent_ids.iter().map(|&p| p as u64))
        .kind(vector.kind)
        .build()
}

/// What an implementation actually produced for one vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VectorResult {
    pub name: String,
    pub matches: bool,
    pub encoding: String,
    pub content_id: String,
    pub word_aligned_id: String,
}

/// Recompute every golden vector and compare against the pinned outputs.
pub fn verify_all_vectors() -> Vec<VectorResult> {
    all_vectors()
        .iter()
        .map(|v| match record_from_vector(v) {
            Ok(record) => {
                let encoding = hex::encode(encode(&record));
                let content_id = record.content_id_with(ArrayPacking::Tight).to_hex();
                let word_aligned_id = record.content_id_with(ArrayPacking::WordAligned).to_hex();
                let matches = encoding == v.expected_encoding
                    && content_id == v.expected_content_id
                    && word_aligned_id == v.expected_word_aligned_id;
                VectorResult {
                    name: v.name.to_string(),
                    matches,
                    encoding,
                    content_id,
                    word_aligned_id,
                }
            }
            Err(e) => VectorResult {
                name: v.name.to_string(),
                matches: false,
                encoding: format!("error: {}", e),
                content_id: String::new(),
                word_aligned_id: String::new(),
            },
        })
        .collect()
}

/// Dump the recomputed vectors as pretty JSON, for sharing with other
/// implementations.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&verify_all_vectors())
}
