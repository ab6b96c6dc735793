//! Proptest generators for property-based testing.

use proptest::prelude::*;

use goldblock_core::{ContentId, ProducerCode, ProvenanceRecord, Signer, U256};

/// Generate a random signer.
///
/// Scalars outside the curve order are vanishingly rare; they fall back to a
/// fixed key rather than failing the strategy.
pub fn signer() -> impl Strategy<Value = Signer> {
    any::<[u8; 32]>().prop_map(|seed| {
        Signer::from_bytes(&seed).unwrap_or_else(|_| {
            let mut fallback = [0u8; 32];
            fallback[31] = 1;
            Signer::from_bytes(&fallback).expect("1 is a valid scalar")
        })
    })
}

/// Generate a random ContentId.
pub fn content_id() -> impl Strategy<Value = ContentId> {
    any::<[u8; 32]>().prop_map(ContentId::from_bytes)
}

/// Generate a record id.
pub fn record_id() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=32)
}

/// Generate a producer code.
pub fn producer() -> impl Strategy<Value = ProducerCode> {
    any::<[u8; 2]>().prop_map(ProducerCode::new)
}

/// Generate location bytes.
pub fn location() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        "[a-z]{0,24}".prop_map(String::into_bytes),
        prop::collection::vec(any::<u8>(), 0..=48),
    ]
}

/// Generate a full-width timestamp.
pub fn timestamp() -> impl Strategy<Value = U256> {
    prop_oneof![
        (0u64..=4_102_444_800_000).prop_map(U256::from_u64),
        any::<[u8; 32]>().prop_map(U256),
    ]
}

/// Generate parent indices.
pub fn parent_ids(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<u32>(), 0..=max_len)
}

/// Parameters for generating a record.
#[derive(Debug, Clone)]
pub struct RecordParams {
    pub id: Vec<u8>,
    pub producer: ProducerCode,
    pub location: Vec<u8>,
    pub weight: u32,
    pub timestamp: U256,
    pub parent_ids: Vec<u32>,
    pub kind: u8,
}

impl Arbitrary for RecordParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            record_id(),
            producer(),
            location(),
            any::<u32>(),
            timestamp(),
            parent_ids(8),
            any::<u8>(),
        )
            .prop_map(
                |(id, producer, location, weight, timestamp, parent_ids, kind)| RecordParams {
                    id,
                    producer,
                    location,
                    weight,
                    timestamp,
                    parent_ids,
                    kind,
                },
            )
            .boxed()
    }
}

/// Generate a record from parameters.
pub fn record_from_params(params: &RecordParams) -> ProvenanceRecord {
    ProvenanceRecord {
        id: params.id.clone().into(),
        producer: params.producer,
        location: params.location.clone().into(),
        weight: params.weight,
        timestamp: params.timestamp,
        parent_ids: params.parent_ids.clone(),
        kind: params.kind,
    }
}

/// Generate a DAG shape: for node `i`, a list of parents drawn from `0..i`.
pub fn dag(max_nodes: usize) -> impl Strategy<Value = Vec<Vec<u32>>> {
    (1..=max_nodes).prop_flat_map(|n| {
        (0..n)
            .map(|i| {
                if i == 0 {
                    Just(Vec::new()).boxed()
                } else {
                    prop::collection::vec(0..i as u32, 0..=3).boxed()
                }
            })
            .collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use goldblock_core::{canonical, recover_signer, sign, verify, ArrayPacking};

    use crate::fixtures::TestFixture;

    proptest! {
        #[test]
        fn test_content_id_deterministic(params: RecordParams) {
            let r1 = record_from_params(&params);
            let r2 = record_from_params(&params);

            prop_assert_eq!(r1.content_id(), r2.content_id());
            prop_assert_eq!(r1.encode(), r2.encode());
        }

        #[test]
        fn test_encoded_len_exact(params: RecordParams) {
            let record = record_from_params(&params);
            for packing in [ArrayPacking::Tight, ArrayPacking::WordAligned] {
                prop_assert_eq!(
                    canonical::encode_with(&record, packing).len(),
                    canonical::encoded_len(&record, packing)
                );
            }
        }

        #[test]
        fn test_weight_change_changes_id(params: RecordParams, other in any::<u32>()) {
            prop_assume!(other != params.weight);
            let a = record_from_params(&params);
            let mut b = a.clone();
            b.weight = other;
            prop_assert_ne!(a.content_id(), b.content_id());
        }

        #[test]
        fn test_parent_reorder_changes_id(params: RecordParams) {
            let a = record_from_params(&params);
            let mut b = a.clone();
            b.parent_ids.reverse();
            prop_assume!(a.parent_ids != b.parent_ids);
            prop_assert_ne!(a.content_id(), b.content_id());
        }

        #[test]
        fn test_kind_change_changes_id(params: RecordParams, other: u8) {
            prop_assume!(other != params.kind);
            let a = record_from_params(&params);
            let mut b = a.clone();
            b.kind = other;
            prop_assert_ne!(a.content_id(), b.content_id());
        }

        #[test]
        fn test_signature_binding(
            key in signer(),
            a in content_id(),
            b in content_id(),
        ) {
            prop_assume!(a != b);
            let sig = sign(&a, &key).unwrap();

            prop_assert_eq!(recover_signer(&a, &sig).unwrap(), key.address());
            prop_assert!(verify(&a, &sig, &key.address()));
            prop_assert!(!verify(&b, &sig, &key.address()));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_ancestors_match_closure(shape in dag(12)) {
            let fixture = TestFixture::new();
            let graph = fixture.graph();

            for (i, parents) in shape.iter().enumerate() {
                let (record, sig) = fixture.signed(&format!("n{}", i), parents);
                prop_assert_eq!(graph.submit(record, &sig).unwrap().index(), i as u32);
            }

            // Reference closure computed in index order; parents precede children.
            let mut closure: Vec<BTreeSet<u32>> = Vec::new();
            for parents in &shape {
                let mut set = BTreeSet::new();
                for &p in parents {
                    set.insert(p);
                    set.extend(closure[p as usize].iter().copied());
                }
                closure.push(set);
            }

            for (i, expected) in closure.iter().enumerate() {
                let got = graph.ancestors(i as u32).unwrap();
                prop_assert!(!got.contains(&(i as u32)));
                prop_assert_eq!(&got, expected);
            }
        }
    }
}
