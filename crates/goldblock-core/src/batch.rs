//! Parallel signature verification over many records.
//!
//! Verification is pure and independent per item, so the batch is split into
//! contiguous chunks, one per worker thread. Results come back in input order.

use std::num::NonZeroUsize;
use std::thread;

use crate::auth::AuthorizedSigners;
use crate::canonical::ArrayPacking;
use crate::crypto::Signature;
use crate::error::AuthError;
use crate::record::ProvenanceRecord;
use crate::types::{Address, ContentId};

/// Below this many items the batch is verified on the calling thread.
const PARALLEL_THRESHOLD: usize = 32;

/// A record whose signature checked out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verified {
    pub content_id: ContentId,
    pub signer: Address,
}

/// Verify a single record against the authorized set.
pub fn verify_one(
    record: &ProvenanceRecord,
    signature: &Signature,
    signers: &AuthorizedSigners,
    packing: ArrayPacking,
) -> Result<Verified, AuthError> {
    let content_id = record.content_id_with(packing);
    let signer = signers.authorize(&content_id, signature)?;
    Ok(Verified { content_id, signer })
}

/// Verify every `(record, signature)` pair.
///
/// One outcome per item, in input order. A failure affects only its own slot.
pub fn verify_batch(
    items: &[(ProvenanceRecord, Signature)],
    signers: &AuthorizedSigners,
    packing: ArrayPacking,
) -> Vec<Result<Verified, AuthError>> {
    let workers = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);

    if items.len() < PARALLEL_THRESHOLD || workers == 1 {
        return verify_chunk(items, signers, packing);
    }

    let chunk_size = items.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = items
            .chunks(chunk_size)
            .map(|chunk| scope.spawn(move || verify_chunk(chunk, signers, packing)))
            .collect();

        let mut out = Vec::with_capacity(items.len());
        for handle in handles {
            match handle.join() {
                Ok(results) => out.extend(results),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        out
    })
}

fn verify_chunk(
    chunk: &[(ProvenanceRecord, Signature)],
    signers: &AuthorizedSigners,
    packing: ArrayPacking,
) -> Vec<Result<Verified, AuthError>> {
    chunk
        .iter()
        .map(|(record, sig)| verify_one(record, sig, signers, packing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::sign;
    use crate::crypto::Signer;
    use crate::record::RecordBuilder;

    fn record(n: u64) -> ProvenanceRecord {
        RecordBuilder::new(format!("block-{}", n).into_bytes())
            .producer(b"ZX")
            .location(b"zurich".to_vec())
            .weight(n)
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_batch() {
        let signers = AuthorizedSigners::new();
        assert!(verify_batch(&[], &signers, ArrayPacking::Tight).is_empty());
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_failures() {
        let admin = Signer::generate();
        let outsider = Signer::generate();
        let signers: AuthorizedSigners = [admin.address()].into_iter().collect();

        let items: Vec<_> = (0..100)
            .map(|n| {
                let r = record(n);
                let key = if n % 7 == 3 { &outsider } else { &admin };
                let sig = sign(&r.content_id(), key).unwrap();
                (r, sig)
            })
            .collect();

        let results = verify_batch(&items, &signers, ArrayPacking::Tight);
        assert_eq!(results.len(), items.len());

        for (n, ((record, _), result)) in items.iter().zip(&results).enumerate() {
            if n % 7 == 3 {
                assert_eq!(
                    result,
                    &Err(AuthError::UnauthorizedSubmission(outsider.address()))
                );
            } else {
                let verified = result.as_ref().unwrap();
                assert_eq!(verified.content_id, record.content_id());
                assert_eq!(verified.signer, admin.address());
            }
        }
    }

    #[test]
    fn test_batch_matches_sequential() {
        let admin = Signer::generate();
        let signers: AuthorizedSigners = [admin.address()].into_iter().collect();

        let items: Vec<_> = (0..64)
            .map(|n| {
                let r = record(n);
                let sig = if n % 5 == 0 {
                    Signature::ZERO
                } else {
                    sign(&r.content_id(), &admin).unwrap()
                };
                (r, sig)
            })
            .collect();

        let parallel = verify_batch(&items, &signers, ArrayPacking::Tight);
        let sequential: Vec<_> = items
            .iter()
            .map(|(r, s)| verify_one(r, s, &signers, ArrayPacking::Tight))
            .collect();
        assert_eq!(parallel, sequential);
    }
}
