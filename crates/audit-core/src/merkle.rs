//! Merkle membership and consistency verification.
//!
//! The typed functions return plain booleans. The `_proof` variants take the
//! optional wire strings carried by service responses and produce verdicts:
//! an absent proof is `NotVerified`, while a malformed or non-matching proof
//! is `Failed`.

use audit_canonical::Hash;
use tracing::debug;

use crate::proof::{ConsistencyProof, MembershipProof, Side};
use crate::verification::Verification;

/// Folds `leaf` up the proof path and compares the result with `root`.
pub fn verify_membership(root: &Hash, leaf: &Hash, proof: &MembershipProof) -> bool {
    let computed = proof.items().iter().fold(*leaf, |acc, item| match item.side {
        Side::Left => item.hash.pair().with(&acc),
        Side::Right => acc.pair().with(&item.hash),
    });
    computed == *root
}

/// Checks that `new_root` is an append-only extension of `old_root`.
///
/// The subroots, paired right to left, must rebuild `old_root`; only then is
/// each subroot's membership in `new_root` checked.
pub fn verify_consistency(old_root: &Hash, new_root: &Hash, proof: &ConsistencyProof) -> bool {
    let mut items = proof.items().iter();
    let Some(first) = items.next() else {
        return false;
    };

    let rebuilt = items.fold(first.subroot, |acc, item| item.subroot.pair().with(&acc));
    if rebuilt != *old_root {
        debug!(expected = %old_root, rebuilt = %rebuilt, "consistency proof does not rebuild old root");
        return false;
    }

    proof
        .items()
        .iter()
        .all(|item| verify_membership(new_root, &item.subroot, &item.membership))
}

/// Verdict form of [`verify_membership`] over a wire proof string.
pub fn verify_membership_proof(root: &Hash, leaf: &Hash, proof: Option<&str>) -> Verification {
    let Some(proof) = proof else {
        return Verification::NotVerified;
    };

    match MembershipProof::parse(proof) {
        Ok(parsed) => Verification::from_outcome(verify_membership(root, leaf, &parsed)),
        Err(err) => {
            debug!(error = %err, "membership proof rejected at parse");
            Verification::Failed
        }
    }
}

/// Verdict form of [`verify_consistency`] over wire proof items.
pub fn verify_consistency_proof<S: AsRef<str>>(
    old_root: &Hash,
    new_root: &Hash,
    proof: Option<&[S]>,
) -> Verification {
    let Some(proof) = proof else {
        return Verification::NotVerified;
    };

    match ConsistencyProof::parse(proof) {
        Ok(parsed) => Verification::from_outcome(verify_consistency(old_root, new_root, &parsed)),
        Err(err) => {
            debug!(error = %err, "consistency proof rejected at parse");
            Verification::Failed
        }
    }
}
