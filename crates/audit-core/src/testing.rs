//! In-memory Merkle tree emitting proofs in the service's wire format.
//!
//! Leaves are event hashes used as-is and interior nodes are
//! `pair(left).with(right)`. A tree of `n` leaves splits at the largest power
//! of two below `n`, so every aligned power-of-two range of an older tree is
//! also a node of any newer tree.

use audit_canonical::Hash;

use crate::proof::{ConsistencyItem, MembershipProof, ProofItem, Side};

/// Append-only Merkle tree over leaf hashes.
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    leaves: Vec<Hash>,
}

impl MerkleTree {
    /// Builds a tree over `leaves`.
    pub fn from_leaves(leaves: Vec<Hash>) -> Self {
        Self { leaves }
    }

    /// Appends a leaf.
    pub fn push(&mut self, leaf: Hash) {
        self.leaves.push(leaf);
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// True when the tree has no leaves.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaf at `index`.
    pub fn leaf(&self, index: usize) -> Hash {
        self.leaves[index]
    }

    /// Root over the first `size` leaves.
    pub fn root_at(&self, size: usize) -> Hash {
        subtree_root(&self.leaves[..size])
    }

    /// Root over all leaves.
    pub fn root(&self) -> Hash {
        self.root_at(self.leaves.len())
    }

    /// Membership proof for the leaf at `index` against [`MerkleTree::root`].
    pub fn membership_proof(&self, index: usize) -> String {
        MembershipProof::new(node_path(&self.leaves, index, index + 1)).to_wire()
    }

    /// Consistency proof from the tree of `old_size` leaves to the current tree.
    pub fn consistency_proof(&self, old_size: usize) -> Vec<String> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for bit in (0..usize::BITS).rev() {
            let width = 1usize << bit;
            if old_size & width != 0 {
                ranges.push((start, start + width));
                start += width;
            }
        }

        ranges
            .into_iter()
            .rev()
            .map(|(lo, hi)| {
                ConsistencyItem {
                    subroot: subtree_root(&self.leaves[lo..hi]),
                    membership: MembershipProof::new(node_path(&self.leaves, lo, hi)),
                }
                .to_wire()
            })
            .collect()
    }
}

fn split_point(len: usize) -> usize {
    let mut k = 1;
    while k * 2 < len {
        k *= 2;
    }
    k
}

fn subtree_root(leaves: &[Hash]) -> Hash {
    assert!(!leaves.is_empty(), "empty subtree has no root");
    if leaves.len() == 1 {
        return leaves[0];
    }
    let k = split_point(leaves.len());
    subtree_root(&leaves[..k])
        .pair()
        .with(&subtree_root(&leaves[k..]))
}

// Path from node [lo, hi) to the root of `leaves`, leaf to root.
fn node_path(leaves: &[Hash], lo: usize, hi: usize) -> Vec<ProofItem> {
    if lo == 0 && hi == leaves.len() {
        return Vec::new();
    }
    let k = split_point(leaves.len());
    if hi <= k {
        let mut path = node_path(&leaves[..k], lo, hi);
        path.push(ProofItem {
            side: Side::Right,
            hash: subtree_root(&leaves[k..]),
        });
        path
    } else {
        let mut path = node_path(&leaves[k..], lo - k, hi - k);
        path.push(ProofItem {
            side: Side::Left,
            hash: subtree_root(&leaves[..k]),
        });
        path
    }
}
