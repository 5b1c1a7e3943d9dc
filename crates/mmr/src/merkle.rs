//! # Deterministic n-ary Merkle Trees
//!
//! Verification and construction for balanced trees with a configurable
//! fan-out `n` (default 2 at the config layer).
//!
//! ## Algorithm
//!
//! - Leaf hash: `SHA3-256(leaf_bytes)` (computed by the caller)
//! - Internal node: `SHA3-256(child_0 ‖ child_1 ‖ … ‖ child_{n-1})`
//! - A proof carries, per level from the leaf upward, the `n − 1` sibling
//!   digests ordered left-to-right with the path child omitted; the path
//!   child's position at level `l` is `(index / n^l) mod n`.
//!
//! ## Cross-Side Invariant
//!
//! Verification MUST recompute byte-identical roots to the construction
//! half of this module. Any divergence breaks leaf audits and the
//! disagreement games built on top of them.

use slv_common::{hash_concat, Digest};

/// Hash of an internal node from its ordered children.
#[must_use]
pub fn parent(children: &[Digest]) -> Digest {
    hash_concat(children.iter().map(|c| c.as_bytes()))
}

/// Verifies an inclusion proof of `leaf` at `index` under `root`.
///
/// `proof[level]` holds the `n − 1` siblings of the path node at that
/// level. Returns `false` on any malformation: wrong sibling count,
/// proof shorter than the tree depth implied by `index`, or fan-out
/// below 2. Never panics, never errors.
///
/// A single-leaf tree has an empty proof and `root == leaf`.
#[must_use]
pub fn verify(leaf: Digest, index: u64, root: Digest, proof: &[Vec<Digest>], fanout: u64) -> bool {
    if fanout < 2 {
        return false;
    }

    let mut node = leaf;
    let mut idx = index;
    for siblings in proof {
        if siblings.len() as u64 != fanout - 1 {
            return false;
        }

        let pos = (idx % fanout) as usize;

        // Re-insert the path node among its siblings at `pos`.
        let mut sib = siblings.iter();
        let mut children = Vec::with_capacity(fanout as usize);
        for j in 0..fanout as usize {
            if j == pos {
                children.push(node);
            } else {
                match sib.next() {
                    Some(s) => children.push(*s),
                    None => return false,
                }
            }
        }

        node = parent(&children);
        idx /= fanout;
    }

    // A proof that stops short of the depth implied by `index` leaves
    // unconsumed index bits.
    if idx != 0 {
        return false;
    }

    node == root
}

/// True iff `len` is `fanout^k` for some `k ≥ 0`.
#[must_use]
pub fn is_power_of(len: u64, fanout: u64) -> bool {
    if fanout < 2 || len == 0 {
        return false;
    }
    let mut v = len;
    while v % fanout == 0 {
        v /= fanout;
    }
    v == 1
}

/// Builds every level of a perfect `fanout`-ary tree, leaves first.
///
/// Returns `None` unless `leaves.len()` is a power of `fanout` (a single
/// leaf counts: `fanout^0`). The last level holds exactly the root.
#[must_use]
pub fn build_levels(leaves: &[Digest], fanout: u64) -> Option<Vec<Vec<Digest>>> {
    if fanout < 2 || !is_power_of(leaves.len() as u64, fanout) {
        return None;
    }

    let mut levels = vec![leaves.to_vec()];
    loop {
        let below = match levels.last() {
            Some(level) if level.len() > 1 => level,
            _ => break,
        };
        let mut above = Vec::with_capacity(below.len() / fanout as usize);
        for chunk in below.chunks_exact(fanout as usize) {
            above.push(parent(chunk));
        }
        levels.push(above);
    }
    Some(levels)
}

/// Root of a level set produced by [`build_levels`].
#[must_use]
pub fn root_of(levels: &[Vec<Digest>]) -> Option<Digest> {
    levels.last().and_then(|l| l.first()).copied()
}

/// Extracts the sibling proof for `index` from prebuilt levels.
///
/// The returned layout is exactly what [`verify`] consumes. `None` if
/// `index` is out of range or the levels are not a perfect tree shape.
#[must_use]
pub fn prove_from_levels(
    levels: &[Vec<Digest>],
    index: u64,
    fanout: u64,
) -> Option<Vec<Vec<Digest>>> {
    if fanout < 2 || levels.is_empty() {
        return None;
    }
    let leaf_count = levels.first()?.len() as u64;
    if index >= leaf_count {
        return None;
    }

    let depth = levels.len() - 1;
    let mut proof = Vec::with_capacity(depth);
    let mut idx = index;
    for level in levels.iter().take(depth) {
        let pos = (idx % fanout) as usize;
        let base = (idx - pos as u64) as usize;
        let chunk = level.get(base..base + fanout as usize)?;

        let mut siblings = Vec::with_capacity(fanout as usize - 1);
        for (j, digest) in chunk.iter().enumerate() {
            if j != pos {
                siblings.push(*digest);
            }
        }
        proof.push(siblings);
        idx /= fanout;
    }
    Some(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slv_common::hash;

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n).map(|i| hash(&[i as u8])).collect()
    }

    #[test]
    fn is_power_of_basics() {
        assert!(is_power_of(1, 2));
        assert!(is_power_of(8, 2));
        assert!(is_power_of(9, 3));
        assert!(is_power_of(16, 4));
        assert!(!is_power_of(6, 2));
        assert!(!is_power_of(0, 2));
        assert!(!is_power_of(8, 1));
    }

    #[test]
    fn single_leaf_tree_root_is_leaf() {
        let l = leaves(1);
        let levels = build_levels(&l, 2).expect("levels");
        assert_eq!(levels.len(), 1);
        assert_eq!(root_of(&levels), Some(l[0]));

        let proof = prove_from_levels(&levels, 0, 2).expect("proof");
        assert!(proof.is_empty());
        assert!(verify(l[0], 0, l[0], &proof, 2));
    }

    #[test]
    fn binary_tree_all_leaves_verify() {
        for size in [2usize, 4, 8] {
            let l = leaves(size);
            let levels = build_levels(&l, 2).expect("levels");
            let root = root_of(&levels).expect("root");
            for (i, leaf) in l.iter().enumerate() {
                let proof = prove_from_levels(&levels, i as u64, 2).expect("proof");
                assert!(verify(*leaf, i as u64, root, &proof, 2), "leaf {i} of {size}");
            }
        }
    }

    #[test]
    fn quaternary_tree_all_leaves_verify() {
        let l = leaves(16);
        let levels = build_levels(&l, 4).expect("levels");
        let root = root_of(&levels).expect("root");
        for (i, leaf) in l.iter().enumerate() {
            let proof = prove_from_levels(&levels, i as u64, 4).expect("proof");
            assert_eq!(proof.len(), 2);
            assert_eq!(proof[0].len(), 3);
            assert!(verify(*leaf, i as u64, root, &proof, 4));
        }
    }

    #[test]
    fn parent_matches_manual_recompute() {
        let l = leaves(2);
        let levels = build_levels(&l, 2).expect("levels");
        let manual = hash(&[l[0].as_bytes().as_slice(), l[1].as_bytes().as_slice()].concat());
        assert_eq!(root_of(&levels), Some(manual));
    }

    #[test]
    fn tampered_inputs_fail() {
        let l = leaves(8);
        let levels = build_levels(&l, 2).expect("levels");
        let root = root_of(&levels).expect("root");
        let proof = prove_from_levels(&levels, 5, 2).expect("proof");

        assert!(verify(l[5], 5, root, &proof, 2));

        // wrong leaf
        assert!(!verify(l[4], 5, root, &proof, 2));
        // wrong index
        assert!(!verify(l[5], 4, root, &proof, 2));
        // wrong root
        assert!(!verify(l[5], 5, hash(b"not the root"), &proof, 2));
        // flipped proof byte
        let mut bad = proof.clone();
        bad[1][0].0[0] ^= 0x01;
        assert!(!verify(l[5], 5, root, &bad, 2));
    }

    #[test]
    fn malformed_proofs_fail_closed() {
        let l = leaves(4);
        let levels = build_levels(&l, 2).expect("levels");
        let root = root_of(&levels).expect("root");
        let proof = prove_from_levels(&levels, 3, 2).expect("proof");

        // truncated proof leaves index bits unconsumed
        assert!(!verify(l[3], 3, root, &proof[..1], 2));

        // wrong sibling count at a level
        let mut wide = proof.clone();
        wide[0].push(Digest::zero());
        assert!(!verify(l[3], 3, root, &wide, 2));

        // degenerate fan-out
        assert!(!verify(l[3], 3, root, &proof, 1));
    }

    #[test]
    fn non_perfect_leaf_counts_are_rejected() {
        assert!(build_levels(&leaves(3), 2).is_none());
        assert!(build_levels(&leaves(0), 2).is_none());
        assert!(build_levels(&leaves(8), 3).is_none());
    }
}
