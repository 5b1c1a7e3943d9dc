//! # Merkle Mountain Range Audit
//!
//! A Merkle Mountain Range here is a forest of perfect `n`-ary trees whose
//! sizes decrease left to right. For a leaf count `L`, the peak sizes are
//! exactly the base-`n` digits of `L`: a non-zero digit `d` at position `p`
//! contributes `d` peaks of `n^p` leaves each. The whole forest commits to
//! a single root by *bagging*: starting from the rightmost peak, fold left
//! with `acc ← H(peak_root ‖ acc)`.
//!
//! The verification half ([`verify`], [`peak_and_index`]) is what the
//! superlight client runs against untrusted peak sets. The construction
//! half ([`MmrBuilder`], [`Mmr`]) exists for provers and fixtures; it
//! recomputes the same bytes from scratch, deterministically.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use slv_common::{hash_concat, Digest};

use crate::merkle;

// ════════════════════════════════════════════════════════════════════════════════
// PEAK
// ════════════════════════════════════════════════════════════════════════════════

/// One perfect tree in the range: its root and its leaf count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    /// Root digest of the perfect tree.
    pub root: Digest,
    /// Leaf count of the tree; always a power of the fan-out.
    pub size: u64,
}

/// Exact depth of a perfect tree of `size` leaves, or `None` when `size`
/// is not a power of `fanout`.
#[must_use]
pub fn depth_of(size: u64, fanout: u64) -> Option<u32> {
    if fanout < 2 || size == 0 {
        return None;
    }
    let mut v = size;
    let mut depth = 0u32;
    while v % fanout == 0 {
        v /= fanout;
        depth += 1;
    }
    if v == 1 {
        Some(depth)
    } else {
        None
    }
}

/// Peak sizes demanded by `leaf_count` in base `fanout`, largest first.
#[must_use]
pub fn expected_peak_sizes(leaf_count: u64, fanout: u64) -> Vec<u64> {
    if fanout < 2 {
        return Vec::new();
    }

    // digits of leaf_count, least significant first, with their power value
    let mut digits: Vec<(u64, u64)> = Vec::new();
    let mut rest = leaf_count;
    let mut pow = 1u64;
    while rest > 0 {
        digits.push((rest % fanout, pow));
        rest /= fanout;
        pow = pow.saturating_mul(fanout);
    }

    let mut sizes = Vec::new();
    for (digit, power) in digits.iter().rev() {
        for _ in 0..*digit {
            sizes.push(*power);
        }
    }
    sizes
}

/// Bags a peak list into the range root.
///
/// Fold from the rightmost peak leftward: `acc ← H(root_i ‖ acc)`.
/// `None` for an empty list — an empty range has no bagged root.
#[must_use]
pub fn bag_peaks(peaks: &[Peak]) -> Option<Digest> {
    let mut iter = peaks.iter().rev();
    let mut acc = iter.next()?.root;
    for peak in iter {
        acc = hash_concat([peak.root.as_bytes(), acc.as_bytes()]);
    }
    Some(acc)
}

/// Audits a claimed peak set against a claimed root and leaf count.
///
/// Accepts iff the peak sizes are exactly the base-`fanout` digit
/// decomposition of `leaf_count` (largest first) and bagging the peaks
/// reproduces `root`. An empty range is only acceptable for
/// `leaf_count == 0`, committed as the zero digest.
#[must_use]
pub fn verify(root: Digest, peaks: &[Peak], leaf_count: u64, fanout: u64) -> bool {
    if fanout < 2 {
        return false;
    }

    let expected = expected_peak_sizes(leaf_count, fanout);
    if peaks.len() != expected.len() {
        return false;
    }
    if peaks.iter().zip(expected.iter()).any(|(p, e)| p.size != *e) {
        return false;
    }

    match bag_peaks(peaks) {
        Some(bagged) => bagged == root,
        None => leaf_count == 0 && root == Digest::zero(),
    }
}

/// Locates the peak containing a global leaf index.
///
/// Linear scan with a running prefix sum; returns the peak together with
/// the leaf's index local to that peak's tree. `None` when `global` is
/// past the end of the range.
#[must_use]
pub fn peak_and_index(peaks: &[Peak], global: u64) -> Option<(&Peak, u64)> {
    let mut offset = 0u64;
    for peak in peaks {
        if global < offset + peak.size {
            return Some((peak, global - offset));
        }
        offset += peak.size;
    }
    None
}

// ════════════════════════════════════════════════════════════════════════════════
// CONSTRUCTION (prover / fixture side)
// ════════════════════════════════════════════════════════════════════════════════

/// Append-only builder over leaf digests.
///
/// Pure recomputation: the same leaf sequence always yields byte-identical
/// peaks, proofs, and node tables.
#[derive(Debug, Clone)]
pub struct MmrBuilder {
    fanout: u64,
    leaves: Vec<Digest>,
}

impl MmrBuilder {
    /// `fanout` must be at least 2.
    pub fn new(fanout: u64) -> Self {
        assert!(fanout >= 2, "fanout must be at least 2");
        MmrBuilder {
            fanout,
            leaves: Vec::new(),
        }
    }

    pub fn push(&mut self, leaf: Digest) {
        self.leaves.push(leaf);
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Materializes the forest for the current leaf sequence.
    pub fn build(&self) -> Mmr {
        let fanout = self.fanout;
        let sizes = expected_peak_sizes(self.leaves.len() as u64, fanout);

        let mut trees = Vec::with_capacity(sizes.len());
        let mut peaks = Vec::with_capacity(sizes.len());
        let mut children: HashMap<Digest, Vec<Digest>> = HashMap::new();
        let mut leaf_set: HashSet<Digest> = HashSet::new();

        let mut offset = 0usize;
        for size in sizes {
            let start = offset;
            offset += size as usize;
            let slice = match self.leaves.get(start..start + size as usize) {
                Some(slice) => slice,
                // sizes from the digit decomposition sum to the leaf count
                None => break,
            };
            let levels = match merkle::build_levels(slice, fanout) {
                Some(levels) => levels,
                // every digit-decomposition size is a power of the fanout
                None => continue,
            };
            let root = match merkle::root_of(&levels) {
                Some(root) => root,
                None => continue,
            };

            for leaf in slice {
                leaf_set.insert(*leaf);
            }
            for pair in levels.windows(2) {
                let (below, above) = (&pair[0], &pair[1]);
                for (i, node) in above.iter().enumerate() {
                    let span = i * fanout as usize..(i + 1) * fanout as usize;
                    if let Some(kids) = below.get(span) {
                        children.insert(*node, kids.to_vec());
                    }
                }
            }

            peaks.push(Peak { root, size });
            trees.push(TreeLevels {
                offset: start as u64,
                levels,
            });
        }

        Mmr {
            fanout,
            leaf_count: self.leaves.len() as u64,
            peaks,
            trees,
            children,
            leaf_set,
        }
    }
}

#[derive(Debug, Clone)]
struct TreeLevels {
    offset: u64,
    levels: Vec<Vec<Digest>>,
}

/// A materialized range: peaks, bagged root, inclusion proofs, and the
/// node tables a prover serves child queries from.
#[derive(Debug, Clone)]
pub struct Mmr {
    fanout: u64,
    leaf_count: u64,
    peaks: Vec<Peak>,
    trees: Vec<TreeLevels>,
    children: HashMap<Digest, Vec<Digest>>,
    leaf_set: HashSet<Digest>,
}

impl Mmr {
    pub fn fanout(&self) -> u64 {
        self.fanout
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Bagged root; zero digest for an empty range.
    #[must_use]
    pub fn root(&self) -> Digest {
        bag_peaks(&self.peaks).unwrap_or_else(Digest::zero)
    }

    /// Inclusion proof for a global leaf index, in [`merkle::verify`]
    /// layout against the containing peak's root.
    #[must_use]
    pub fn proof(&self, global: u64) -> Option<Vec<Vec<Digest>>> {
        let tree = self
            .trees
            .iter()
            .find(|t| global >= t.offset && global < t.offset + t.levels[0].len() as u64)?;
        merkle::prove_from_levels(&tree.levels, global - tree.offset, self.fanout)
    }

    /// Children of an internal node, ordered left to right.
    #[must_use]
    pub fn node_children(&self, node: &Digest) -> Option<&[Digest]> {
        self.children.get(node).map(Vec::as_slice)
    }

    /// Whether a digest is one of the range's leaves.
    #[must_use]
    pub fn is_leaf(&self, node: &Digest) -> bool {
        self.leaf_set.contains(node)
    }
}
