//! Bisection game primitives.
//!
//! A game between two provers who disagree on a tree root walks down the
//! tree one level per round, always following the first child the two
//! sides disagree on. The result is either a structural winner (one side
//! served a malformed expansion) or the in-tree index of the first leaf
//! the sides disagree about.

use slv_common::Digest;
use slv_mmr::merkle;

use crate::prover::NodeInfo;

/// The two seats of a disagreement game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Outcome of bisecting one peak tree.
///
/// A sum type, deliberately: a winner and a leaf index are different
/// kinds of answers and must not share an integer encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bisection {
    /// One side served malformed data; the other side takes the game.
    Winner(Side),
    /// Both sides expanded cleanly down to depth 0; this is the first
    /// in-tree leaf index they disagree on.
    Leaf(u64),
}

/// Structural audit of a claimed internal-node expansion.
///
/// Returns the children iff the prover answered an internal node with
/// exactly `fanout` children whose concatenated hash reproduces `node`.
/// An `is_leaf` answer above depth 0, a missing child list, a wrong
/// child count, or a hash mismatch all return `None` — the serving side
/// loses on the spot.
#[must_use]
pub fn checked_children(node: &Digest, info: &NodeInfo, fanout: u64) -> Option<Vec<Digest>> {
    if info.is_leaf {
        return None;
    }
    let children = info.children.as_ref()?;
    if children.len() as u64 != fanout {
        return None;
    }
    if merkle::parent(children) != *node {
        return None;
    }
    Some(children.clone())
}

/// First index where the two child lists differ.
#[must_use]
pub fn first_diverging_child(a: &[Digest], b: &[Digest]) -> Option<usize> {
    a.iter().zip(b.iter()).position(|(x, y)| x != y)
}
