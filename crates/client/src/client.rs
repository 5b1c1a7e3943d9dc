//! Superlight client: audit, tournament, bisection, adoption.
//!
//! One `sync()` walks four phases:
//!
//! 1. **Audit** — every prover's claimed accumulator (root + peaks) is
//!    checked against the leaf count the store expects. Failures drop out.
//! 2. **Tournament** — survivors with byte-equal roots pool together;
//!    a survivor with a different root plays a disagreement game against
//!    the current champion pool. Exactly one side survives each game.
//! 3. **Bisection** — a game walks peak-by-peak to the first differing
//!    peak, then level-by-level to the first differing leaf, then settles
//!    that leaf with a fraud check against the previous period's
//!    committee and its signed update.
//! 4. **Adoption** — surviving records fetch and prove their latest leaf;
//!    the committee of the first one that verifies is adopted.
//!
//! Malformed prover data never aborts a sync — the offender loses.
//! Aborts are reserved for protocol invariant violations and for the
//! case where every prover has been proven dishonest.

use std::sync::Arc;

use futures::future::{join, join_all};
use thiserror::Error;
use tracing::{debug, info, warn};

use slv_common::{ClientConfig, Committee, Digest};
use slv_mmr::{depth_of, merkle, peak_and_index, verify_mmr, Peak};
use slv_store::{SyncStore, SyncUpdate};

use crate::bisect::{checked_children, first_diverging_child, Bisection, Side};
use crate::prover::{PeriodQuery, Prover};

/// Fatal outcomes of a sync. Everything else resolves inside the games.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No prover survived the accumulator audit.
    #[error("no prover survived the accumulator audit")]
    NoHonestProver,

    /// Every tournament winner failed the final latest-committee audit.
    #[error("every tournament winner failed the latest-committee audit")]
    AllWinnersCheated,

    /// The protocol reached a state that is impossible while its
    /// invariants hold. Nothing is salvageable; the caller decides.
    #[error("protocol invariant violated: {0}")]
    InvariantViolation(String),
}

/// An audited prover and, after adoption, its verified latest committee.
#[derive(Debug, Clone)]
pub struct ProverRecord {
    /// Slot of the prover in the client's prover list.
    pub index: usize,
    /// Audited accumulator root.
    pub root: Digest,
    /// Audited peak list, left to right.
    pub peaks: Vec<Peak>,
    /// Populated on adoption; `None` until then.
    pub sync_committee: Option<Committee>,
}

/// Leaf addressing local to an audited accumulator.
#[derive(Debug, Clone, Copy)]
enum LeafTarget {
    /// Leaf index relative to the genesis leaf.
    Index(u64),
    /// Rightmost leaf.
    Latest,
}

/// The verifier. Holds untrusted provers and the local trusted store.
///
/// One instance may run `sync()` repeatedly, but a single invocation owns
/// its survivor bookkeeping start to finish; nothing is shared across
/// concurrent calls.
pub struct SuperlightClient<S> {
    config: ClientConfig,
    provers: Vec<Arc<dyn Prover>>,
    store: S,
}

impl<S: SyncStore> SuperlightClient<S> {
    pub fn new(config: ClientConfig, provers: Vec<Arc<dyn Prover>>, store: S) -> Self {
        SuperlightClient {
            config,
            provers,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the full protocol and returns the surviving records with the
    /// adopted latest committee filled in.
    ///
    /// # Errors
    ///
    /// * [`ClientError::NoHonestProver`] — nobody passed the audit.
    /// * [`ClientError::AllWinnersCheated`] — the tournament pool failed
    ///   the final latest-leaf audit to the last prover.
    /// * [`ClientError::InvariantViolation`] — a state no honest/dishonest
    ///   split can explain; aborts the sync with nothing returned.
    pub async fn sync(&self) -> Result<Vec<ProverRecord>, ClientError> {
        let leaf_count = self.store.expected_leaf_count();
        let mut survivors = self.audit_provers(leaf_count).await;
        if survivors.is_empty() {
            return Err(ClientError::NoHonestProver);
        }

        // Tournament: one game per survivor whose root differs from the
        // current champion's. Identical roots share the champion's fate,
        // so they pool instead of playing.
        let mut winners = vec![survivors.remove(0)];
        for challenger in survivors {
            if challenger.root == winners[0].root {
                debug!(prover = challenger.index, "root matches champion; pooled");
                winners.push(challenger);
                continue;
            }

            let champion_wins = self.peaks_vs_peaks(&winners[0], &challenger).await?;
            if champion_wins {
                debug!(prover = challenger.index, "challenger lost; discarded");
            } else {
                debug!(prover = challenger.index, "champion unseated");
                winners = vec![challenger];
            }
        }

        // Adoption: the pool shares one accumulator, so the first member
        // that proves its rightmost leaf fixes the committee for all.
        let mut adopted: Option<Committee> = None;
        for record in &winners {
            match self.verified_committee(record, LeafTarget::Latest).await {
                Some(committee) => {
                    adopted = Some(committee);
                    break;
                }
                None => {
                    warn!(prover = record.index, "winner failed the latest-leaf audit");
                }
            }
        }

        match adopted {
            Some(committee) => {
                info!(
                    winners = winners.len(),
                    committee = %committee.commitment(),
                    "adopted latest committee"
                );
                Ok(winners
                    .into_iter()
                    .map(|mut record| {
                        record.sync_committee = Some(committee.clone());
                        record
                    })
                    .collect())
            }
            None => Err(ClientError::AllWinnersCheated),
        }
    }

    /// Audits every prover's claimed accumulator against `leaf_count`.
    async fn audit_provers(&self, leaf_count: u64) -> Vec<ProverRecord> {
        let fanout = self.config.fanout();
        let limit = self
            .config
            .max_provers
            .unwrap_or(self.provers.len())
            .min(self.provers.len());
        let pool = &self.provers[..limit];

        let claims = join_all(pool.iter().map(|p| p.get_mmr_info())).await;

        let mut survivors = Vec::new();
        for (index, claim) in claims.into_iter().enumerate() {
            match claim {
                Ok(info) if verify_mmr(info.root, &info.peaks, leaf_count, fanout) => {
                    debug!(prover = index, root = %info.root, "accumulator audit passed");
                    survivors.push(ProverRecord {
                        index,
                        root: info.root,
                        peaks: info.peaks,
                        sync_committee: None,
                    });
                }
                Ok(info) => {
                    warn!(prover = index, root = %info.root, "accumulator audit failed; dropped");
                }
                Err(err) => {
                    warn!(prover = index, %err, "prover unreachable during audit; dropped");
                }
            }
        }
        survivors
    }

    /// Settles a root disagreement between two audited provers.
    ///
    /// Returns `true` iff `a` wins. Both records were audited for the
    /// same leaf count, so their peak lists line up position by position.
    async fn peaks_vs_peaks(
        &self,
        a: &ProverRecord,
        b: &ProverRecord,
    ) -> Result<bool, ClientError> {
        if a.peaks.len() != b.peaks.len() {
            return Err(ClientError::InvariantViolation(format!(
                "audited peak lists of unequal length: {} vs {}",
                a.peaks.len(),
                b.peaks.len()
            )));
        }

        let fanout = self.config.fanout();
        let mut offset = 0u64;
        for (peak_a, peak_b) in a.peaks.iter().zip(b.peaks.iter()) {
            if peak_a.root == peak_b.root {
                offset += peak_a.size;
                continue;
            }

            let depth = depth_of(peak_a.size, fanout).ok_or_else(|| {
                ClientError::InvariantViolation(format!(
                    "audited peak size {} is not a power of fanout {}",
                    peak_a.size, fanout
                ))
            })?;

            debug!(
                a = a.index,
                b = b.index,
                offset,
                depth,
                "peak disagreement; starting tree game"
            );
            return match self
                .tree_vs_tree(a, b, peak_a.root, peak_b.root, depth)
                .await?
            {
                Bisection::Winner(Side::A) => Ok(true),
                Bisection::Winner(Side::B) => Ok(false),
                Bisection::Leaf(local) => {
                    self.check_leaf_and_prev_update(a, b, offset + local).await
                }
            };
        }

        Err(ClientError::InvariantViolation(
            "differing accumulator roots over identical peak sets".to_string(),
        ))
    }

    /// Walks one peak tree down to a structural winner or the first
    /// disputed leaf.
    ///
    /// Each round issues both child queries together, but round `i + 1`
    /// only starts once round `i`'s answers picked the branch.
    async fn tree_vs_tree(
        &self,
        a: &ProverRecord,
        b: &ProverRecord,
        tree_root_a: Digest,
        tree_root_b: Digest,
        depth: u32,
    ) -> Result<Bisection, ClientError> {
        let fanout = self.config.fanout();
        let mut node_a = tree_root_a;
        let mut node_b = tree_root_b;
        let mut index = 0u64;

        for level in (1..=depth).rev() {
            let (answer_a, answer_b) = join(
                self.prover(a.index).get_node(tree_root_a, node_a),
                self.prover(b.index).get_node(tree_root_b, node_b),
            )
            .await;

            let kids_a = match answer_a
                .ok()
                .and_then(|info| checked_children(&node_a, &info, fanout))
            {
                Some(kids) => kids,
                None => {
                    warn!(prover = a.index, level, "malformed node expansion; game lost");
                    return Ok(Bisection::Winner(Side::B));
                }
            };
            let kids_b = match answer_b
                .ok()
                .and_then(|info| checked_children(&node_b, &info, fanout))
            {
                Some(kids) => kids,
                None => {
                    warn!(prover = b.index, level, "malformed node expansion; game lost");
                    return Ok(Bisection::Winner(Side::A));
                }
            };

            // Both expansions hash back to their parents, and the parents
            // differ, so a diverging child must exist.
            let branch = first_diverging_child(&kids_a, &kids_b).ok_or_else(|| {
                ClientError::InvariantViolation(
                    "divergent nodes expanded to identical children".to_string(),
                )
            })?;

            node_a = kids_a[branch];
            node_b = kids_b[branch];
            index = index * fanout + branch as u64;
        }

        Ok(Bisection::Leaf(index))
    }

    /// Settles the first disputed leaf with a fraud check.
    ///
    /// Returns `true` iff `a` wins. `leaf` is global across the
    /// accumulator, i.e. `leaf == 0` is the genesis period's leaf.
    async fn check_leaf_and_prev_update(
        &self,
        a: &ProverRecord,
        b: &ProverRecord,
        leaf: u64,
    ) -> Result<bool, ClientError> {
        let committee_a = match self.verified_committee(a, LeafTarget::Index(leaf)).await {
            Some(committee) => committee,
            None => {
                warn!(prover = a.index, leaf, "disputed leaf failed inclusion; game lost");
                return Ok(false);
            }
        };
        let committee_b = match self.verified_committee(b, LeafTarget::Index(leaf)).await {
            Some(committee) => committee,
            None => {
                warn!(prover = b.index, leaf, "disputed leaf failed inclusion; game lost");
                return Ok(true);
            }
        };

        let (a_ok, b_ok) = if leaf == 0 {
            // The genesis leaf is known a priori; no update involved.
            let genesis = self.store.genesis_committee();
            (&committee_a == genesis, &committee_b == genesis)
        } else {
            // Both sides agreed on every leaf before `leaf`, so side A's
            // copy of the previous committee speaks for both.
            let prev = match self
                .verified_committee(a, LeafTarget::Index(leaf - 1))
                .await
            {
                Some(committee) => committee,
                None => {
                    warn!(prover = a.index, leaf, "previous leaf unavailable; game lost");
                    return Ok(false);
                }
            };

            let period = self.store.genesis_period() + leaf;
            let update_a = self.fetch_update(a, period - 1).await;
            let update_b = self.fetch_update(b, period - 1).await;

            (
                update_a
                    .map(|u| self.store.sync_update_verify(&prev, &committee_a, &u))
                    .unwrap_or(false),
                update_b
                    .map(|u| self.store.sync_update_verify(&prev, &committee_b, &u))
                    .unwrap_or(false),
            )
        };

        match (a_ok, b_ok) {
            (true, false) => Ok(true),
            (false, true) => Ok(false),
            // Neither transition verifies: drop A; if an honest prover
            // exists elsewhere it will unseat the survivor later.
            (false, false) => {
                debug!(a = a.index, b = b.index, leaf, "both sides failed the fraud check");
                Ok(false)
            }
            (true, true) => Err(ClientError::InvariantViolation(format!(
                "both sides verified at disputed leaf {leaf}; committee uniqueness broken"
            ))),
        }
    }

    /// Fetches and Merkle-verifies a committee leaf from one prover,
    /// against the client's audited copy of that prover's peaks.
    async fn verified_committee(
        &self,
        record: &ProverRecord,
        target: LeafTarget,
    ) -> Option<Committee> {
        let fanout = self.config.fanout();

        let query = match target {
            LeafTarget::Latest => PeriodQuery::Latest,
            LeafTarget::Index(leaf) => {
                PeriodQuery::Period(self.store.genesis_period() + leaf)
            }
        };
        let response = self
            .prover(record.index)
            .get_leaf_with_proof(query)
            .await
            .ok()?;

        // The audited peaks fix where the leaf must live; the prover's
        // own claimed root is ignored.
        let (peak_root, local_index) = match target {
            LeafTarget::Latest => {
                let peak = record.peaks.last()?;
                (peak.root, peak.size - 1)
            }
            LeafTarget::Index(leaf) => {
                let (peak, local) = peak_and_index(&record.peaks, leaf)?;
                (peak.root, local)
            }
        };

        let leaf_hash = response.sync_committee.commitment();
        if merkle::verify(leaf_hash, local_index, peak_root, &response.proof, fanout) {
            Some(response.sync_committee)
        } else {
            None
        }
    }

    /// Single update for the transition `period → period + 1`, if the
    /// prover serves one.
    async fn fetch_update(&self, record: &ProverRecord, period: u64) -> Option<SyncUpdate> {
        let mut updates = self
            .prover(record.index)
            .get_sync_updates(period, 1)
            .await
            .ok()?;
        if updates.is_empty() {
            None
        } else {
            Some(updates.swap_remove(0))
        }
    }

    fn prover(&self, index: usize) -> &dyn Prover {
        self.provers[index].as_ref()
    }
}
