//! Mock Prover Implementation for Testing
//!
//! This module provides in-memory provers for driving the client without
//! any transport. A `MockProver` over an honest chain fixture behaves
//! honestly; the same prover over a forked fixture is the canonical
//! adversary: a structurally valid accumulator committing to forged
//! leaves. On top of that, fault flags inject the *structural* kinds of
//! misbehavior — corrupt node expansions, unverifiable leaf proofs,
//! fabricated accumulator claims — that the games must catch on the spot.
//!
//! # Features
//!
//! - Deterministic behavior for reproducible tests
//! - Fault injection per interface method
//! - Update overrides for equivocation scenarios
//! - A call-counting wrapper for interaction-complexity assertions

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use slv_common::{Committee, Digest};
use slv_mmr::{peak_and_index, MmrBuilder, Mmr};
use slv_store::{ChainFixture, SyncUpdate};

use crate::prover::{LeafWithProof, MmrInfo, NodeInfo, PeriodQuery, Prover, ProverError};

// ════════════════════════════════════════════════════════════════════════════
// FAULT PLAN
// ════════════════════════════════════════════════════════════════════════════

/// Structural misbehavior toggles, all off by default.
#[derive(Debug, Default)]
struct FaultPlan {
    /// Corrupt the first child of every node expansion.
    corrupt_node_children: bool,
    /// Append a bogus level to every leaf proof.
    truncate_leaf_proofs: bool,
    /// Append a bogus level to `Latest` leaf proofs only.
    break_latest_proof: bool,
    /// Serve this accumulator claim instead of the real one.
    claimed_info: Option<MmrInfo>,
    /// Serve these updates instead of the chain's own, keyed by period.
    update_overrides: HashMap<u64, SyncUpdate>,
}

// ════════════════════════════════════════════════════════════════════════════
// MOCK PROVER
// ════════════════════════════════════════════════════════════════════════════

/// In-memory prover over a [`ChainFixture`].
pub struct MockProver {
    genesis_period: u64,
    committees: Vec<Committee>,
    updates: Vec<SyncUpdate>,
    mmr: Mmr,
    faults: RwLock<FaultPlan>,
}

impl MockProver {
    /// Prover serving `fixture`'s chain with `fanout`-ary trees.
    pub fn new(fixture: &ChainFixture, fanout: u64) -> Self {
        let mut builder = MmrBuilder::new(fanout);
        for committee in fixture.committees() {
            builder.push(committee.commitment());
        }
        MockProver {
            genesis_period: fixture.genesis_period(),
            committees: fixture.committees().to_vec(),
            updates: fixture.updates().to_vec(),
            mmr: builder.build(),
            faults: RwLock::new(FaultPlan::default()),
        }
    }

    /// Every node expansion comes back with a flipped child byte.
    pub fn with_corrupt_nodes(self) -> Self {
        self.faults.write().corrupt_node_children = true;
        self
    }

    /// Every leaf proof fails verification.
    pub fn with_broken_leaf_proofs(self) -> Self {
        self.faults.write().truncate_leaf_proofs = true;
        self
    }

    /// Only `Latest` leaf proofs fail verification.
    pub fn with_broken_latest_proof(self) -> Self {
        self.faults.write().break_latest_proof = true;
        self
    }

    /// Claim an arbitrary accumulator during the audit.
    pub fn with_claimed_info(self, info: MmrInfo) -> Self {
        self.faults.write().claimed_info = Some(info);
        self
    }

    /// Serve `update` for `period` instead of the chain's own.
    pub fn with_update_override(self, period: u64, update: SyncUpdate) -> Self {
        self.faults.write().update_overrides.insert(period, update);
        self
    }

    /// Leaf index for a query, if it falls inside the chain.
    fn resolve(&self, query: PeriodQuery) -> Option<u64> {
        let leaf_count = self.mmr.leaf_count();
        match query {
            PeriodQuery::Latest => leaf_count.checked_sub(1),
            PeriodQuery::Period(period) => {
                let leaf = period.checked_sub(self.genesis_period)?;
                if leaf < leaf_count {
                    Some(leaf)
                } else {
                    None
                }
            }
        }
    }
}

#[async_trait]
impl Prover for MockProver {
    async fn get_leaf_with_proof(
        &self,
        period: PeriodQuery,
    ) -> Result<LeafWithProof, ProverError> {
        let leaf = self.resolve(period).ok_or(ProverError::NotFound)?;
        let committee = self.committees[leaf as usize].clone();
        let mut proof = self.mmr.proof(leaf).ok_or(ProverError::NotFound)?;
        let (peak, _) =
            peak_and_index(self.mmr.peaks(), leaf).ok_or(ProverError::NotFound)?;

        let faults = self.faults.read();
        let sabotage = faults.truncate_leaf_proofs
            || (faults.break_latest_proof && matches!(period, PeriodQuery::Latest));
        if sabotage {
            // one extra level always derails the path recomputation
            proof.push(vec![Digest::zero(); self.mmr.fanout() as usize - 1]);
        }

        Ok(LeafWithProof {
            sync_committee: committee,
            root: peak.root,
            proof,
        })
    }

    async fn get_mmr_info(&self) -> Result<MmrInfo, ProverError> {
        if let Some(info) = self.faults.read().claimed_info.clone() {
            return Ok(info);
        }
        Ok(MmrInfo {
            root: self.mmr.root(),
            peaks: self.mmr.peaks().to_vec(),
        })
    }

    async fn get_node(&self, _tree_root: Digest, node: Digest) -> Result<NodeInfo, ProverError> {
        if let Some(children) = self.mmr.node_children(&node) {
            let mut children = children.to_vec();
            if self.faults.read().corrupt_node_children {
                children[0].0[0] ^= 0x01;
            }
            return Ok(NodeInfo {
                is_leaf: false,
                children: Some(children),
            });
        }
        if self.mmr.is_leaf(&node) {
            return Ok(NodeInfo {
                is_leaf: true,
                children: None,
            });
        }
        Err(ProverError::NotFound)
    }

    async fn get_sync_updates(
        &self,
        start_period: u64,
        max_count: u32,
    ) -> Result<Vec<SyncUpdate>, ProverError> {
        let faults = self.faults.read();
        let mut out = Vec::new();
        for step in 0..u64::from(max_count) {
            let period = start_period + step;
            if let Some(update) = faults.update_overrides.get(&period) {
                out.push(update.clone());
                continue;
            }
            match period
                .checked_sub(self.genesis_period)
                .and_then(|idx| self.updates.get(idx as usize))
            {
                Some(update) => out.push(update.clone()),
                None => break,
            }
        }
        Ok(out)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// COUNTING WRAPPER
// ════════════════════════════════════════════════════════════════════════════

/// Forwards to an inner prover while counting calls per method.
pub struct CountingProver<P> {
    inner: P,
    leaf_calls: AtomicU32,
    info_calls: AtomicU32,
    node_calls: AtomicU32,
    update_calls: AtomicU32,
}

impl<P> CountingProver<P> {
    pub fn new(inner: P) -> Self {
        CountingProver {
            inner,
            leaf_calls: AtomicU32::new(0),
            info_calls: AtomicU32::new(0),
            node_calls: AtomicU32::new(0),
            update_calls: AtomicU32::new(0),
        }
    }

    pub fn leaf_calls(&self) -> u32 {
        self.leaf_calls.load(Ordering::SeqCst)
    }

    pub fn info_calls(&self) -> u32 {
        self.info_calls.load(Ordering::SeqCst)
    }

    pub fn node_calls(&self) -> u32 {
        self.node_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<P: Prover> Prover for CountingProver<P> {
    async fn get_leaf_with_proof(
        &self,
        period: PeriodQuery,
    ) -> Result<LeafWithProof, ProverError> {
        self.leaf_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_leaf_with_proof(period).await
    }

    async fn get_mmr_info(&self) -> Result<MmrInfo, ProverError> {
        self.info_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_mmr_info().await
    }

    async fn get_node(&self, tree_root: Digest, node: Digest) -> Result<NodeInfo, ProverError> {
        self.node_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_node(tree_root, node).await
    }

    async fn get_sync_updates(
        &self,
        start_period: u64,
        max_count: u32,
    ) -> Result<Vec<SyncUpdate>, ProverError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_sync_updates(start_period, max_count).await
    }
}
