//! Deterministic committee-chain fixtures.
//!
//! Generates a keyed chain of committees plus the signed updates linking
//! them, for store tests and in-process provers. Key material is derived
//! from the seed by hashing, so the same seed always reproduces the same
//! chain — no RNG state to carry around.
//!
//! `fork` produces an adversarial variant: identical up to a chosen
//! period, then diverging into committees whose linking update cannot
//! carry valid signatures from the honest side of the split.

use ed25519_dalek::{Signer, SigningKey};

use slv_common::{hash_concat, Committee, PUBLIC_KEY_SIZE};

use crate::store::MemoryStore;
use crate::update::{SyncUpdate, UpdateHeader};

const SECRET_DOMAIN: &[u8] = b"slv/fixture/secret";

/// A generated chain: committees per period, their secret keys, and the
/// full-participation updates between consecutive periods.
pub struct ChainFixture {
    genesis_period: u64,
    committee_size: usize,
    seed: u64,
    committees: Vec<Committee>,
    secrets: Vec<Vec<SigningKey>>,
    updates: Vec<SyncUpdate>,
}

impl ChainFixture {
    /// Chain of `periods` committees starting at period 0.
    pub fn generate(periods: usize, committee_size: usize, seed: u64) -> Self {
        Self::generate_from(0, periods, committee_size, seed)
    }

    /// Chain of `periods` committees starting at `genesis_period`.
    pub fn generate_from(
        genesis_period: u64,
        periods: usize,
        committee_size: usize,
        seed: u64,
    ) -> Self {
        assert!(periods >= 1, "a chain has at least its genesis period");
        assert!(committee_size >= 1, "committees are non-empty");

        let mut committees = Vec::with_capacity(periods);
        let mut secrets = Vec::with_capacity(periods);
        for idx in 0..periods {
            let (committee, keys) =
                derive_committee(seed, genesis_period + idx as u64, committee_size);
            committees.push(committee);
            secrets.push(keys);
        }

        let updates = link_updates(genesis_period, &committees, &secrets);

        ChainFixture {
            genesis_period,
            committee_size,
            seed,
            committees,
            secrets,
            updates,
        }
    }

    /// Adversarial variant: periods before `from_period` are shared with
    /// `self`; from there on the committees are re-derived under
    /// `fork_seed` (pass a seed different from the original). The update
    /// into the first forged period is signed with the forged keys and
    /// therefore does not verify under the honest previous committee;
    /// updates wholly inside the forged suffix are internally consistent.
    pub fn fork(&self, from_period: u64, fork_seed: u64) -> Self {
        let periods = self.committees.len();
        assert!(
            from_period >= self.genesis_period
                && from_period < self.genesis_period + periods as u64,
            "fork period outside the chain"
        );

        let fork_idx = (from_period - self.genesis_period) as usize;
        let mut committees = self.committees[..fork_idx].to_vec();
        let mut secrets: Vec<Vec<SigningKey>> = self.secrets[..fork_idx]
            .iter()
            .map(|keys| keys.to_vec())
            .collect();
        for idx in fork_idx..periods {
            let (committee, keys) = derive_committee(
                fork_seed,
                self.genesis_period + idx as u64,
                self.committee_size,
            );
            committees.push(committee);
            secrets.push(keys);
        }

        let mut updates = link_updates(self.genesis_period, &committees, &secrets);

        // The forger does not hold the honest keys of the period before the
        // split, so the boundary update gets re-signed with the forged keys.
        if fork_idx > 0 {
            let boundary = fork_idx - 1;
            let signing_root = updates[boundary].header.signing_root();
            updates[boundary].signatures = secrets[fork_idx]
                .iter()
                .map(|sk| sk.sign(signing_root.as_bytes()).to_bytes().to_vec())
                .collect();
        }

        ChainFixture {
            genesis_period: self.genesis_period,
            committee_size: self.committee_size,
            seed: fork_seed,
            committees,
            secrets,
            updates,
        }
    }

    pub fn genesis_period(&self) -> u64 {
        self.genesis_period
    }

    pub fn current_period(&self) -> u64 {
        self.genesis_period + self.committees.len() as u64 - 1
    }

    pub fn num_periods(&self) -> usize {
        self.committees.len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Index of an absolute period inside this chain, if it covers it.
    fn index_of(&self, period: u64) -> Option<usize> {
        let idx = period.checked_sub(self.genesis_period)? as usize;
        if idx < self.committees.len() {
            Some(idx)
        } else {
            None
        }
    }

    /// Committee at an absolute period, `None` outside the chain.
    pub fn committee(&self, period: u64) -> Option<&Committee> {
        self.committees.get(self.index_of(period)?)
    }

    pub fn committees(&self) -> &[Committee] {
        &self.committees
    }

    /// Update for the transition `period → period + 1` (absolute),
    /// `None` when the chain has no such transition.
    pub fn update(&self, period: u64) -> Option<&SyncUpdate> {
        self.updates.get(self.index_of(period)?)
    }

    pub fn updates(&self) -> &[SyncUpdate] {
        &self.updates
    }

    /// Update signed with this chain's keys for `signer_period` but
    /// carrying an arbitrary next committee — an equivocation. A real
    /// committee never signs two successors; this helper exists to
    /// exercise the client's uniqueness abort. `None` when the chain has
    /// no keys for `signer_period`.
    pub fn sign_update_with(
        &self,
        signer_period: u64,
        next_committee: &Committee,
    ) -> Option<SyncUpdate> {
        let signers = self.secrets.get(self.index_of(signer_period)?)?;
        let header = UpdateHeader {
            period: signer_period,
            next_committee_root: next_committee.commitment(),
        };
        let signing_root = header.signing_root();
        let signatures = signers
            .iter()
            .map(|sk| sk.sign(signing_root.as_bytes()).to_bytes().to_vec())
            .collect();
        Some(SyncUpdate {
            header,
            next_committee: next_committee.clone(),
            signer_bitmap: vec![true; signers.len()],
            signatures,
        })
    }

    /// In-memory store spanning this chain: genesis committee at
    /// `genesis_period`, current period at the chain tip.
    pub fn store(&self) -> MemoryStore {
        MemoryStore::new(
            self.committees[0].clone(),
            self.genesis_period,
            self.current_period(),
        )
    }
}

/// Committee + secret keys for one period, derived purely from the seed.
fn derive_committee(seed: u64, period: u64, size: usize) -> (Committee, Vec<SigningKey>) {
    let mut keys = Vec::with_capacity(size);
    let mut publics = Vec::with_capacity(size);
    for slot in 0..size {
        let secret = hash_concat([
            SECRET_DOMAIN,
            seed.to_be_bytes().as_slice(),
            period.to_be_bytes().as_slice(),
            (slot as u64).to_be_bytes().as_slice(),
        ]);
        let sk = SigningKey::from_bytes(secret.as_bytes());
        let mut pk = [0u8; PUBLIC_KEY_SIZE];
        pk.copy_from_slice(&sk.verifying_key().to_bytes());
        publics.push(pk);
        keys.push(sk);
    }
    let committee = Committee::new(publics).expect("non-empty by construction");
    (committee, keys)
}

/// Full-participation updates between consecutive committees.
///
/// `updates[i]` transitions `genesis + i → genesis + i + 1`, signed by
/// the committee of `genesis + i`.
fn link_updates(
    genesis_period: u64,
    committees: &[Committee],
    secrets: &[Vec<SigningKey>],
) -> Vec<SyncUpdate> {
    let mut updates = Vec::with_capacity(committees.len().saturating_sub(1));
    for idx in 0..committees.len().saturating_sub(1) {
        let next = &committees[idx + 1];
        let header = UpdateHeader {
            period: genesis_period + idx as u64,
            next_committee_root: next.commitment(),
        };
        let signing_root = header.signing_root();

        let signers = &secrets[idx];
        let signatures = signers
            .iter()
            .map(|sk| sk.sign(signing_root.as_bytes()).to_bytes().to_vec())
            .collect();

        updates.push(SyncUpdate {
            header,
            next_committee: next.clone(),
            signer_bitmap: vec![true; signers.len()],
            signatures,
        });
    }
    updates
}
