//! # Sync Store — Verifier Role
//!
//! Module ini menyediakan trait `SyncStore`, sumber kebenaran lokal milik
//! verifier: genesis committee, period range, dan predicate verifikasi
//! satu update transisi.
//!
//! ## Verification
//!
//! `sync_update_verify(prev, cur, update)` mengembalikan `true` hanya jika:
//!
//! 1. Struktur update konsisten (bitmap, jumlah & panjang signature)
//! 2. Bitmap length == jumlah slot `prev`
//! 3. Header mengikat `update.next_committee` (root match)
//! 4. `update.next_committee == cur`
//! 5. Partisipasi ≥ 2/3 slot `prev` (supermajority)
//! 6. Setiap signature ter-flag valid Ed25519 atas signing root, di bawah
//!    key slot yang bersangkutan dari `prev`
//!
//! ## Security Notes
//!
//! - Verification functions adalah pure dan deterministic
//! - Tidak ada side effects atau state mutations
//! - Parse error atau bad signature menghasilkan `false`, bukan panic

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use slv_common::Committee;

use crate::update::{SyncUpdate, SIGNATURE_SIZE};

/// Quorum supermajority: minimal 2/3 slot committee lama ikut tanda tangan.
pub const QUORUM_NUMERATOR: usize = 2;
pub const QUORUM_DENOMINATOR: usize = 3;

// ════════════════════════════════════════════════════════════════════════════════
// SYNC STORE TRAIT
// ════════════════════════════════════════════════════════════════════════════════

/// Kontrak store sisi verifier.
///
/// Implementor WAJIB pure pada `sync_update_verify`: tidak ada I/O,
/// tidak ada mutasi, hasil deterministik untuk input yang sama.
pub trait SyncStore: Send + Sync {
    /// Committee yang diketahui a priori oleh verifier.
    fn genesis_committee(&self) -> &Committee;

    /// Period milik genesis committee.
    fn genesis_period(&self) -> u64;

    /// Period berjalan menurut clock/store verifier.
    fn current_period(&self) -> u64;

    /// Verifikasi satu update transisi `prev → cur`.
    #[must_use]
    fn sync_update_verify(&self, prev: &Committee, cur: &Committee, update: &SyncUpdate) -> bool;

    /// Jumlah leaf yang diharapkan pada setiap accumulator yang jujur:
    /// `current_period − genesis_period + 1`.
    fn expected_leaf_count(&self) -> u64 {
        self.current_period().saturating_sub(self.genesis_period()) + 1
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// MEMORY STORE
// ════════════════════════════════════════════════════════════════════════════════

/// Store in-memory: genesis committee + period range, tanpa persistence.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    genesis_committee: Committee,
    genesis_period: u64,
    current_period: u64,
}

impl MemoryStore {
    /// `current_period` harus ≥ `genesis_period`; range yang terbalik
    /// membuat `expected_leaf_count` jatuh ke 1 leaf (genesis saja).
    pub fn new(genesis_committee: Committee, genesis_period: u64, current_period: u64) -> Self {
        MemoryStore {
            genesis_committee,
            genesis_period,
            current_period,
        }
    }
}

impl SyncStore for MemoryStore {
    fn genesis_committee(&self) -> &Committee {
        &self.genesis_committee
    }

    fn genesis_period(&self) -> u64 {
        self.genesis_period
    }

    fn current_period(&self) -> u64 {
        self.current_period
    }

    fn sync_update_verify(&self, prev: &Committee, cur: &Committee, update: &SyncUpdate) -> bool {
        // Step 1: structural shape
        if update.validate().is_err() {
            return false;
        }

        // Step 2: bitmap covers exactly the previous committee
        if update.signer_bitmap.len() != prev.len() {
            return false;
        }

        // Step 3: signed header binds the claimed next committee
        if update.header.next_committee_root != update.next_committee.commitment() {
            return false;
        }

        // Step 4: the claimed next committee is the one under dispute
        if &update.next_committee != cur {
            return false;
        }

        // Step 5: supermajority participation
        let signed = update.participation();
        if signed * QUORUM_DENOMINATOR < prev.len() * QUORUM_NUMERATOR {
            return false;
        }

        // Step 6: every flagged slot's signature verifies under prev's key
        let signing_root = update.header.signing_root();
        let mut sigs = update.signatures.iter();
        for (slot, flagged) in update.signer_bitmap.iter().enumerate() {
            if !*flagged {
                continue;
            }
            let sig_bytes = match sigs.next() {
                Some(s) => s,
                None => return false,
            };
            if sig_bytes.len() != SIGNATURE_SIZE {
                return false;
            }

            let vk = match VerifyingKey::from_bytes(&prev.keys()[slot]) {
                Ok(vk) => vk,
                Err(_) => return false,
            };
            let mut sig_arr = [0u8; SIGNATURE_SIZE];
            sig_arr.copy_from_slice(sig_bytes);
            let sig = Signature::from_bytes(&sig_arr);

            if vk.verify(signing_root.as_bytes(), &sig).is_err() {
                return false;
            }
        }

        true
    }
}
