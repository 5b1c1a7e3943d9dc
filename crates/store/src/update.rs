//! # Sync Update Message
//!
//! Module ini mendefinisikan `SyncUpdate`, bukti transisi committee untuk
//! satu period: committee period `p` menandatangani header yang mengikat
//! committee period `p + 1`.
//!
//! ## Signing Root (FIXED — consensus-critical)
//!
//! `signing_root()` uses SHA3-256 with the following concatenation order:
//!
//! 1. `period` (8 bytes, big-endian)
//! 2. `next_committee_root` (32 bytes)
//!
//! Tidak ada separator. Perubahan urutan = breaking change.
//!
//! ## Encoding
//!
//! | Property | Value |
//! |----------|-------|
//! | Format | bincode |
//! | Byte Order | Little-endian |
//! | Hash Algorithm | SHA3-256 |
//! | Deterministic | Yes |
//!
//! Byte strings yang masuk ke hash dan ke signature verification harus
//! direproduksi persis di kedua sisi; encoding di atas adalah kontrak
//! interop untuk `SyncUpdate`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use slv_common::{hash_concat, Committee, Digest};

// ════════════════════════════════════════════════════════════════════════════════
// CONSTANTS
// ════════════════════════════════════════════════════════════════════════════════

/// Expected size for each signature (Ed25519).
pub const SIGNATURE_SIZE: usize = 64;

// ════════════════════════════════════════════════════════════════════════════════
// UPDATE ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Structural validation errors for [`SyncUpdate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error("signer bitmap is empty")]
    EmptyBitmap,

    #[error("signature count mismatch: bitmap flags {expected}, found {found}")]
    SignatureCountMismatch { expected: usize, found: usize },

    #[error("invalid signature length at slot {index}: expected {SIGNATURE_SIZE}, found {found}")]
    InvalidSignatureLength { index: usize, found: usize },

    #[error("bincode error: {0}")]
    Codec(String),
}

// ════════════════════════════════════════════════════════════════════════════════
// UPDATE HEADER
// ════════════════════════════════════════════════════════════════════════════════

/// Header yang ditandatangani committee period `period`.
///
/// `next_committee_root` mengikat committee berikutnya ke dalam bytes
/// yang ditandatangani; tanpa binding ini, tanda tangan bisa dipakai
/// ulang untuk committee palsu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHeader {
    /// Period dari committee yang menandatangani.
    pub period: u64,
    /// Commitment (`Committee::commitment`) dari committee period + 1.
    pub next_committee_root: Digest,
}

impl UpdateHeader {
    /// Bytes yang ditandatangani: `H(period_be ‖ next_committee_root)`.
    #[must_use]
    pub fn signing_root(&self) -> Digest {
        hash_concat([
            self.period.to_be_bytes().as_slice(),
            self.next_committee_root.as_bytes().as_slice(),
        ])
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// SYNC UPDATE
// ════════════════════════════════════════════════════════════════════════════════

/// Bukti transisi committee `period → period + 1`.
///
/// `signer_bitmap[i]` menandai apakah slot `i` dari committee lama ikut
/// menandatangani; `signatures` berisi tanda tangan untuk slot yang
/// ter-set, dalam urutan bitmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUpdate {
    pub header: UpdateHeader,
    pub next_committee: Committee,
    pub signer_bitmap: Vec<bool>,
    pub signatures: Vec<Vec<u8>>,
}

impl SyncUpdate {
    /// Validasi struktural, tanpa kriptografi.
    ///
    /// # Returns
    ///
    /// `Ok(())` jika bentuk update konsisten; error pertama yang
    /// ditemukan jika tidak.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.signer_bitmap.is_empty() {
            return Err(UpdateError::EmptyBitmap);
        }

        let flagged = self.signer_bitmap.iter().filter(|b| **b).count();
        if flagged != self.signatures.len() {
            return Err(UpdateError::SignatureCountMismatch {
                expected: flagged,
                found: self.signatures.len(),
            });
        }

        for (index, sig) in self.signatures.iter().enumerate() {
            if sig.len() != SIGNATURE_SIZE {
                return Err(UpdateError::InvalidSignatureLength {
                    index,
                    found: sig.len(),
                });
            }
        }

        Ok(())
    }

    /// Jumlah slot yang ikut menandatangani.
    #[must_use]
    pub fn participation(&self) -> usize {
        self.signer_bitmap.iter().filter(|b| **b).count()
    }
}

/// Encode ke canonical bincode bytes.
pub fn encode_update(update: &SyncUpdate) -> Result<Vec<u8>, UpdateError> {
    bincode::serialize(update).map_err(|e| UpdateError::Codec(e.to_string()))
}

/// Decode dari canonical bincode bytes.
pub fn decode_update(bytes: &[u8]) -> Result<SyncUpdate, UpdateError> {
    bincode::deserialize(bytes).map_err(|e| UpdateError::Codec(e.to_string()))
}
