//! Prover Interface Abstraction
//!
//! Module ini mendefinisikan trait `Prover` sebagai kontrak abstraksi
//! untuk pihak yang mengklaim mengetahui seluruh sejarah committee.
//! Trait ini memungkinkan client berinteraksi dengan prover lokal maupun
//! remote secara seragam tanpa terikat pada transport tertentu.
//!
//! Semua respons prover bersifat UNTRUSTED: client memverifikasi setiap
//! bytes sebelum dipakai, dan respons yang malformed membuat prover
//! kalah dalam game yang sedang berjalan — bukan menghasilkan error di
//! sisi client.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use slv_common::{Committee, Digest};
use slv_mmr::Peak;
use slv_store::SyncUpdate;

// ════════════════════════════════════════════════════════════════════════════
// SUPPORTING TYPES
// ════════════════════════════════════════════════════════════════════════════

/// Alamat leaf yang diminta dari prover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodQuery {
    /// Period absolut (genesis-based).
    Period(u64),
    /// Leaf paling kanan dari accumulator prover.
    Latest,
}

/// Klaim accumulator sebuah prover: root hasil bagging + daftar peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MmrInfo {
    /// Root klaim (bagged).
    pub root: Digest,
    /// Daftar peak klaim, kiri ke kanan.
    pub peaks: Vec<Peak>,
}

/// Leaf committee beserta bukti inklusinya di bawah satu peak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafWithProof {
    /// Committee pada period yang diminta.
    pub sync_committee: Committee,
    /// Root peak yang memuat leaf, menurut prover.
    pub root: Digest,
    /// Sibling proof per level, layout `slv_mmr::merkle::verify`.
    pub proof: Vec<Vec<Digest>>,
}

/// Ekspansi satu node di dalam tree sebuah peak.
///
/// Untuk node internal, `children` harus berisi tepat `n` digest dan
/// `H(child_0 ‖ … ‖ child_{n-1})` harus sama dengan hash node — client
/// memeriksa keduanya.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// `true` jika node adalah leaf.
    pub is_leaf: bool,
    /// Child hashes, kiri ke kanan; `None` untuk leaf.
    pub children: Option<Vec<Digest>>,
}

/// Error yang dapat dikembalikan prover.
///
/// Bagi client, setiap varian diperlakukan sama dengan respons malformed:
/// prover yang bersangkutan di-drop dari audit atau kalah dalam game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// Data yang diminta tidak dikenal prover.
    NotFound,
    /// Prover tidak dapat dijangkau.
    Unavailable,
    /// Error lainnya yang tidak terkategorikan.
    Other(String),
}

impl fmt::Display for ProverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProverError::NotFound => write!(f, "requested data not found"),
            ProverError::Unavailable => write!(f, "prover unavailable"),
            ProverError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ProverError {}

// ════════════════════════════════════════════════════════════════════════════
// PROVER TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Kontrak prover untuk superlight sync.
///
/// # Kontrak untuk Implementor
///
/// Implementor trait ini WAJIB:
/// - Thread-safe (`Send + Sync`)
/// - Tidak melakukan blocking pada method async
/// - Konsisten terhadap accumulator yang sama selama satu `sync()`
///
/// Client TIDAK mempercayai satupun nilai yang dikembalikan; kejujuran
/// ditegakkan lewat audit dan bisection game, bukan lewat kontrak ini.
#[async_trait]
pub trait Prover: Send + Sync {
    /// Leaf committee pada `period` + bukti inklusi di bawah peak-nya.
    async fn get_leaf_with_proof(&self, period: PeriodQuery)
        -> Result<LeafWithProof, ProverError>;

    /// Klaim accumulator prover: root + peaks.
    async fn get_mmr_info(&self) -> Result<MmrInfo, ProverError>;

    /// Ekspansi node `node` di dalam tree yang berakar di `tree_root`.
    async fn get_node(&self, tree_root: Digest, node: Digest) -> Result<NodeInfo, ProverError>;

    /// Update transisi mulai `start_period`, maksimal `max_count` entri.
    async fn get_sync_updates(
        &self,
        start_period: u64,
        max_count: u32,
    ) -> Result<Vec<SyncUpdate>, ProverError>;
}
