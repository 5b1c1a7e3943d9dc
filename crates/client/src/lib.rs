//! # SLV Client Crate
//!
//! Superlight client: memperoleh committee terbaru dari N prover untrusted
//! dengan komunikasi logaritmik terhadap panjang sejarah, selama minimal
//! satu prover jujur.
//!
//! ## Modules
//! - `prover`: trait `Prover` + wire types
//! - `bisect`: primitives untuk bisection game
//! - `client`: `SuperlightClient` — audit, tournament, adoption
//! - `mock`: in-memory provers untuk testing
//!
//! ## Protocol Flow
//! ```text
//! provers ──get_mmr_info──▶ audit ──▶ pool / tournament
//!                                         │ peaks_vs_peaks
//!                                         │ tree_vs_tree (bisection)
//!                                         │ fraud check at first bad leaf
//!                                         ▼
//!                              winners ──get_leaf_with_proof('latest')──▶
//!                              verified committee diadopsi
//! ```

pub mod bisect;
pub mod client;
pub mod mock;
pub mod prover;

pub use bisect::{Bisection, Side};
pub use client::{ClientError, ProverRecord, SuperlightClient};
pub use mock::{CountingProver, MockProver};
pub use prover::{LeafWithProof, MmrInfo, NodeInfo, PeriodQuery, Prover, ProverError};
