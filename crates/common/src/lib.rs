//! # SLV Common Crate
//!
//! Primitives bersama untuk superlight verifier.
//!
//! ## Modules
//! - `digest`: SHA3-256 digest newtype + canonical hash
//! - `committee`: ordered public-key list per period
//! - `config`: configuration management
//!
//! ## Usage
//! ```rust,ignore
//! use slv_common::{hash_concat, Committee, Digest};
//!
//! let committee = Committee::new(keys)?;
//! let leaf: Digest = committee.commitment();
//! ```

pub mod committee;
pub mod config;
pub mod digest;

pub use committee::{Committee, CommitteeError, PUBLIC_KEY_SIZE};
pub use config::{load_from_file, ClientConfig, DEFAULT_FANOUT};
pub use digest::{concat, hash, hash_concat, Digest, DigestError, DIGEST_SIZE};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
