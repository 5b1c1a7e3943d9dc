//! # SLV Store Crate
//!
//! Sync store sisi verifier: genesis committee, period range, dan
//! verifikasi update transisi committee.
//!
//! ## Modules
//! - `update`: `SyncUpdate` + canonical encoding + signing root
//! - `store`: `SyncStore` trait + `MemoryStore`
//! - `fixture`: deterministic keyed chains untuk tests dan mock provers

pub mod fixture;
pub mod store;
pub mod update;

pub use fixture::ChainFixture;
pub use store::{MemoryStore, SyncStore, QUORUM_DENOMINATOR, QUORUM_NUMERATOR};
pub use update::{
    decode_update, encode_update, SyncUpdate, UpdateError, UpdateHeader, SIGNATURE_SIZE,
};
