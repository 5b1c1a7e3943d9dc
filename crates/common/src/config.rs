//! Client configuration.
//!
//! A small typed struct deserialized from TOML. The only knob the protocol
//! itself depends on is the tree fan-out; it must match the fan-out every
//! prover used when building its trees, and a value below 2 cannot describe
//! a tree at all, so parsing rejects it up front. A mismatch with an honest
//! prover's actual fan-out is not detectable here — it surfaces later as an
//! accumulator audit failure.

use serde::Deserialize;
use std::path::Path;
use std::fs;
use crate::Result;

/// Default fan-out for Merkle trees and accumulator peaks (binary).
pub const DEFAULT_FANOUT: u8 = 2;

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    /// Tree fan-out `n`. Absent means binary.
    pub fanout: Option<u8>,

    /// Optional cap on provers consulted per sync. Absent means all.
    pub max_provers: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            fanout: Some(DEFAULT_FANOUT),
            max_provers: None,
        }
    }
}

impl ClientConfig {
    /// Effective fan-out, falling back to the binary default.
    pub fn fanout(&self) -> u64 {
        u64::from(self.fanout.unwrap_or(DEFAULT_FANOUT))
    }

    /// Parses a TOML document and rejects values no sync could run with.
    pub fn from_toml(raw: &str) -> Result<ClientConfig> {
        let cfg: ClientConfig = toml::from_str(raw)?;
        if let Some(n) = cfg.fanout {
            if n < 2 {
                return Err(format!("fanout must be at least 2, got {n}").into());
            }
        }
        if cfg.max_provers == Some(0) {
            return Err("max_provers must be non-zero when set".into());
        }
        Ok(cfg)
    }
}

/// Reads and validates a config file in one step.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<ClientConfig> {
    ClientConfig::from_toml(&fs::read_to_string(path.as_ref())?)
}
