//! Kernel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for [`Custody`](crate::Custody).
///
/// Cryptographic parameters are constants in `custody-core` and are not
/// configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyConfig {
    /// Require the ledger to report the (owner, holder) relationship before
    /// a grantee may decrypt.
    pub enforce_ledger: bool,
    /// Lifetime of an issued challenge, in seconds.
    pub challenge_ttl_secs: u64,
    /// Re-query the ledger after recording a grant and fail if the
    /// relationship is not visible.
    pub confirm_grant: bool,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            enforce_ledger: true,
            challenge_ttl_secs: 300,
            confirm_grant: true,
        }
    }
}

impl CustodyConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn challenge_ttl(&self) -> Duration {
        Duration::from_secs(self.challenge_ttl_secs)
    }
}
