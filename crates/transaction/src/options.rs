//! Transaction configuration

use serde::{Deserialize, Serialize};

/// Options fixed for the lifetime of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Restrict reads and writes to the root class's own static state
    ///
    /// Used when compiling application classes. Image and extension builds
    /// run non-strict.
    pub strict: bool,
    /// Log log-size counters when the transaction is dropped
    pub log_stats: bool,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        TransactionOptions {
            strict: false,
            log_stats: false,
        }
    }
}

impl TransactionOptions {
    /// Strict options for application compilation
    pub fn strict() -> Self {
        TransactionOptions {
            strict: true,
            ..Default::default()
        }
    }

    /// Non-strict options for base image and image extension builds
    pub fn image() -> Self {
        TransactionOptions::default()
    }

    /// Enable or disable stats logging
    pub fn with_log_stats(mut self, log_stats: bool) -> Self {
        self.log_stats = log_stats;
        self
    }
}
