// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning knobs.

use chrono::Duration;
use eddy_core::ConflictPolicy;

/// Configuration for the sync engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How many actions execute concurrently per batch.
    pub batch_size: usize,
    /// Retry budget assigned to actions that don't specify one.
    pub default_max_retries: u32,
    /// TTL applied to cache entries the engine writes.
    pub cache_ttl: Duration,
    /// Active conflict resolution policy.
    pub policy: ConflictPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            batch_size: 5,
            default_max_retries: 3,
            cache_ttl: Duration::minutes(5),
            policy: ConflictPolicy::ClientWins,
        }
    }
}
