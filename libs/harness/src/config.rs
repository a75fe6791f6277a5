//! Role Configuration
//!
//! Key-value configuration snapshot handed to every role-actor at creation.
//! Caller-supplied overrides are merged atop built-in test defaults; the
//! merged snapshot is copied per role-actor, never shared mutably.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known configuration keys.
pub mod keys {
    /// Managed memory footprint of a role, in mebibytes.
    pub const MEMORY_MB: &str = "role.memory.mb";
    /// Number of task slots a worker offers.
    pub const TASK_SLOTS: &str = "worker.task-slots";
    /// Whether a worker talks to the coordinator over the in-process
    /// transport instead of the networked one.
    pub const LOCAL_TRANSPORT: &str = "worker.local-transport";
}

/// Memory footprint forced onto every harness-started role. Small enough
/// that a handful of roles fit in one test process.
pub const DEFAULT_MEMORY_MB: u64 = 64;

/// Task slots forced onto harness-started workers.
pub const DEFAULT_TASK_SLOTS: usize = 1;

/// Immutable-after-construction configuration snapshot for one role-actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleConfig {
    entries: BTreeMap<String, String>,
}

impl RoleConfig {
    /// Empty configuration, no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hard test defaults shared by every role: forced small memory
    /// footprint.
    pub fn role_defaults() -> Self {
        Self::new().with(keys::MEMORY_MB, DEFAULT_MEMORY_MB.to_string())
    }

    /// Hard test defaults for workers: role defaults plus a forced
    /// single task slot.
    pub fn worker_defaults() -> Self {
        Self::role_defaults().with(keys::TASK_SLOTS, DEFAULT_TASK_SLOTS.to_string())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Merge `self` atop `base`: entries in `self` win, everything else is
    /// taken from `base`. Returns a fresh snapshot; neither input changes.
    pub fn merged_over(&self, base: &RoleConfig) -> RoleConfig {
        let mut entries = base.entries.clone();
        entries.extend(self.entries.clone());
        RoleConfig { entries }
    }

    /// Memory footprint, falling back to the forced default.
    pub fn memory_mb(&self) -> u64 {
        self.get(keys::MEMORY_MB)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MEMORY_MB)
    }

    /// Worker task slots, falling back to the forced default.
    pub fn task_slots(&self) -> usize {
        self.get(keys::TASK_SLOTS)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TASK_SLOTS)
    }

    /// Whether the worker uses the in-process transport.
    pub fn local_transport(&self) -> bool {
        self.get(keys::LOCAL_TRANSPORT)
            .map(|v| v == "true")
            .unwrap_or(false)
    }

    /// Number of entries, observation only.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
