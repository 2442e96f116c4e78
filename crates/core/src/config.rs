// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name tag of plain mutex nodes
pub const DEFAULT_LOCK_NAME: &str = "lock-";

/// Configuration for one lock instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Parent path under which contenders create their nodes
    pub base_path: String,
    /// Name tag of this lock's nodes; the service appends the sequence
    pub lock_name: String,
    /// How many contenders may hold at once (1 for a mutex)
    pub max_leases: u32,
    /// Prefix node names with a per-attempt uuid so a create whose response
    /// was lost can be recovered instead of orphaned
    pub protected: bool,
    /// Ask the client to keep retrying deletes until confirmed
    pub guaranteed_delete: bool,
    /// Payload stored in each lock node (participant identification)
    pub node_data: Vec<u8>,
    /// Default wait for `acquire`; `None` waits indefinitely
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub acquire_timeout: Option<Duration>,
}

impl LockConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            max_leases: 1,
            protected: true,
            guaranteed_delete: true,
            node_data: Vec::new(),
            acquire_timeout: None,
        }
    }

    pub fn with_lock_name(mut self, name: impl Into<String>) -> Self {
        self.lock_name = name.into();
        self
    }

    pub fn with_max_leases(mut self, max_leases: u32) -> Self {
        self.max_leases = max_leases.max(1);
        self
    }

    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn with_guaranteed_delete(mut self, guaranteed: bool) -> Self {
        self.guaranteed_delete = guaranteed;
        self
    }

    pub fn with_node_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.node_data = data.into();
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self::new("/locks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_fair_mutex() {
        let config = LockConfig::new("/locks/jobs");
        assert_eq!(config.base_path, "/locks/jobs");
        assert_eq!(config.lock_name, "lock-");
        assert_eq!(config.max_leases, 1);
        assert!(config.protected);
        assert!(config.guaranteed_delete);
        assert_eq!(config.acquire_timeout, None);
    }

    #[test]
    fn max_leases_is_at_least_one() {
        assert_eq!(LockConfig::default().with_max_leases(0).max_leases, 1);
        assert_eq!(LockConfig::default().with_max_leases(3).max_leases, 3);
    }

    #[test]
    fn deserializes_from_toml_with_humantime_timeout() {
        let config: LockConfig = toml::from_str(
            r#"
            base_path = "/locks/deploy"
            max_leases = 2
            protected = false
            acquire_timeout = "1m 30s"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_path, "/locks/deploy");
        assert_eq!(config.lock_name, "lock-");
        assert_eq!(config.max_leases, 2);
        assert!(!config.protected);
        assert_eq!(config.acquire_timeout, Some(Duration::from_secs(90)));
    }

    #[test]
    fn serializes_round_trip_through_toml() {
        let config = LockConfig::new("/locks/a")
            .with_acquire_timeout(Some(Duration::from_millis(250)))
            .with_node_data(b"host-1".to_vec());
        let text = toml::to_string(&config).unwrap();
        let parsed: LockConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
