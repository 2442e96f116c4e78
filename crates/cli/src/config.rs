// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kl.toml` loading and flag merging

use crate::error::KlError;
use clap::ValueEnum;
use kl_core::LockConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Looked up in the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "kl.toml";

/// Which lock the contenders fight over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One fair mutex (or lease set when `max_leases > 1`)
    Exclusive,
    /// Every contender takes the read lock
    Read,
    /// Every contender takes the write lock
    Write,
    /// Every third contender writes, the rest read
    Mixed,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Exclusive => "exclusive",
            Mode::Read => "read",
            Mode::Write => "write",
            Mode::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContendConfig {
    pub owners: usize,
    /// How long each contender holds once acquired
    #[serde(with = "humantime_serde")]
    pub hold: Duration,
    pub mode: Mode,
}

impl Default for ContendConfig {
    fn default() -> Self {
        Self {
            owners: 4,
            hold: Duration::from_millis(50),
            mode: Mode::Exclusive,
        }
    }
}

/// Effective configuration: file values with flags layered on top
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub lock: LockConfig,
    pub contend: ContendConfig,
}

/// Flag values that override the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_path: Option<String>,
    pub owners: Option<usize>,
    pub hold: Option<Duration>,
    pub timeout: Option<Duration>,
    pub mode: Option<Mode>,
    pub max_leases: Option<u32>,
}

impl CliConfig {
    /// Load from `path`, or from `kl.toml` in `cwd` if present, else defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>, cwd: &Path) -> Result<Self, KlError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (cwd.join(DEFAULT_CONFIG_FILE), false),
        };
        if !path.exists() {
            if required {
                return Err(KlError::config_missing(&path));
            }
            return Ok(Self::default());
        }
        Self::read(&path)
    }

    fn read(path: &Path) -> Result<Self, KlError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| KlError::config_unreadable(path, e))?;
        let config: Self =
            toml::from_str(&text).map_err(|e| KlError::config_invalid(path, &e))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(base_path) = overrides.base_path {
            self.lock.base_path = base_path;
        }
        if let Some(max_leases) = overrides.max_leases {
            self.lock = self.lock.with_max_leases(max_leases);
        }
        if let Some(timeout) = overrides.timeout {
            self.lock.acquire_timeout = Some(timeout);
        }
        if let Some(owners) = overrides.owners {
            self.contend.owners = owners;
        }
        if let Some(hold) = overrides.hold {
            self.contend.hold = hold;
        }
        if let Some(mode) = overrides.mode {
            self.contend.mode = mode;
        }
        self
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// clap value parser for `50ms`, `2s`, `1m 30s`
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(s).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
