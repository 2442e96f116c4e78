// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inter-process read/write lock
//!
//! Read and write nodes live under one parent so they order against each
//! other. Writers are exclusive against every earlier node; readers only wait
//! for the first earlier writer.
//!
//! An owner holding the write lock may take the read lock freely. The reverse
//! is not true: requesting the write lock while holding only the read lock
//! queues behind your own read node and never completes. Release the read
//! lock first, or pass a timeout.

use crate::client::CoordinationClient;
use crate::config::LockConfig;
use crate::driver::LockDriver;
use crate::engine::LockEngine;
use crate::mutex::InterProcessMutex;
use crate::ordering::NodeOrdering;

pub const READ_LOCK_NAME: &str = "__READ__";
pub const WRITE_LOCK_NAME: &str = "__WRIT__";

/// A pair of locks sharing one namespace
#[derive(Clone)]
pub struct ReadWriteLock<C: CoordinationClient> {
    read: InterProcessMutex<C>,
    write: InterProcessMutex<C>,
}

impl<C: CoordinationClient> ReadWriteLock<C> {
    pub fn new(client: C, base_path: impl Into<String>) -> Self {
        Self::with_config(client, LockConfig::new(base_path))
    }

    /// `lock_name` and `max_leases` in `config` are ignored; both halves use
    /// their fixed tags and the write half is always exclusive
    pub fn with_config(client: C, config: LockConfig) -> Self {
        let ordering = NodeOrdering::new([READ_LOCK_NAME, WRITE_LOCK_NAME]);

        let write_engine = LockEngine::new(
            client.clone(),
            config
                .clone()
                .with_lock_name(WRITE_LOCK_NAME)
                .with_max_leases(1),
            LockDriver::exclusive(),
            ordering.clone(),
        );
        let read_engine = LockEngine::new(
            client,
            config.with_lock_name(READ_LOCK_NAME),
            LockDriver::read_shared(WRITE_LOCK_NAME),
            ordering,
        );

        let write = InterProcessMutex::from_engine(write_engine);
        let read = InterProcessMutex::from_engine(read_engine).implied_by(write.holds.clone());
        let write = write.with_successor(read.holds.clone());

        Self { read, write }
    }

    pub fn read_lock(&self) -> &InterProcessMutex<C> {
        &self.read
    }

    pub fn write_lock(&self) -> &InterProcessMutex<C> {
        &self.write
    }
}

#[cfg(test)]
#[path = "rwlock_tests.rs"]
mod tests;
