// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reentrant inter-process mutex
//!
//! Wraps a [`LockEngine`] with per-owner hold counting: an owner that already
//! holds the lock re-enters without touching the coordination service, and
//! the node is deleted only when its last hold is released.

use crate::client::CoordinationClient;
use crate::config::LockConfig;
use crate::engine::LockEngine;
use crate::error::LockError;
use crate::owner::OwnerId;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// One owner's hold on a lock
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRecord {
    pub owner: OwnerId,
    /// Our node; `None` for a read hold granted through a held write lock
    pub node_path: Option<String>,
    pub hold_count: u32,
}

/// Owner → record table. Distinct owners acquire and release concurrently.
pub(crate) type Holds = DashMap<OwnerId, LockRecord>;

/// Fair, reentrant lock shared between processes through the coordination
/// service.
///
/// Cloning shares both the engine and the hold table.
#[derive(Clone)]
pub struct InterProcessMutex<C: CoordinationClient> {
    engine: LockEngine<C>,
    pub(crate) holds: Arc<Holds>,
    /// Holds of another lock that imply this one (write holds imply read)
    implied_by: Option<Arc<Holds>>,
    /// Lock whose implied holds inherit our node on final release
    successor: Option<Arc<Holds>>,
}

impl<C: CoordinationClient> InterProcessMutex<C> {
    pub fn new(client: C, config: LockConfig) -> Self {
        Self::from_engine(LockEngine::mutex(client, config))
    }

    pub fn from_engine(engine: LockEngine<C>) -> Self {
        Self {
            engine,
            holds: Arc::new(DashMap::new()),
            implied_by: None,
            successor: None,
        }
    }

    pub(crate) fn implied_by(mut self, holds: Arc<Holds>) -> Self {
        self.implied_by = Some(holds);
        self
    }

    pub(crate) fn with_successor(mut self, holds: Arc<Holds>) -> Self {
        self.successor = Some(holds);
        self
    }

    pub fn base_path(&self) -> &str {
        self.engine.base_path()
    }

    /// Acquire, waiting up to the configured `acquire_timeout` (forever if
    /// unset)
    pub async fn acquire(&self, owner: &OwnerId) -> Result<(), LockError> {
        let timeout = self.engine.config().acquire_timeout;
        self.internal_lock(owner, timeout, None).await
    }

    /// Acquire, failing with [`LockError::Timeout`] after `timeout`
    pub async fn acquire_timeout(&self, owner: &OwnerId, timeout: Duration) -> Result<(), LockError> {
        self.internal_lock(owner, Some(timeout), None).await
    }

    /// Acquire until `cancel` fires ([`LockError::Cancelled`]) or `timeout`
    /// elapses
    pub async fn acquire_cancellable(
        &self,
        owner: &OwnerId,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), LockError> {
        self.internal_lock(owner, timeout, Some(cancel)).await
    }

    async fn internal_lock(
        &self,
        owner: &OwnerId,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), LockError> {
        if let Some(mut record) = self.holds.get_mut(owner) {
            record.hold_count += 1;
            trace!(owner = %owner, hold_count = record.hold_count, "re-entered lock");
            return Ok(());
        }

        if self
            .implied_by
            .as_ref()
            .is_some_and(|holds| holds.contains_key(owner))
        {
            self.holds.insert(
                owner.clone(),
                LockRecord {
                    owner: owner.clone(),
                    node_path: None,
                    hold_count: 1,
                },
            );
            debug!(owner = %owner, base_path = self.base_path(), "granted through held write lock");
            return Ok(());
        }

        let node_path = self.engine.attempt_lock(timeout, cancel).await?;

        let duplicate = match self.holds.entry(owner.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(LockRecord {
                    owner: owner.clone(),
                    node_path: Some(node_path.clone()),
                    hold_count: 1,
                });
                None
            }
            // The same owner won the lock concurrently from another task;
            // count this as a nested hold and keep a single node
            Entry::Occupied(mut entry) => {
                entry.get_mut().hold_count += 1;
                Some(node_path.clone())
            }
        };
        if let Some(extra) = duplicate {
            warn!(owner = %owner, node = %extra, "owner acquired concurrently, dropping extra node");
            return self.engine.release(&extra).await;
        }

        info!(owner = %owner, node = %node_path, "lock acquired");
        Ok(())
    }

    /// Release one hold. The node is deleted when the last hold goes.
    ///
    /// The last hold's record leaves the table before the node is deleted,
    /// so a concurrent acquire by the same owner queues for a fresh node and
    /// a dropped release cannot leave a zero-count record behind.
    pub async fn release(&self, owner: &OwnerId) -> Result<(), LockError> {
        let record = match self.holds.entry(owner.clone()) {
            Entry::Vacant(_) => {
                return Err(LockError::NotOwner {
                    owner: owner.clone(),
                    base_path: self.base_path().to_string(),
                });
            }
            Entry::Occupied(mut entry) => {
                let Some(remaining) = entry.get().hold_count.checked_sub(1) else {
                    error!(owner = %owner, base_path = self.base_path(), "lock hold count went negative");
                    return Err(LockError::NegativeHoldCount {
                        owner: owner.clone(),
                        base_path: self.base_path().to_string(),
                    });
                };
                if remaining > 0 {
                    entry.get_mut().hold_count = remaining;
                    trace!(owner = %owner, hold_count = remaining, "released nested hold");
                    return Ok(());
                }
                entry.remove()
            }
        };

        let result = match record.node_path {
            Some(path) if self.hand_over(owner, &path) => {
                debug!(owner = %owner, node = %path, "node kept by implied hold");
                Ok(())
            }
            Some(path) => self.engine.release(&path).await,
            None => Ok(()),
        };
        info!(owner = %owner, base_path = self.base_path(), "lock released");
        result
    }

    /// Give our node to a node-less implied hold of the same owner, so the
    /// owner's place in line survives this release
    fn hand_over(&self, owner: &OwnerId, path: &str) -> bool {
        let Some(successor) = &self.successor else {
            return false;
        };
        match successor.get_mut(owner) {
            Some(mut record) if record.node_path.is_none() => {
                record.node_path = Some(path.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        self.holds.contains_key(owner)
    }

    /// True if any owner in this process holds the lock
    pub fn is_acquired_in_this_process(&self) -> bool {
        !self.holds.is_empty()
    }

    pub fn hold_count(&self, owner: &OwnerId) -> Option<u32> {
        self.holds.get(owner).map(|record| record.hold_count)
    }

    /// The node backing `owner`'s hold, if any
    pub fn lock_path(&self, owner: &OwnerId) -> Option<String> {
        self.holds
            .get(owner)
            .and_then(|record| record.node_path.clone())
    }

    /// Names of all current lock nodes (holders and waiters), in line order
    pub async fn participant_nodes(&self) -> Result<Vec<String>, LockError> {
        let siblings = self.engine.sorted_children().await?;
        Ok(siblings.into_iter().map(|node| node.name).collect())
    }
}

#[cfg(test)]
#[path = "mutex_tests.rs"]
mod tests;
