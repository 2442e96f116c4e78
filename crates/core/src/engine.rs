// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock acquisition engine
//!
//! Creates our sequential node, then loops: list siblings, ask the driver,
//! and if we do not hold the lock, watch the one sibling the driver names and
//! sleep until it changes. Every exit other than success deletes our node.

use crate::client::{join_path, split_path, ClientError, CoordinationClient, Watcher};
use crate::config::LockConfig;
use crate::driver::LockDriver;
use crate::error::LockError;
use crate::ordering::{NodeOrdering, SiblingNode};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Marks protected node names: `_c_<uuid>-<lock name><sequence>`
pub const PROTECTED_PREFIX: &str = "_c_";

/// Runs the acquisition protocol for one lock namespace
#[derive(Clone)]
pub struct LockEngine<C> {
    client: C,
    config: LockConfig,
    driver: LockDriver,
    ordering: NodeOrdering,
}

impl<C: CoordinationClient> LockEngine<C> {
    pub fn new(client: C, config: LockConfig, driver: LockDriver, ordering: NodeOrdering) -> Self {
        Self {
            client,
            config,
            driver,
            ordering,
        }
    }

    /// Engine for a fair mutex (or lease set when `max_leases > 1`)
    pub fn mutex(client: C, config: LockConfig) -> Self {
        let driver = LockDriver::Exclusive {
            max_leases: config.max_leases,
        };
        let ordering = NodeOrdering::new([config.lock_name.clone()]);
        Self::new(client, config, driver, ordering)
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn base_path(&self) -> &str {
        &self.config.base_path
    }

    /// Current lock nodes under the base path, in acquisition order
    pub async fn sorted_children(&self) -> Result<Vec<SiblingNode>, LockError> {
        let children = self.client.children(&self.config.base_path).await?;
        Ok(self.ordering.sort(children))
    }

    /// Create our node and wait until it holds the lock.
    ///
    /// Returns the full path of our node. On timeout, cancellation or any
    /// failure the node is deleted before the error is returned. If the
    /// returned future is dropped mid-wait, deletion is spawned on the
    /// current runtime.
    pub async fn attempt_lock(
        &self,
        timeout: Option<Duration>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, LockError> {
        let start = Instant::now();
        let our_path = self.create_node().await?;
        let cleanup = NodeCleanup::new(
            self.client.clone(),
            our_path.clone(),
            self.config.guaranteed_delete,
        );

        match self.lock_loop(start, timeout, &our_path, cancel).await {
            Ok(()) => {
                cleanup.disarm();
                debug!(
                    node = %our_path,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "lock node holds"
                );
                Ok(our_path)
            }
            Err(e) => {
                cleanup.run().await;
                Err(e)
            }
        }
    }

    /// Delete a node this engine created. If the returned future is dropped
    /// before the delete completes, deletion is spawned on the current
    /// runtime.
    pub async fn release(&self, our_path: &str) -> Result<(), LockError> {
        let cleanup = NodeCleanup::new(
            self.client.clone(),
            our_path.to_string(),
            self.config.guaranteed_delete,
        );
        let result = delete_node(&self.client, our_path, self.config.guaranteed_delete).await;
        cleanup.disarm();
        result
    }

    async fn create_node(&self) -> Result<String, LockError> {
        let base_path = &self.config.base_path;
        let marker = self
            .config
            .protected
            .then(|| format!("{}{}-", PROTECTED_PREFIX, uuid::Uuid::new_v4()));
        let name = match &marker {
            Some(marker) => format!("{}{}", marker, self.config.lock_name),
            None => self.config.lock_name.clone(),
        };

        let created = self
            .client
            .create_sequential_ephemeral(&join_path(base_path, &name), &self.config.node_data)
            .await;

        match (created, marker) {
            (Ok(path), _) => Ok(path),
            // The service may have created the node before the response was
            // lost; adopt it rather than leave an orphan holding a place in line
            (Err(ClientError::ConnectionLoss), Some(marker)) => {
                let children = self.client.children(base_path).await?;
                match children.into_iter().find(|child| child.starts_with(&marker)) {
                    Some(child) => {
                        debug!(node = %child, "recovered protected node after connection loss");
                        Ok(join_path(base_path, &child))
                    }
                    None => Err(ClientError::ConnectionLoss.into()),
                }
            }
            (Err(e), _) => Err(e.into()),
        }
    }

    async fn lock_loop(
        &self,
        start: Instant,
        timeout: Option<Duration>,
        our_path: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), LockError> {
        let base_path = &self.config.base_path;
        let deadline = timeout.map(|t| start + t);
        let (_, our_name) = split_path(our_path);

        while self.client.is_active() {
            let siblings = self.sorted_children().await?;
            let our_index = NodeOrdering::index_of(&siblings, our_name, base_path)?;
            let result = self.driver.evaluate(&siblings, our_index);

            let Some(watch_name) = result.path_to_watch else {
                return Ok(());
            };
            let watch_path = join_path(base_path, &watch_name);

            // Fresh single-slot channel per iteration: the watch callback runs
            // on the client's delivery path and must wake only this waiter
            let (tx, rx) = oneshot::channel();
            let watcher = Watcher::new(move |event| tx.send(event).is_ok());
            match self.client.watch_data(&watch_path, watcher).await {
                Ok(_) => {}
                Err(ClientError::NoNode(_)) => {
                    debug!(watch = %watch_path, "watched node gone before registration, re-evaluating");
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            trace!(node = our_name, index = our_index, watch = %watch_path, "waiting");

            let wait = async {
                match deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, rx).await.ok(),
                    None => Some(rx.await),
                }
            };

            tokio::select! {
                biased;

                _ = cancelled(cancel) => {
                    warn!(node = our_name, base_path = %base_path, "acquisition cancelled");
                    return Err(LockError::Cancelled {
                        base_path: base_path.clone(),
                    });
                }
                woke = wait => match woke {
                    // Fired, or the client dropped the watch; either way
                    // re-evaluate rather than assume we now hold
                    Some(event) => trace!(node = our_name, ?event, "woken"),
                    None => {
                        let waited = start.elapsed();
                        warn!(
                            node = our_name,
                            base_path = %base_path,
                            waited_ms = waited.as_millis() as u64,
                            "timed out waiting for lock"
                        );
                        return Err(LockError::Timeout {
                            base_path: base_path.clone(),
                            waited,
                        });
                    }
                },
            }
        }

        Err(LockError::ConnectionLost {
            base_path: base_path.clone(),
        })
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Delete a lock node; an already absent node counts as deleted
async fn delete_node<C: CoordinationClient>(
    client: &C,
    path: &str,
    guaranteed: bool,
) -> Result<(), LockError> {
    match client.delete(path, guaranteed).await {
        Ok(()) => Ok(()),
        Err(ClientError::NoNode(_)) => {
            debug!(path, "lock node already deleted");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Deletes our node unless disarmed; backs every non-success exit
struct NodeCleanup<C: CoordinationClient> {
    client: C,
    path: Option<String>,
    guaranteed: bool,
}

impl<C: CoordinationClient> NodeCleanup<C> {
    fn new(client: C, path: String, guaranteed: bool) -> Self {
        Self {
            client,
            path: Some(path),
            guaranteed,
        }
    }

    fn disarm(mut self) {
        self.path = None;
    }

    async fn run(mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = delete_node(&self.client, &path, self.guaranteed).await {
                // The session owning an ephemeral node takes it down eventually
                warn!(path = %path, error = %e, "failed to delete lock node");
            }
        }
    }
}

impl<C: CoordinationClient> Drop for NodeCleanup<C> {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = self.client.clone();
                let guaranteed = self.guaranteed;
                handle.spawn(async move {
                    if let Err(e) = delete_node(&client, &path, guaranteed).await {
                        warn!(path = %path, error = %e, "failed to delete abandoned lock node");
                    }
                });
            }
            Err(_) => warn!(path = %path, "acquisition dropped outside a runtime, node left to session expiry"),
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
