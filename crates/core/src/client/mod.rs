// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination service client abstraction
//!
//! The lock protocol needs only a handful of primitives from the service:
//! sequential ephemeral nodes, child listings, one-shot watches and deletes.

mod memory;
mod traced;

pub use memory::{ClientCall, ClientOp, MemoryEnsemble, MemorySession};
pub use traced::TracedClient;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from coordination service calls
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The node does not exist. During watch registration this is the
    /// transient "predecessor already gone" signal, not a failure.
    #[error("no node: {0}")]
    NoNode(String),
    #[error("connection loss")]
    ConnectionLoss,
    #[error("session expired")]
    SessionExpired,
    #[error("service error: {0}")]
    Service(String),
}

/// What happened to a watched node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    NodeDeleted,
    /// The session that registered the watch ended before the node changed
    SessionClosed,
}

/// Notification delivered to a [`Watcher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub kind: WatchKind,
    pub path: String,
}

/// One-shot notification callback registered against a single node.
///
/// Fires at most once. Dropping an unfired watcher is how a client signals
/// that the watch can no longer fire.
///
/// The callback returns whether anyone was still listening; a waiter that
/// timed out or was cancelled leaves a watcher that returns `false`.
pub struct Watcher(Box<dyn FnOnce(WatchedEvent) -> bool + Send + 'static>);

impl Watcher {
    pub fn new(f: impl FnOnce(WatchedEvent) -> bool + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// Deliver `event`; false if the listener is gone
    pub fn fire(self, event: WatchedEvent) -> bool {
        (self.0)(event)
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Watcher")
    }
}

/// Client for a hierarchical coordination service (ZooKeeper-like).
///
/// Paths are `/`-separated. Session management, reconnects and retry policy
/// belong to implementations, not to callers.
#[async_trait]
pub trait CoordinationClient: Clone + Send + Sync + 'static {
    /// Create an ephemeral node whose name is `path_prefix` plus a
    /// service-assigned, strictly increasing sequence suffix. Returns the full
    /// path of the created node. Missing parents are created as needed.
    async fn create_sequential_ephemeral(
        &self,
        path_prefix: &str,
        data: &[u8],
    ) -> Result<String, ClientError>;

    /// Names (not paths) of the children of `parent`, in no particular order
    async fn children(&self, parent: &str) -> Result<Vec<String>, ClientError>;

    /// Fetch the node's data and register `watcher` for its next change or
    /// deletion. Fails with [`ClientError::NoNode`] (and drops the watcher) if
    /// the node does not exist.
    async fn watch_data(&self, path: &str, watcher: Watcher) -> Result<Vec<u8>, ClientError>;

    /// Delete a node. Deleting an absent node succeeds. With `guaranteed`, the
    /// implementation keeps trying across reconnects until the service
    /// confirms removal.
    async fn delete(&self, path: &str, guaranteed: bool) -> Result<(), ClientError>;

    /// Whether the underlying session is usable
    fn is_active(&self) -> bool;
}

/// Join a parent path and a child name
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, child)
    } else {
        format!("{}/{}", parent, child)
    }
}

/// Split a full node path into its parent path and name
pub fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(0) => ("/", &path[1..]),
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}
