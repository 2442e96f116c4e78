// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process coordination service
//!
//! `MemoryEnsemble` models one shared namespace; each `MemorySession` is a
//! client session against it. Ephemeral nodes die with their session and
//! watches are one-shot, which is all the lock protocol relies on.

use super::{
    join_path, split_path, ClientError, CoordinationClient, WatchKind, WatchedEvent, Watcher,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

type SessionId = u64;

/// Client operation kinds, used for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    Create,
    Children,
    Watch,
    Delete,
}

/// Recorded client call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    Create { session: u64, path_prefix: String },
    Children { session: u64, parent: String },
    Watch { session: u64, path: String },
    Delete { session: u64, path: String, guaranteed: bool },
}

impl ClientCall {
    pub fn session(&self) -> u64 {
        match self {
            ClientCall::Create { session, .. }
            | ClientCall::Children { session, .. }
            | ClientCall::Watch { session, .. }
            | ClientCall::Delete { session, .. } => *session,
        }
    }
}

struct MemoryNode {
    data: Vec<u8>,
    ephemeral_owner: Option<SessionId>,
}

struct PendingWatch {
    session: SessionId,
    watcher: Watcher,
}

#[derive(Default)]
struct EnsembleState {
    nodes: BTreeMap<String, MemoryNode>,
    /// Next sequence number per parent path
    sequences: HashMap<String, u64>,
    watches: HashMap<String, Vec<PendingWatch>>,
    closed_sessions: HashSet<SessionId>,
    next_session: SessionId,
    /// Node-change events that reached a live listener
    fired: u64,
    calls: Vec<ClientCall>,
}

impl EnsembleState {
    /// Remove a node and hand back the watches it triggers
    fn remove_node(&mut self, path: &str) -> Option<Vec<PendingWatch>> {
        self.nodes.remove(path)?;
        Some(self.watches.remove(path).unwrap_or_default())
    }

    fn child_names(&self, parent: &str) -> Vec<String> {
        let prefix = join_path(parent, "");
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .map(|(path, _)| &path[prefix.len()..])
            .filter(|name| !name.is_empty() && !name.contains('/'))
            .map(str::to_string)
            .collect()
    }
}


/// Shared in-process namespace
#[derive(Clone, Default)]
pub struct MemoryEnsemble {
    state: Arc<Mutex<EnsembleState>>,
}

impl MemoryEnsemble {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, EnsembleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fire watches outside the state lock so callbacks may call back in.
    /// Only node changes that reach a live listener are counted.
    fn deliver(&self, triggered: Vec<PendingWatch>, kind: WatchKind, path: &str) {
        let delivered = triggered
            .into_iter()
            .map(|pending| {
                pending.watcher.fire(WatchedEvent {
                    kind,
                    path: path.to_string(),
                })
            })
            .filter(|delivered| *delivered)
            .count() as u64;
        if kind == WatchKind::NodeDeleted {
            self.state().fired += delivered;
        }
    }

    /// Open a new client session
    pub fn connect(&self) -> MemorySession {
        let id = {
            let mut state = self.state();
            state.next_session += 1;
            state.next_session
        };
        MemorySession {
            ensemble: self.clone(),
            id,
            faults: Arc::new(Mutex::new(Faults::default())),
        }
    }

    /// Sorted child names of `parent`
    pub fn children_of(&self, parent: &str) -> Vec<String> {
        let mut names = self.state().child_names(parent);
        names.sort();
        names
    }

    pub fn exists(&self, path: &str) -> bool {
        self.state().nodes.contains_key(path)
    }

    pub fn data(&self, path: &str) -> Option<Vec<u8>> {
        self.state().nodes.get(path).map(|n| n.data.clone())
    }

    /// Delete a node out-of-band, as another actor or an operator would.
    /// Returns false if the node did not exist.
    pub fn remove(&self, path: &str) -> bool {
        let triggered = self.state().remove_node(path);
        match triggered {
            Some(triggered) => {
                self.deliver(triggered, WatchKind::NodeDeleted, path);
                true
            }
            None => false,
        }
    }

    /// Number of registered, not yet fired watches on `path`
    pub fn pending_watches(&self, path: &str) -> usize {
        self.state().watches.get(path).map_or(0, Vec::len)
    }

    /// Watches fired by node changes that reached a live listener
    pub fn fired_watches(&self) -> u64 {
        self.state().fired
    }

    /// Every call made by every session, in order
    pub fn calls(&self) -> Vec<ClientCall> {
        self.state().calls.clone()
    }
}

#[derive(Default)]
struct Faults {
    fail_next: Vec<(ClientOp, ClientError)>,
    lose_create_response: bool,
}

/// One client session against a [`MemoryEnsemble`]
#[derive(Clone)]
pub struct MemorySession {
    ensemble: MemoryEnsemble,
    id: SessionId,
    faults: Arc<Mutex<Faults>>,
}

impl MemorySession {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// End the session: its ephemeral nodes are deleted and its pending
    /// watches are told the session is gone.
    pub fn close(&self) {
        let (deleted, orphaned) = {
            let mut state = self.ensemble.state();
            if !state.closed_sessions.insert(self.id) {
                return;
            }

            let owned: Vec<String> = state
                .nodes
                .iter()
                .filter(|(_, node)| node.ephemeral_owner == Some(self.id))
                .map(|(path, _)| path.clone())
                .collect();
            let deleted: Vec<_> = owned
                .into_iter()
                .filter_map(|path| state.remove_node(&path).map(|w| (path, w)))
                .collect();

            let mut orphaned = Vec::new();
            for (path, pending) in state.watches.iter_mut() {
                let (mine, others): (Vec<_>, Vec<_>) =
                    pending.drain(..).partition(|p| p.session == self.id);
                *pending = others;
                if !mine.is_empty() {
                    orphaned.push((path.clone(), mine));
                }
            }
            state.watches.retain(|_, pending| !pending.is_empty());
            (deleted, orphaned)
        };

        for (path, triggered) in deleted {
            self.ensemble.deliver(triggered, WatchKind::NodeDeleted, &path);
        }
        for (path, watches) in orphaned {
            self.ensemble.deliver(watches, WatchKind::SessionClosed, &path);
        }
    }

    /// Make the next call of kind `op` fail with `err` without touching the
    /// namespace
    pub fn fail_next(&self, op: ClientOp, err: ClientError) {
        self.faults().fail_next.push((op, err));
    }

    /// Make the next create succeed on the service but report
    /// `ConnectionLoss` to the caller
    pub fn lose_next_create_response(&self) {
        self.faults().lose_create_response = true;
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn injected(&self, op: ClientOp) -> Result<(), ClientError> {
        let mut faults = self.faults();
        match faults.fail_next.iter().position(|(o, _)| *o == op) {
            Some(idx) => Err(faults.fail_next.remove(idx).1),
            None => Ok(()),
        }
    }

    fn record(&self, state: &mut EnsembleState, call: ClientCall) -> Result<(), ClientError> {
        state.calls.push(call);
        if state.closed_sessions.contains(&self.id) {
            return Err(ClientError::SessionExpired);
        }
        Ok(())
    }
}

#[async_trait]
impl CoordinationClient for MemorySession {
    async fn create_sequential_ephemeral(
        &self,
        path_prefix: &str,
        data: &[u8],
    ) -> Result<String, ClientError> {
        self.injected(ClientOp::Create)?;

        let path = {
            let mut state = self.ensemble.state();
            self.record(
                &mut state,
                ClientCall::Create {
                    session: self.id,
                    path_prefix: path_prefix.to_string(),
                },
            )?;

            let (parent, _) = split_path(path_prefix);
            let counter = state.sequences.entry(parent.to_string()).or_insert(0);
            let sequence = *counter;
            *counter += 1;

            let path = format!("{}{:010}", path_prefix, sequence);
            state.nodes.insert(
                path.clone(),
                MemoryNode {
                    data: data.to_vec(),
                    ephemeral_owner: Some(self.id),
                },
            );
            path
        };

        if std::mem::take(&mut self.faults().lose_create_response) {
            return Err(ClientError::ConnectionLoss);
        }
        Ok(path)
    }

    async fn children(&self, parent: &str) -> Result<Vec<String>, ClientError> {
        self.injected(ClientOp::Children)?;

        let mut state = self.ensemble.state();
        self.record(
            &mut state,
            ClientCall::Children {
                session: self.id,
                parent: parent.to_string(),
            },
        )?;
        Ok(state.child_names(parent))
    }

    async fn watch_data(&self, path: &str, watcher: Watcher) -> Result<Vec<u8>, ClientError> {
        self.injected(ClientOp::Watch)?;

        let mut state = self.ensemble.state();
        self.record(
            &mut state,
            ClientCall::Watch {
                session: self.id,
                path: path.to_string(),
            },
        )?;

        let data = match state.nodes.get(path) {
            Some(node) => node.data.clone(),
            None => return Err(ClientError::NoNode(path.to_string())),
        };
        state
            .watches
            .entry(path.to_string())
            .or_default()
            .push(PendingWatch {
                session: self.id,
                watcher,
            });
        Ok(data)
    }

    async fn delete(&self, path: &str, guaranteed: bool) -> Result<(), ClientError> {
        self.injected(ClientOp::Delete)?;

        let triggered = {
            let mut state = self.ensemble.state();
            let recorded = self.record(
                &mut state,
                ClientCall::Delete {
                    session: self.id,
                    path: path.to_string(),
                    guaranteed,
                },
            );
            // A guaranteed delete outlives the session that issued it
            if let Err(e) = recorded {
                if !guaranteed {
                    return Err(e);
                }
            }
            state.remove_node(path)
        };

        if let Some(triggered) = triggered {
            self.ensemble.deliver(triggered, WatchKind::NodeDeleted, path);
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.ensemble.state().closed_sessions.contains(&self.id)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
