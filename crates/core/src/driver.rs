// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Acquisition predicates
//!
//! Given the ordered siblings and our position, decide whether we hold the
//! lock and, if not, the single sibling whose disappearance can change that.

use crate::ordering::SiblingNode;

/// Outcome of evaluating a driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PredicateResults {
    pub holds: bool,
    /// Name of the sibling to watch; `None` when the lock is held
    pub path_to_watch: Option<String>,
}

impl PredicateResults {
    pub fn held() -> Self {
        Self {
            holds: true,
            path_to_watch: None,
        }
    }

    pub fn watch(name: impl Into<String>) -> Self {
        Self {
            holds: false,
            path_to_watch: Some(name.into()),
        }
    }
}

/// Acquisition rule for one lock flavour
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockDriver {
    /// Fair exclusive lock; with `max_leases > 1` the first `max_leases`
    /// nodes hold concurrently. Waiters watch the node `max_leases` places
    /// ahead of them, so one release wakes one waiter.
    Exclusive { max_leases: u32 },
    /// Shared read lock. Readers hold until a write node precedes them and
    /// then watch the first such writer; earlier readers never block them.
    ReadShared { write_tag: String },
}

impl LockDriver {
    pub fn exclusive() -> Self {
        LockDriver::Exclusive { max_leases: 1 }
    }

    pub fn read_shared(write_tag: impl Into<String>) -> Self {
        LockDriver::ReadShared {
            write_tag: write_tag.into(),
        }
    }

    /// `our_index` must be a valid index into `siblings`
    pub fn evaluate(&self, siblings: &[SiblingNode], our_index: usize) -> PredicateResults {
        match self {
            LockDriver::Exclusive { max_leases } => {
                let max_leases = (*max_leases).max(1) as usize;
                if our_index < max_leases {
                    PredicateResults::held()
                } else {
                    PredicateResults::watch(siblings[our_index - max_leases].name.clone())
                }
            }
            LockDriver::ReadShared { write_tag } => {
                let first_write = siblings[..our_index]
                    .iter()
                    .find(|node| node.has_tag(write_tag));
                match first_write {
                    Some(writer) => PredicateResults::watch(writer.name.clone()),
                    None => PredicateResults::held(),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
