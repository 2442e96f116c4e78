// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logical lock owners

use serde::{Deserialize, Serialize};

/// Identifies the logical holder of a lock (a thread, a task, a request).
///
/// Reentrancy is tracked per `OwnerId`: two acquisitions with equal ids count
/// as nested holds of one lock, never as two contenders.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Owner bound to the calling OS thread.
    ///
    /// Only meaningful when the caller does not migrate between threads while
    /// holding the lock (blocking code, `current_thread` runtimes).
    pub fn current_thread() -> Self {
        let thread = std::thread::current();
        match thread.name() {
            Some(name) => Self(format!("{}-{:?}", name, thread.id())),
            None => Self(format!("{:?}", thread.id())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_displays_inner_id() {
        assert_eq!(OwnerId::new("worker-7").to_string(), "worker-7");
    }

    #[test]
    fn current_thread_is_stable_within_a_thread() {
        assert_eq!(OwnerId::current_thread(), OwnerId::current_thread());
    }

    #[test]
    fn current_thread_differs_across_threads() {
        let here = OwnerId::current_thread();
        let there = std::thread::spawn(OwnerId::current_thread).join().unwrap();
        assert_ne!(here, there);
    }
}
