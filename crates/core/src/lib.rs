// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kl-core: fair distributed locks over a coordination service
//!
//! This crate provides:
//! - A client trait for ephemeral sequential nodes and one-shot watches
//! - An in-memory ensemble implementing that trait
//! - The predecessor-watch acquisition engine and its drivers
//! - A reentrant inter-process mutex and a read/write lock built on it

pub mod client;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod mutex;
pub mod ordering;
pub mod owner;
pub mod rwlock;

pub use client::{
    ClientCall, ClientError, ClientOp, CoordinationClient, MemoryEnsemble, MemorySession,
    TracedClient, WatchKind, WatchedEvent, Watcher,
};
pub use config::LockConfig;
pub use driver::{LockDriver, PredicateResults};
pub use engine::LockEngine;
pub use error::LockError;
pub use mutex::{InterProcessMutex, LockRecord};
pub use ordering::{NodeOrdering, SiblingNode};
pub use owner::OwnerId;
pub use rwlock::{ReadWriteLock, READ_LOCK_NAME, WRITE_LOCK_NAME};
