// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for lock acquisition and release

use crate::client::ClientError;
use crate::owner::OwnerId;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the lock APIs
#[derive(Debug, Error)]
pub enum LockError {
    /// Our own node is missing from the sibling listing (usually the session
    /// that created it expired). Fatal to the current attempt.
    #[error("lock node {node} not found under {base_path}")]
    IndexNotFound { node: String, base_path: String },

    #[error("timed out after {waited:?} waiting for lock {base_path}")]
    Timeout { base_path: String, waited: Duration },

    #[error("acquisition of lock {base_path} was cancelled")]
    Cancelled { base_path: String },

    #[error("{owner} does not own the lock {base_path}")]
    NotOwner { owner: OwnerId, base_path: String },

    /// Internal consistency violation: more releases than acquisitions were
    /// applied to a single record.
    #[error("hold count for {owner} on lock {base_path} went negative")]
    NegativeHoldCount { owner: OwnerId, base_path: String },

    #[error("connection to the coordination service lost while waiting for {base_path}")]
    ConnectionLost { base_path: String },

    #[error("coordination service error: {0}")]
    Client(#[from] ClientError),
}
