// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client-facing lock operations and their results

use crate::partition::PartitionId;
use crate::session::{LockName, SessionId};
use serde::{Deserialize, Serialize};

/// Access mode requested or held on a lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Shared access, compatible with other readers
    Read,
    /// Exclusive access
    Write,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Read => write!(f, "read"),
            LockMode::Write => write!(f, "write"),
        }
    }
}

/// Operations a client can submit against a named lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "mode", rename_all = "snake_case")]
pub enum LockOperation {
    /// Acquire, queueing behind incompatible holders or earlier waiters
    Acquire(LockMode),
    /// Acquire only if immediately grantable, never queue
    TryAcquire(LockMode),
    /// Release whatever the session holds
    Release,
}

impl LockOperation {
    pub const ACQUIRE_READ: LockOperation = LockOperation::Acquire(LockMode::Read);
    pub const ACQUIRE_WRITE: LockOperation = LockOperation::Acquire(LockMode::Write);
    pub const TRY_ACQUIRE_READ: LockOperation = LockOperation::TryAcquire(LockMode::Read);
    pub const TRY_ACQUIRE_WRITE: LockOperation = LockOperation::TryAcquire(LockMode::Write);
}

/// Immediate result of one lock operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockTransition {
    /// The session now holds the lock
    Granted,
    /// The request was queued; a grant notice follows later
    Pending,
    /// A try-acquire could not be granted immediately
    Rejected,
    /// The session's hold was released
    Released,
    /// Release by a session that held nothing
    NotHeld,
}

/// Asynchronous grant delivered to a session whose request returned `Pending`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantNotice {
    pub partition: PartitionId,
    pub name: LockName,
    pub session: SessionId,
    pub mode: LockMode,
}
