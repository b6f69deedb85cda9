// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rwl-core: pure state for the replicated read/write lock coordinator
//!
//! This crate provides:
//! - The per-lock read/write state machine with FIFO waiter queues
//! - Partition routing and per-partition lock maps
//! - Replication data (snapshots and incremental updates)
//! - Effect-based grant notification

pub mod id;
pub mod session;
pub mod traced;

// State machines (order matters for dependencies)
pub mod operation;
pub mod effect;
pub mod lock;
pub mod sync;
pub mod partition;
pub mod router;

// Re-exports
pub use effect::{Effect, Event};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use lock::{Hold, LockDefect, LockError, LockInput, LockState, Step, Waiter};
pub use operation::{GrantNotice, LockMode, LockOperation, LockTransition};
pub use partition::{Applied, Partition, PartitionId};
pub use router::{PartitionRouter, RouterError};
pub use session::{LockName, SessionId};
pub use sync::{LockRecord, LockUpdate, SyncMessage, SyncSnapshot};
pub use traced::TracedEffect;
