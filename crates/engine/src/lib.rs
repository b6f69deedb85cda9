// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Replicated lock coordinator roles: active, passive and failover

mod active;
mod error;
mod failover;
mod passive;
mod replication;
mod role;

pub use active::{grant_channel, ActiveCoordinator, GrantReceiver, GrantSender};
pub use error::{CoordinatorError, FailoverError, ProtocolViolation};
pub use failover::{FailoverController, MirrorHandle, Promotion};
pub use passive::{MirrorStatus, PassiveMirror};
pub use replication::{pump, replication_channel, MirrorId, ReplicationReceiver, ReplicationSender};
pub use role::{EntityMessage, Role};
