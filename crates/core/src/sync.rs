// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replication data exchanged between an active coordinator and its mirrors
//!
//! These messages carry lock state only, never lock operations. Sequence
//! numbers are per partition and increase by one on every state change.

use crate::lock::LockState;
use crate::partition::PartitionId;
use crate::session::LockName;
use serde::{Deserialize, Serialize};

/// One lock and its state within a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub name: LockName,
    pub state: LockState,
}

/// Full dump of a partition, ordered by lock name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub partition: PartitionId,
    /// Sequence number of the last change included
    pub seq: u64,
    pub locks: Vec<LockRecord>,
}

impl SyncSnapshot {
    pub fn empty(partition: PartitionId) -> Self {
        Self {
            partition,
            seq: 0,
            locks: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&LockState> {
        self.locks
            .iter()
            .find(|r| r.name.as_str() == name)
            .map(|r| &r.state)
    }
}

/// New state of one lock after a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockUpdate {
    pub partition: PartitionId,
    pub seq: u64,
    pub name: LockName,
    /// `None` when the lock became idle and was dropped
    pub state: Option<LockState>,
}

/// Messages on the replication stream to a mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Opens the whole-instance catch-up window
    StartSync,
    /// Closes the whole-instance catch-up window
    EndSync,
    StartPartition { partition: PartitionId },
    EndPartition { partition: PartitionId },
    Snapshot(SyncSnapshot),
    Update(LockUpdate),
}

impl SyncMessage {
    /// Partition the message is scoped to, if any
    pub fn partition(&self) -> Option<PartitionId> {
        match self {
            SyncMessage::StartSync | SyncMessage::EndSync => None,
            SyncMessage::StartPartition { partition } | SyncMessage::EndPartition { partition } => {
                Some(*partition)
            }
            SyncMessage::Snapshot(snapshot) => Some(snapshot.partition),
            SyncMessage::Update(update) => Some(update.partition),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::StartSync => "start_sync",
            SyncMessage::EndSync => "end_sync",
            SyncMessage::StartPartition { .. } => "start_partition",
            SyncMessage::EndPartition { .. } => "end_partition",
            SyncMessage::Snapshot(_) => "snapshot",
            SyncMessage::Update(_) => "update",
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
