// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replication links from an active coordinator to its mirrors
//!
//! Each mirror gets an ordered channel. Messages for a partition are sent while
//! that partition is locked on the active side, so a mirror always sees them in
//! the order they were generated. A mirror only receives updates for partitions
//! it has already been sent a snapshot of.

use crate::error::CoordinatorError;
use crate::role::{EntityMessage, Role};
use rwl_core::{LockUpdate, Partition, PartitionId, SyncMessage};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Sender half of a replication link
pub type ReplicationSender = mpsc::UnboundedSender<SyncMessage>;
/// Receiver half of a replication link
pub type ReplicationReceiver = mpsc::UnboundedReceiver<SyncMessage>;

pub fn replication_channel() -> (ReplicationSender, ReplicationReceiver) {
    mpsc::unbounded_channel()
}

/// Identity of a mirror instance
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MirrorId(pub String);

impl MirrorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MirrorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Replica {
    id: MirrorId,
    tx: ReplicationSender,
    /// Partitions whose snapshot has been sent
    synced: Vec<bool>,
}

impl Replica {
    fn is_synced(&self, partition: PartitionId) -> bool {
        self.synced.get(partition.index()).copied().unwrap_or(false)
    }
}

/// The set of mirrors attached to one active coordinator
#[derive(Default)]
pub(crate) struct Replicas {
    replicas: Mutex<Vec<Replica>>,
}

impl Replicas {
    fn lock(&self) -> MutexGuard<'_, Vec<Replica>> {
        self.replicas.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a mirror and open its catch-up window
    pub(crate) fn register(&self, id: MirrorId, tx: ReplicationSender, partitions: u32) {
        let mut replicas = self.lock();
        replicas.retain(|r| r.id != id);
        if tx.send(SyncMessage::StartSync).is_err() {
            tracing::warn!(mirror = %id, "replication link closed before attach");
            return;
        }
        replicas.push(Replica {
            id,
            tx,
            synced: vec![false; partitions as usize],
        });
    }

    /// Send one partition's snapshot bracket; caller holds the partition lock
    pub(crate) fn sync_partition(&self, id: &MirrorId, partition: &Partition) {
        let mut replicas = self.lock();
        let Some(replica) = replicas.iter_mut().find(|r| &r.id == id) else {
            return;
        };
        let pid = partition.id();
        let sent = replica
            .tx
            .send(SyncMessage::StartPartition { partition: pid })
            .is_ok()
            && replica
                .tx
                .send(SyncMessage::Snapshot(partition.snapshot()))
                .is_ok()
            && replica
                .tx
                .send(SyncMessage::EndPartition { partition: pid })
                .is_ok();
        if sent {
            if let Some(flag) = replica.synced.get_mut(pid.index()) {
                *flag = true;
            }
        }
    }

    /// Close a mirror's catch-up window
    pub(crate) fn finish(&self, id: &MirrorId) {
        let replicas = self.lock();
        if let Some(replica) = replicas.iter().find(|r| &r.id == id) {
            let _ = replica.tx.send(SyncMessage::EndSync);
        }
    }

    /// Push a lock change to every mirror synced for its partition
    ///
    /// Mirrors whose link has closed are dropped.
    pub(crate) fn publish(&self, update: &LockUpdate) {
        let mut replicas = self.lock();
        replicas.retain(|replica| {
            if !replica.is_synced(update.partition) {
                return true;
            }
            let sent = replica
                .tx
                .send(SyncMessage::Update(update.clone()))
                .is_ok();
            if !sent {
                tracing::warn!(mirror = %replica.id, "replication link closed, detaching mirror");
            }
            sent
        });
    }

    pub(crate) fn detach(&self, id: &MirrorId) -> bool {
        let mut replicas = self.lock();
        let before = replicas.len();
        replicas.retain(|r| &r.id != id);
        replicas.len() != before
    }

    pub(crate) fn detach_all(&self) {
        self.lock().clear();
    }

    pub(crate) fn ids(&self) -> Vec<MirrorId> {
        self.lock().iter().map(|r| r.id.clone()).collect()
    }
}

/// Feed a replication stream into a mirror until the stream closes
///
/// Returns the number of messages applied. Stops at the first error; a
/// protocol violation has already poisoned the mirror by then.
pub async fn pump(
    mirror: MirrorId,
    mut rx: ReplicationReceiver,
    role: Arc<Mutex<Role>>,
) -> Result<u64, CoordinatorError> {
    let mut applied = 0u64;
    while let Some(message) = rx.recv().await {
        let kind = message.kind();
        let result = {
            let mut role = role.lock().unwrap_or_else(|e| e.into_inner());
            role.invoke(EntityMessage::Sync(message))
        };
        if let Err(e) = result {
            tracing::error!(%mirror, kind, error = %e, "replication stopped");
            return Err(e);
        }
        applied += 1;
    }
    tracing::debug!(%mirror, applied, "replication stream closed");
    Ok(applied)
}

#[cfg(test)]
#[path = "replication_tests.rs"]
mod tests;
