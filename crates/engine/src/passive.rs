// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Passive mirror: replicated lock state on a standby instance
//!
//! A mirror never executes lock operations. It reaches the active's state only
//! through snapshots and updates, and has no method that accepts a
//! `LockOperation`. Snapshots are only valid inside a partition sync bracket,
//! which itself sits inside a whole-instance sync window. Updates are valid
//! for any partition that has been synced, in strict sequence order.
//! Every replicated lock must route to the partition it arrives in and carry
//! a well-formed state.
//!
//! Any protocol violation poisons the mirror.

use crate::active::{ActiveCoordinator, GrantSender};
use crate::error::{FailoverError, ProtocolViolation};
use rwl_core::{
    LockName, LockState, LockUpdate, Partition, PartitionId, PartitionRouter, SyncMessage,
    SyncSnapshot,
};

/// Lifecycle status of a mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorStatus {
    /// Accepting replication
    Standby,
    /// Stopped accepting replication ahead of promotion
    Frozen,
    /// Saw a protocol violation
    Failed,
    /// Became the active coordinator
    Promoted,
    Destroyed,
}

impl std::fmt::Display for MirrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MirrorStatus::Standby => "standby",
            MirrorStatus::Frozen => "frozen",
            MirrorStatus::Failed => "failed",
            MirrorStatus::Promoted => "promoted",
            MirrorStatus::Destroyed => "destroyed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
struct MirrorPartition {
    partition: Partition,
    synced: bool,
}

/// Standby copy of every partition of an active coordinator
#[derive(Debug, Clone)]
pub struct PassiveMirror {
    router: PartitionRouter,
    partitions: Vec<MirrorPartition>,
    /// Whole-instance sync window is open
    syncing: bool,
    /// Partition whose sync bracket is open
    open_partition: Option<PartitionId>,
    status: MirrorStatus,
}

impl PassiveMirror {
    /// Create a mirror with nothing synced yet
    pub fn create_new(router: PartitionRouter) -> Self {
        Self {
            router,
            partitions: Self::empty_partitions(&router),
            syncing: false,
            open_partition: None,
            status: MirrorStatus::Standby,
        }
    }

    /// Rebuild a mirror from partition dumps kept across a restart
    ///
    /// Partitions without a dump stay unsynced until the next catch-up.
    pub fn load_existing(
        router: PartitionRouter,
        snapshots: Vec<SyncSnapshot>,
    ) -> Result<Self, ProtocolViolation> {
        let mut mirror = Self::create_new(router);
        for snapshot in snapshots {
            let id = snapshot.partition;
            mirror.check_snapshot(&snapshot)?;
            mirror.partitions[id.index()] = MirrorPartition {
                partition: Partition::from_snapshot(snapshot),
                synced: true,
            };
        }
        tracing::info!(
            synced = mirror.partitions.iter().filter(|p| p.synced).count(),
            "mirror loaded"
        );
        Ok(mirror)
    }

    fn empty_partitions(router: &PartitionRouter) -> Vec<MirrorPartition> {
        router
            .ids()
            .map(|id| MirrorPartition {
                partition: Partition::new(id),
                synced: false,
            })
            .collect()
    }

    pub fn status(&self) -> MirrorStatus {
        self.status
    }

    pub fn router(&self) -> &PartitionRouter {
        &self.router
    }

    /// Drop all mirrored state and wait for a fresh catch-up window
    ///
    /// Used when re-attaching to a new active. A failed mirror stays failed.
    pub fn reset(&mut self) {
        if matches!(self.status, MirrorStatus::Standby | MirrorStatus::Frozen) {
            self.partitions = Self::empty_partitions(&self.router);
            self.syncing = false;
            self.open_partition = None;
            self.status = MirrorStatus::Standby;
        }
    }

    pub fn destroy(&mut self) {
        self.partitions.clear();
        self.syncing = false;
        self.open_partition = None;
        self.status = MirrorStatus::Destroyed;
        tracing::info!("mirror destroyed");
    }

    /// Apply one replication message
    pub fn apply(&mut self, message: SyncMessage) -> Result<(), ProtocolViolation> {
        match message {
            SyncMessage::StartSync => self.start_sync(),
            SyncMessage::EndSync => self.end_sync(),
            SyncMessage::StartPartition { partition } => self.start_sync_partition(partition),
            SyncMessage::EndPartition { partition } => self.end_sync_partition(partition),
            SyncMessage::Snapshot(snapshot) => self.apply_snapshot(snapshot),
            SyncMessage::Update(update) => self.apply_update(update),
        }
    }

    pub fn start_sync(&mut self) -> Result<(), ProtocolViolation> {
        self.guarded(|m| {
            if m.syncing {
                return Err(ProtocolViolation::NestedSync);
            }
            m.syncing = true;
            tracing::debug!("sync window opened");
            Ok(())
        })
    }

    pub fn end_sync(&mut self) -> Result<(), ProtocolViolation> {
        self.guarded(|m| {
            if !m.syncing {
                return Err(ProtocolViolation::OutsideSyncWindow("end_sync"));
            }
            if let Some(open) = m.open_partition {
                return Err(ProtocolViolation::PartitionLeftOpen(open));
            }
            m.syncing = false;
            tracing::info!(
                synced = m.partitions.iter().filter(|p| p.synced).count(),
                "sync window closed"
            );
            Ok(())
        })
    }

    pub fn start_sync_partition(&mut self, partition: PartitionId) -> Result<(), ProtocolViolation> {
        self.guarded(|m| {
            m.check_partition(partition)?;
            if !m.syncing {
                return Err(ProtocolViolation::OutsideSyncWindow("start_partition"));
            }
            if let Some(open) = m.open_partition {
                return Err(ProtocolViolation::NestedPartitionSync {
                    open,
                    opened: partition,
                });
            }
            m.open_partition = Some(partition);
            Ok(())
        })
    }

    pub fn end_sync_partition(&mut self, partition: PartitionId) -> Result<(), ProtocolViolation> {
        self.guarded(|m| {
            m.check_partition(partition)?;
            if m.open_partition != Some(partition) {
                return Err(ProtocolViolation::UnbalancedPartitionSync(partition));
            }
            m.open_partition = None;
            Ok(())
        })
    }

    /// Replace a partition wholesale
    pub fn apply_snapshot(&mut self, snapshot: SyncSnapshot) -> Result<(), ProtocolViolation> {
        self.guarded(|m| {
            let id = snapshot.partition;
            m.check_partition(id)?;
            if m.open_partition != Some(id) {
                return Err(ProtocolViolation::SnapshotOutsideWindow(id));
            }
            m.check_snapshot(&snapshot)?;
            tracing::debug!(partition = %id, seq = snapshot.seq, locks = snapshot.locks.len(), "snapshot installed");
            m.partitions[id.index()] = MirrorPartition {
                partition: Partition::from_snapshot(snapshot),
                synced: true,
            };
            Ok(())
        })
    }

    /// Apply one incremental lock change
    pub fn apply_update(&mut self, update: LockUpdate) -> Result<(), ProtocolViolation> {
        self.guarded(|m| {
            let id = update.partition;
            m.check_partition(id)?;
            m.check_record(id, &update.name, update.state.as_ref())?;
            let slot = &mut m.partitions[id.index()];
            if !slot.synced {
                return Err(ProtocolViolation::UnsyncedPartition(id));
            }
            let expected = slot.partition.seq() + 1;
            if update.seq != expected {
                return Err(ProtocolViolation::OutOfOrder {
                    partition: id,
                    expected,
                    got: update.seq,
                });
            }
            slot.partition.apply_update(update);
            Ok(())
        })
    }

    /// Run `f` if the mirror is accepting input, poisoning it on violation
    fn guarded(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<(), ProtocolViolation>,
    ) -> Result<(), ProtocolViolation> {
        if self.status != MirrorStatus::Standby {
            return Err(ProtocolViolation::Retired(self.status));
        }
        f(self).map_err(|v| self.reject(v))
    }

    /// Record a fatal violation and retire the mirror
    pub(crate) fn reject(&mut self, violation: ProtocolViolation) -> ProtocolViolation {
        if self.status == MirrorStatus::Standby {
            self.status = MirrorStatus::Failed;
        }
        tracing::error!(error = %violation, "mirror protocol violation");
        violation
    }

    fn check_partition(&self, partition: PartitionId) -> Result<(), ProtocolViolation> {
        if self.router.contains(partition) && partition.index() < self.partitions.len() {
            Ok(())
        } else {
            Err(ProtocolViolation::UnknownPartition {
                partition,
                partitions: self.router.partitions(),
            })
        }
    }

    /// A replicated lock belongs to `partition` and is well formed
    fn check_record(
        &self,
        partition: PartitionId,
        name: &LockName,
        state: Option<&LockState>,
    ) -> Result<(), ProtocolViolation> {
        let routed = self.router.route(name);
        if routed != partition {
            return Err(ProtocolViolation::MisroutedLock {
                name: name.clone(),
                partition,
                routed,
            });
        }
        if let Some(state) = state {
            state
                .check()
                .map_err(|defect| ProtocolViolation::MalformedLock {
                    name: name.clone(),
                    defect,
                })?;
        }
        Ok(())
    }

    /// Records are strictly ordered by name and individually valid
    fn check_snapshot(&self, snapshot: &SyncSnapshot) -> Result<(), ProtocolViolation> {
        let id = snapshot.partition;
        self.check_partition(id)?;
        let mut previous: Option<&LockName> = None;
        for record in &snapshot.locks {
            if previous.is_some_and(|p| p >= &record.name) {
                return Err(ProtocolViolation::UnorderedSnapshot {
                    partition: id,
                    name: record.name.clone(),
                });
            }
            self.check_record(id, &record.name, Some(&record.state))?;
            previous = Some(&record.name);
        }
        Ok(())
    }

    pub fn is_synced(&self, partition: PartitionId) -> bool {
        self.partitions
            .get(partition.index())
            .is_some_and(|p| p.synced)
    }

    /// Every partition synced and no sync window open
    pub fn is_caught_up(&self) -> bool {
        !self.syncing
            && !self.partitions.is_empty()
            && self.partitions.iter().all(|p| p.synced)
    }

    /// Mirrored dump of one partition
    pub fn export(&self, partition: PartitionId) -> Result<SyncSnapshot, ProtocolViolation> {
        self.check_partition(partition)?;
        Ok(self.partitions[partition.index()].partition.snapshot())
    }

    pub fn lock_state(&self, name: &LockName) -> Option<&LockState> {
        self.partitions
            .get(self.router.route(name).index())
            .and_then(|p| p.partition.get(name.as_str()))
    }

    /// Whether this mirror could take over right now
    pub fn check_promotable(&self) -> Result<(), FailoverError> {
        if !matches!(self.status, MirrorStatus::Standby | MirrorStatus::Frozen) {
            return Err(FailoverError::NotPromotable(self.status));
        }
        if self.syncing {
            return Err(FailoverError::SyncInProgress);
        }
        if let Some(unsynced) = self.router.ids().find(|id| !self.is_synced(*id)) {
            return Err(FailoverError::PartitionNotSynced(unsynced));
        }
        Ok(())
    }

    /// Stop applying replication
    pub fn freeze(&mut self) -> Result<(), FailoverError> {
        match self.status {
            MirrorStatus::Standby | MirrorStatus::Frozen => {
                self.status = MirrorStatus::Frozen;
                Ok(())
            }
            status => Err(FailoverError::NotPromotable(status)),
        }
    }

    /// Freeze and hand the mirrored partitions to a new active coordinator
    ///
    /// Holders and waiters carry over exactly as last mirrored; nothing is
    /// replayed. The mirror is left in `Promoted` status with no state.
    pub fn promote(&mut self, grants: GrantSender) -> Result<ActiveCoordinator, FailoverError> {
        self.check_promotable()?;
        self.freeze()?;
        let partitions: Vec<Partition> = std::mem::take(&mut self.partitions)
            .into_iter()
            .map(|p| p.partition)
            .collect();
        self.status = MirrorStatus::Promoted;
        tracing::info!(partitions = partitions.len(), "mirror promoted");
        Ok(ActiveCoordinator::from_partitions(
            self.router,
            partitions,
            grants,
        ))
    }
}

#[cfg(test)]
#[path = "passive_tests.rs"]
mod tests;
