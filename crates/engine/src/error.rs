// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for coordinator roles

use crate::passive::MirrorStatus;
use rwl_core::{LockDefect, LockError, LockName, LockOperation, PartitionId, RouterError, SessionId};
use thiserror::Error;

/// A broken replication invariant
///
/// Fatal for the instance that observes it: a mirror that reports one is
/// poisoned and accepts no further input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("lock operation {operation:?} on {name} from {session} delivered to a passive mirror")]
    OperationAtPassive {
        session: SessionId,
        name: LockName,
        operation: LockOperation,
    },
    #[error("disconnect of {0} delivered to a passive mirror")]
    DisconnectAtPassive(SessionId),
    #[error("sync message {0} delivered to the active coordinator")]
    SyncAtActive(&'static str),
    #[error("{0} received outside a sync window")]
    OutsideSyncWindow(&'static str),
    #[error("sync window opened twice")]
    NestedSync,
    #[error("partition {opened} sync started while partition {open} is still open")]
    NestedPartitionSync {
        open: PartitionId,
        opened: PartitionId,
    },
    #[error("partition {0} sync ended without a matching start")]
    UnbalancedPartitionSync(PartitionId),
    #[error("sync window closed with partition {0} still open")]
    PartitionLeftOpen(PartitionId),
    #[error("snapshot for partition {0} outside its sync window")]
    SnapshotOutsideWindow(PartitionId),
    #[error("update for partition {0} before it was synced")]
    UnsyncedPartition(PartitionId),
    #[error("update for partition {partition} has seq {got}, expected {expected}")]
    OutOfOrder {
        partition: PartitionId,
        expected: u64,
        got: u64,
    },
    #[error("partition {partition} does not exist ({partitions} partitions)")]
    UnknownPartition {
        partition: PartitionId,
        partitions: u32,
    },
    #[error("lock {name} sent for partition {partition} but routes to {routed}")]
    MisroutedLock {
        name: LockName,
        partition: PartitionId,
        routed: PartitionId,
    },
    #[error("snapshot of partition {partition} lists {name} twice or out of order")]
    UnorderedSnapshot {
        partition: PartitionId,
        name: LockName,
    },
    #[error("replicated state of {name} is malformed: {defect}")]
    MalformedLock { name: LockName, defect: LockDefect },
    #[error("mirror is {0} and accepts no input")]
    Retired(MirrorStatus),
}

/// Errors raised while promoting a mirror
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    #[error("no mirror is eligible for promotion")]
    NoEligibleMirror,
    #[error("mirror is {0} and cannot be promoted")]
    NotPromotable(MirrorStatus),
    #[error("mirror is still inside a sync window")]
    SyncInProgress,
    #[error("partition {0} was never synced")]
    PartitionNotSynced(PartitionId),
    #[error("instance is already active")]
    AlreadyActive,
}

/// Errors surfaced by a role instance to its host
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("partition {0} does not exist")]
    UnknownPartition(PartitionId),
    #[error("invalid partitioning: {0}")]
    Router(#[from] RouterError),
}

impl CoordinatorError {
    /// Whether the error retires the instance that raised it
    pub fn is_fatal(&self) -> bool {
        matches!(self, CoordinatorError::Protocol(_))
    }
}
