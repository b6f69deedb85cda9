//! Replication protocol specs
//!
//! Mirrors never execute lock operations and reject malformed streams.

use crate::prelude::*;
use similar_asserts::assert_eq;
use rwl_core::SyncSnapshot;
use rwl_engine::{CoordinatorError, EntityMessage, MirrorStatus, ProtocolViolation, Role};

fn passive(partitions: u32) -> Role {
    Role::Passive(PassiveMirror::create_new(
        PartitionRouter::new(partitions).unwrap(),
    ))
}

#[test]
fn lock_operation_at_passive_is_fatal() {
    let mut role = passive(2);

    let err = role
        .invoke(EntityMessage::Operation {
            session: session("S1"),
            name: lock("L"),
            operation: LockOperation::ACQUIRE_READ,
        })
        .unwrap_err();

    assert!(err.is_fatal());
    let mirror = role.as_passive().unwrap();
    assert_eq!(mirror.status(), MirrorStatus::Failed);

    // Poisoned: even valid sync input is refused
    let mut role = Role::Passive(mirror.clone());
    assert!(matches!(
        role.invoke(EntityMessage::Sync(SyncMessage::StartSync)),
        Err(CoordinatorError::Protocol(ProtocolViolation::Retired(
            MirrorStatus::Failed
        )))
    ));
}

#[test]
fn snapshot_outside_bracket_is_fatal() {
    let mut role = passive(2);

    let err = role
        .invoke(EntityMessage::Sync(SyncMessage::Snapshot(SyncSnapshot::empty(
            PartitionId(0),
        ))))
        .unwrap_err();

    assert!(matches!(
        err,
        CoordinatorError::Protocol(ProtocolViolation::SnapshotOutsideWindow(_))
    ));
    assert_eq!(role.as_passive().unwrap().status(), MirrorStatus::Failed);
}

#[test]
fn gap_in_update_sequence_is_fatal() {
    let entity = Entity::new(1);
    let (mut mirror, mut rx) = entity.mirror("m1");
    feed(&mut mirror, &mut rx);
    entity.op("S1", "a", LockOperation::ACQUIRE_READ);
    entity.op("S2", "a", LockOperation::ACQUIRE_READ);

    // Drop the first update
    rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();

    assert!(matches!(
        mirror.apply(second),
        Err(ProtocolViolation::OutOfOrder {
            expected: 1,
            got: 2,
            ..
        })
    ));
}

#[test]
fn active_refuses_sync_input() {
    let entity = Entity::new(1);
    let mut role = Role::Active(std::sync::Arc::new(entity.active));

    assert!(role
        .invoke(EntityMessage::Sync(SyncMessage::EndSync))
        .unwrap_err()
        .is_fatal());
}
