//! Lock semantics specs
//!
//! Results and grant notices for single-lock operation sequences.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn write_pending_read_grant_then_pending_write() {
    let mut entity = Entity::new(4);

    assert_eq!(entity.op("S1", "L", LockOperation::ACQUIRE_WRITE), LockTransition::Granted);
    assert_eq!(entity.op("S2", "L", LockOperation::ACQUIRE_READ), LockTransition::Pending);
    assert_eq!(entity.op("S1", "L", LockOperation::Release), LockTransition::Released);
    assert_eq!(entity.granted(), vec![("S2".to_string(), LockMode::Read)]);

    assert_eq!(entity.op("S3", "L", LockOperation::ACQUIRE_WRITE), LockTransition::Pending);
    assert!(entity.granted().is_empty());
}

#[test]
fn try_write_granted_then_try_read_rejected() {
    let entity = Entity::new(4);

    assert_eq!(entity.op("S1", "L", LockOperation::TRY_ACQUIRE_WRITE), LockTransition::Granted);
    assert_eq!(entity.op("S2", "L", LockOperation::TRY_ACQUIRE_READ), LockTransition::Rejected);
    assert!(entity.active.lock_state(&lock("L")).unwrap().waiters.is_empty());
}

#[test]
fn earlier_write_beats_later_read() {
    let mut entity = Entity::new(1);
    entity.op("R1", "L", LockOperation::ACQUIRE_READ);
    assert_eq!(entity.op("W", "L", LockOperation::ACQUIRE_WRITE), LockTransition::Pending);
    // Compatible with the current hold, but queued behind the writer
    assert_eq!(entity.op("R2", "L", LockOperation::ACQUIRE_READ), LockTransition::Pending);

    entity.op("R1", "L", LockOperation::Release);
    assert_eq!(entity.granted(), vec![("W".to_string(), LockMode::Write)]);

    entity.op("W", "L", LockOperation::Release);
    assert_eq!(entity.granted(), vec![("R2".to_string(), LockMode::Read)]);
}

#[test]
fn release_without_hold_changes_nothing() {
    let entity = Entity::new(2);
    entity.op("S1", "L", LockOperation::ACQUIRE_WRITE);
    entity.op("S2", "L", LockOperation::ACQUIRE_READ);
    let before = entity.active.lock_state(&lock("L"));

    assert_eq!(entity.op("S3", "L", LockOperation::Release), LockTransition::NotHeld);
    assert_eq!(entity.op("S2", "L", LockOperation::Release), LockTransition::NotHeld);

    assert_eq!(entity.active.lock_state(&lock("L")), before);
}

#[test]
fn reentrant_acquire_is_refused_before_queueing() {
    let entity = Entity::new(2);
    entity.op("S1", "L", LockOperation::ACQUIRE_WRITE);
    entity.op("S2", "L", LockOperation::ACQUIRE_WRITE);

    assert!(entity
        .active
        .handle(&session("S1"), &lock("L"), LockOperation::TRY_ACQUIRE_READ)
        .is_err());
    assert!(entity
        .active
        .handle(&session("S2"), &lock("L"), LockOperation::ACQUIRE_READ)
        .is_err());

    let state = entity.active.lock_state(&lock("L")).unwrap();
    assert_eq!(state.waiters.len(), 1);
}

#[test]
fn released_lock_disappears() {
    let entity = Entity::new(2);
    entity.op("S1", "L", LockOperation::ACQUIRE_READ);
    entity.op("S1", "L", LockOperation::Release);

    assert!(entity.active.lock_state(&lock("L")).is_none());
    assert!(entity.active.lock_names().is_empty());
}
