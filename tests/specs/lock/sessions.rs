//! Session disconnect specs

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn disconnect_releases_everything_everywhere() {
    let mut entity = Entity::new(8);
    let names: Vec<String> = (0..20).map(|i| format!("res-{}", i)).collect();
    for name in &names {
        entity.op("gone", name, LockOperation::ACQUIRE_WRITE);
        entity.op("next", name, LockOperation::ACQUIRE_READ);
    }
    entity.op("other", "held-elsewhere", LockOperation::ACQUIRE_WRITE);
    entity.op("gone", "held-elsewhere", LockOperation::ACQUIRE_WRITE);

    assert_eq!(entity.active.disconnect(&session("gone")), names.len() + 1);

    for name in entity.active.lock_names() {
        let state = entity.active.lock_state(&name).unwrap();
        assert!(!state.involves(&session("gone")), "{} still involves gone", name);
    }
    assert_eq!(entity.granted().len(), names.len());
}

#[test]
fn disconnected_waiter_is_never_granted() {
    let mut entity = Entity::new(2);
    entity.op("S1", "L", LockOperation::ACQUIRE_WRITE);
    entity.op("S2", "L", LockOperation::ACQUIRE_WRITE);
    entity.op("S3", "L", LockOperation::ACQUIRE_READ);

    entity.active.disconnect(&session("S2"));
    entity.op("S1", "L", LockOperation::Release);

    assert_eq!(entity.granted(), vec![("S3".to_string(), LockMode::Read)]);
}

#[test]
fn departed_head_waiter_unblocks_compatible_reader() {
    let mut entity = Entity::new(2);
    entity.op("R1", "L", LockOperation::ACQUIRE_READ);
    entity.op("W", "L", LockOperation::ACQUIRE_WRITE);
    entity.op("R2", "L", LockOperation::ACQUIRE_READ);

    entity.active.disconnect(&session("W"));

    assert_eq!(entity.granted(), vec![("R2".to_string(), LockMode::Read)]);
    let state = entity.active.lock_state(&lock("L")).unwrap();
    assert_eq!(state.read_holders().len(), 2);
}
