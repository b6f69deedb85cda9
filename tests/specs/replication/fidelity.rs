//! Replication fidelity specs
//!
//! A mirror fed the active's ordered stream equals the active lock by lock.

use crate::prelude::*;
use similar_asserts::assert_eq;

#[test]
fn mirror_tracks_active_after_every_operation() {
    let entity = Entity::new(4);
    let (mut mirror, mut rx) = entity.mirror("m1");
    feed(&mut mirror, &mut rx);

    let script: &[(&str, &str, LockOperation)] = &[
        ("S1", "a", LockOperation::ACQUIRE_WRITE),
        ("S2", "a", LockOperation::ACQUIRE_READ),
        ("S3", "a", LockOperation::ACQUIRE_READ),
        ("S4", "b", LockOperation::TRY_ACQUIRE_READ),
        ("S1", "b", LockOperation::TRY_ACQUIRE_WRITE),
        ("S1", "a", LockOperation::Release),
        ("S4", "a", LockOperation::ACQUIRE_WRITE),
        ("S2", "a", LockOperation::Release),
        ("S3", "a", LockOperation::Release),
        ("S4", "b", LockOperation::Release),
    ];
    for (who, name, operation) in script {
        entity.op(who, name, *operation);
        feed(&mut mirror, &mut rx);
        entity.assert_mirrored(&mirror);
    }

    entity.active.disconnect(&session("S4"));
    feed(&mut mirror, &mut rx);
    entity.assert_mirrored(&mirror);
    assert!(entity.active.lock_names().is_empty());
}

#[test]
fn late_mirror_catches_up_from_snapshots() {
    let entity = Entity::new(3);
    for i in 0..12 {
        let name = format!("lock-{}", i);
        entity.op("writer", &name, LockOperation::ACQUIRE_WRITE);
        entity.op("reader", &name, LockOperation::ACQUIRE_READ);
    }

    let (mut mirror, mut rx) = entity.mirror("late");
    feed(&mut mirror, &mut rx);

    assert!(mirror.is_caught_up());
    entity.assert_mirrored(&mirror);
}

#[test]
fn replication_stream_is_bracketed_and_sequenced() {
    let entity = Entity::new(1);
    let (_mirror, mut rx) = entity.mirror("m1");
    entity.op("S1", "a", LockOperation::ACQUIRE_READ);
    entity.op("S2", "b", LockOperation::ACQUIRE_READ);

    let mut stream = Vec::new();
    while let Ok(message) = rx.try_recv() {
        stream.push(message);
    }

    let kinds: Vec<&str> = stream.iter().map(|m| m.kind()).collect();
    assert_eq!(
        kinds,
        vec!["start_sync", "start_partition", "snapshot", "end_partition", "end_sync", "update", "update"]
    );
    let seqs: Vec<u64> = stream
        .iter()
        .filter_map(|m| match m {
            SyncMessage::Update(update) => Some(update.seq),
            _ => None,
        })
        .collect();
    assert_eq!(seqs, vec![1, 2]);
}
