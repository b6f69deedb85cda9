//! Failover specs
//!
//! Drive a hosted entity through active loss and check what survives.

use crate::prelude::*;
use similar_asserts::assert_eq;
use rwl_core::SequentialIdGen;
use rwl_daemon::{startup_with, Config, Host, LifecycleError};
use rwl_engine::FailoverError;

fn config(content: &str) -> (tempfile::TempDir, Config) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rwld.toml");
    std::fs::write(&path, content).unwrap();
    let config = Config::load(&path).unwrap();
    (dir, config)
}

async fn host(content: &str) -> Host<SequentialIdGen> {
    let (_dir, config) = config(content);
    startup_with(&config, SequentialIdGen::new("client"))
        .await
        .unwrap()
}

#[tokio::test]
async fn promoted_mirror_serves_last_replicated_state() {
    let mut host = host("partitions = 8\nmirrors = 2\n").await;
    let writer = host.open_session();
    let reader = host.open_session();
    for i in 0..10 {
        let name = lock(&format!("job-{}", i));
        host.handle(&writer, &name, LockOperation::ACQUIRE_WRITE).unwrap();
        host.handle(&reader, &name, LockOperation::ACQUIRE_READ).unwrap();
    }
    let names = host.active().lock_names();
    let before: Vec<_> = names.iter().map(|n| host.active().lock_state(n)).collect();

    host.fail_active().await.unwrap();

    let after: Vec<_> = names.iter().map(|n| host.active().lock_state(n)).collect();
    assert_eq!(after, before);
}

#[tokio::test]
async fn waiters_carried_over_are_granted_by_new_active() {
    let mut host = host("partitions = 4\nmirrors = 1\n").await;
    let mut grants = host.take_grants().unwrap();
    let s1 = host.open_session();
    let s2 = host.open_session();
    let s3 = host.open_session();
    host.handle(&s1, &lock("L"), LockOperation::ACQUIRE_WRITE).unwrap();
    host.handle(&s2, &lock("L"), LockOperation::ACQUIRE_READ).unwrap();
    host.handle(&s3, &lock("L"), LockOperation::ACQUIRE_READ).unwrap();

    host.fail_active().await.unwrap();
    assert_eq!(
        host.handle(&s1, &lock("L"), LockOperation::Release).unwrap(),
        LockTransition::Released
    );

    let first = grants.recv().await.unwrap();
    let second = grants.recv().await.unwrap();
    assert_eq!(
        vec![(first.session, first.mode), (second.session, second.mode)],
        vec![(s2, LockMode::Read), (s3, LockMode::Read)]
    );
}

#[tokio::test]
async fn disconnect_after_failover_cleans_up() {
    let mut host = host("partitions = 4\nmirrors = 1\n").await;
    let s1 = host.open_session();
    host.handle(&s1, &lock("a"), LockOperation::ACQUIRE_WRITE).unwrap();
    host.handle(&s1, &lock("b"), LockOperation::ACQUIRE_READ).unwrap();

    host.fail_active().await.unwrap();

    assert_eq!(host.close_session(&s1).unwrap(), 2);
    assert!(host.active().lock_names().is_empty());
}

#[tokio::test]
async fn remaining_mirror_replicates_from_new_active() {
    let mut host = host("partitions = 4\nmirrors = 2\n").await;
    let s1 = host.open_session();
    host.handle(&s1, &lock("a"), LockOperation::ACQUIRE_WRITE).unwrap();
    host.fail_active().await.unwrap();
    host.handle(&s1, &lock("b"), LockOperation::ACQUIRE_READ).unwrap();

    host.quiesce().await;

    assert_eq!(host.standbys().len(), 1);
    let role = host.standbys()[0].lock();
    let mirror = role.as_passive().unwrap();
    for p in host.active().router().ids() {
        assert_eq!(mirror.export(p).unwrap(), host.active().snapshot(p).unwrap());
    }
}

#[tokio::test]
async fn failover_without_mirrors_is_an_error() {
    let mut host = host("mirrors = 0\n").await;

    assert!(matches!(
        host.fail_active().await,
        Err(LifecycleError::Failover(FailoverError::NoEligibleMirror))
    ));
}
