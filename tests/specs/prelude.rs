//! Shared helpers for specs

#![allow(dead_code)]

pub use rwl_core::{
    GrantNotice, LockMode, LockName, LockOperation, LockTransition, PartitionId, PartitionRouter,
    SessionId, SyncMessage,
};
pub use rwl_engine::{
    grant_channel, replication_channel, ActiveCoordinator, GrantReceiver, MirrorId, PassiveMirror,
    ReplicationReceiver,
};
use similar_asserts::assert_eq;

pub fn session(id: &str) -> SessionId {
    SessionId::new(id)
}

pub fn lock(name: &str) -> LockName {
    LockName::new(name)
}

/// An active coordinator with its grant stream
pub struct Entity {
    pub active: ActiveCoordinator,
    pub grants: GrantReceiver,
}

impl Entity {
    pub fn new(partitions: u32) -> Self {
        let (tx, grants) = grant_channel();
        let router = PartitionRouter::new(partitions).unwrap();
        Self {
            active: ActiveCoordinator::new(router, tx),
            grants,
        }
    }

    pub fn op(&self, who: &str, name: &str, operation: LockOperation) -> LockTransition {
        self.active.handle(&session(who), &lock(name), operation).unwrap()
    }

    /// Grant notices delivered so far, as (session, mode)
    pub fn granted(&mut self) -> Vec<(String, LockMode)> {
        let mut out = Vec::new();
        while let Ok(GrantNotice { session, mode, .. }) = self.grants.try_recv() {
            out.push((session.0, mode));
        }
        out
    }

    /// Attach a fresh mirror, returning it with its replication stream
    pub fn mirror(&self, id: &str) -> (PassiveMirror, ReplicationReceiver) {
        let (tx, rx) = replication_channel();
        self.active.attach(MirrorId::new(id), tx);
        (PassiveMirror::create_new(*self.active.router()), rx)
    }

    /// Whether `mirror` matches the active in every partition
    pub fn assert_mirrored(&self, mirror: &PassiveMirror) {
        for p in self.active.router().ids() {
            assert_eq!(mirror.export(p).unwrap(), self.active.snapshot(p).unwrap());
        }
    }
}

/// Apply every queued replication message to `mirror`
pub fn feed(mirror: &mut PassiveMirror, rx: &mut ReplicationReceiver) -> usize {
    let mut applied = 0;
    while let Ok(message) = rx.try_recv() {
        mirror.apply(message).unwrap();
        applied += 1;
    }
    applied
}
