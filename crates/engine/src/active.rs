// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active coordinator: the authoritative lock state
//!
//! Each partition sits behind its own mutex. Operations on one partition are
//! applied one at a time while different partitions proceed in parallel.
//! Grant notices and replication updates are sent before the partition is
//! unlocked, which keeps both streams in generation order.

use crate::error::CoordinatorError;
use crate::replication::{MirrorId, ReplicationSender, Replicas};
use rwl_core::{
    Applied, Effect, GrantNotice, LockError, LockName, LockOperation, LockState, LockTransition,
    Partition, PartitionId, PartitionRouter, SessionId, SyncSnapshot, TracedEffect,
};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

/// Sender for grant notices to waiting sessions
pub type GrantSender = mpsc::UnboundedSender<GrantNotice>;
/// Receiver for grant notices
pub type GrantReceiver = mpsc::UnboundedReceiver<GrantNotice>;

pub fn grant_channel() -> (GrantSender, GrantReceiver) {
    mpsc::unbounded_channel()
}

/// Executes lock operations and replicates the resulting state
pub struct ActiveCoordinator {
    router: PartitionRouter,
    partitions: Vec<Mutex<Partition>>,
    replicas: Replicas,
    grants: GrantSender,
}

impl ActiveCoordinator {
    /// Create a coordinator with empty partitions
    pub fn new(router: PartitionRouter, grants: GrantSender) -> Self {
        let partitions = router.ids().map(Partition::new).collect();
        Self::from_partitions(router, partitions, grants)
    }

    /// Take over existing partition state, e.g. a promoted mirror's
    pub(crate) fn from_partitions(
        router: PartitionRouter,
        partitions: Vec<Partition>,
        grants: GrantSender,
    ) -> Self {
        Self {
            router,
            partitions: partitions.into_iter().map(Mutex::new).collect(),
            replicas: Replicas::default(),
            grants,
        }
    }

    pub fn router(&self) -> &PartitionRouter {
        &self.router
    }

    fn lock_partition(&self, id: PartitionId) -> MutexGuard<'_, Partition> {
        self.partitions[id.index()]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    /// Apply one client operation and return its immediate result
    pub fn handle(
        &self,
        session: &SessionId,
        name: &LockName,
        operation: LockOperation,
    ) -> Result<LockTransition, LockError> {
        let id = self.router.route(name);
        let span = tracing::debug_span!("lock.handle", %session, lock = %name, partition = %id);
        let _guard = span.enter();

        let mut partition = self.lock_partition(id);
        let applied = match partition.apply(session, name, operation) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!(?operation, error = %e, "lock request refused");
                return Err(e);
            }
        };
        let result = applied.result;
        self.publish(id, applied);
        tracing::debug!(?operation, ?result, "handled");
        Ok(result)
    }

    /// Drop every hold and queued request of `session` in every partition
    ///
    /// Returns the number of locks that changed.
    pub fn disconnect(&self, session: &SessionId) -> usize {
        let mut touched = 0;
        for id in self.router.ids() {
            let mut partition = self.lock_partition(id);
            for applied in partition.disconnect(session) {
                touched += 1;
                self.publish(id, applied);
            }
        }
        tracing::info!(%session, locks = touched, "session disconnected");
        touched
    }

    /// Run effects and replicate; caller holds the partition lock
    fn publish(&self, id: PartitionId, applied: Applied) {
        for effect in &applied.effects {
            match effect {
                Effect::Emit(event) => tracing::debug!(
                    event = event.name(),
                    lock = %event.lock(),
                    session = %event.session(),
                    "lock event"
                ),
                Effect::Grant {
                    name,
                    session,
                    mode,
                } => {
                    tracing::debug!(effect = effect.name(), fields = %effect.render_fields(), "effect");
                    let notice = GrantNotice {
                        partition: id,
                        name: name.clone(),
                        session: session.clone(),
                        mode: *mode,
                    };
                    if self.grants.send(notice).is_err() {
                        tracing::warn!(%session, lock = %name, "grant notice dropped, no receiver");
                    }
                }
            }
        }
        if let Some(update) = &applied.update {
            self.replicas.publish(update);
        }
    }

    /// Full dump of one partition for bulk resynchronization
    pub fn snapshot(&self, partition: PartitionId) -> Result<SyncSnapshot, CoordinatorError> {
        if !self.router.contains(partition) {
            return Err(CoordinatorError::UnknownPartition(partition));
        }
        Ok(self.lock_partition(partition).snapshot())
    }

    /// Attach a mirror and stream it a complete catch-up window
    ///
    /// Each partition's snapshot is taken and sent while that partition is
    /// locked, so every later update for it reaches the mirror afterwards.
    pub fn attach(&self, mirror: MirrorId, tx: ReplicationSender) {
        self.replicas
            .register(mirror.clone(), tx, self.router.partitions());
        for id in self.router.ids() {
            let partition = self.lock_partition(id);
            self.replicas.sync_partition(&mirror, &partition);
        }
        self.replicas.finish(&mirror);
        tracing::info!(%mirror, partitions = self.router.partitions(), "mirror attached");
    }

    pub fn detach(&self, mirror: &MirrorId) -> bool {
        let detached = self.replicas.detach(mirror);
        if detached {
            tracing::info!(%mirror, "mirror detached");
        }
        detached
    }

    /// Close every replication link, ending the mirrors' streams
    pub fn detach_all(&self) {
        self.replicas.detach_all();
    }

    pub fn mirrors(&self) -> Vec<MirrorId> {
        self.replicas.ids()
    }

    pub fn lock_state(&self, name: &LockName) -> Option<LockState> {
        self.lock_partition(self.router.route(name))
            .get(name.as_str())
            .cloned()
    }

    /// Names of all non-idle locks, sorted
    pub fn lock_names(&self) -> Vec<LockName> {
        let mut names: Vec<LockName> = self
            .router
            .ids()
            .flat_map(|id| {
                self.lock_partition(id)
                    .names()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "active_tests.rs"]
mod tests;
