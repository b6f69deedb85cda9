// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity host: one active coordinator and its standby mirrors.
//!
//! The host owns the instances, mints session identities, pumps replication
//! into the mirrors and drives failover when the active is lost.

use std::collections::HashSet;
use std::sync::Arc;

use rwl_core::{IdGen, LockName, LockOperation, LockTransition, SessionId, UuidIdGen};
use rwl_engine::{
    grant_channel, pump, ActiveCoordinator, CoordinatorError, FailoverController, GrantReceiver,
    GrantSender, MirrorHandle, MirrorId, PassiveMirror,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::lifecycle::{Config, LifecycleError};

/// Identity of the instance that starts out active
pub const PRIMARY: &str = "primary";

type PumpTask = JoinHandle<Result<u64, CoordinatorError>>;

/// Running entity with its active and passive instances
pub struct Host<I: IdGen = UuidIdGen> {
    active: Arc<ActiveCoordinator>,
    active_id: MirrorId,
    controller: FailoverController,
    pumps: Vec<PumpTask>,
    sessions: HashSet<SessionId>,
    ids: I,
    grant_tx: GrantSender,
    grants: Option<GrantReceiver>,
}

/// Start an entity with UUID session identities
pub async fn startup(config: &Config) -> Result<Host, LifecycleError> {
    startup_with(config, UuidIdGen).await
}

/// Start an entity: create the active, the mirrors, and attach them
pub async fn startup_with<I: IdGen>(config: &Config, ids: I) -> Result<Host<I>, LifecycleError> {
    let router = config.router()?;
    let (grant_tx, grants) = grant_channel();
    let active = Arc::new(ActiveCoordinator::new(router, grant_tx.clone()));

    let mut controller = FailoverController::new();
    for n in 1..=config.mirrors {
        let id = MirrorId::new(format!("mirror-{}", n));
        controller.register(MirrorHandle::new(id, PassiveMirror::create_new(router)));
    }

    let mut host = Host {
        active,
        active_id: MirrorId::new(PRIMARY),
        controller,
        pumps: Vec::new(),
        sessions: HashSet::new(),
        ids,
        grant_tx,
        grants: Some(grants),
    };
    host.attach_standbys();

    info!(
        partitions = router.partitions(),
        mirrors = config.mirrors,
        "entity started"
    );
    Ok(host)
}

impl<I: IdGen> Host<I> {
    /// The instance currently serving operations
    pub fn active(&self) -> &Arc<ActiveCoordinator> {
        &self.active
    }

    pub fn active_id(&self) -> &MirrorId {
        &self.active_id
    }

    /// Standby instances in promotion order
    pub fn standbys(&self) -> &[MirrorHandle] {
        self.controller.standbys()
    }

    /// Grant notices for all sessions; can be taken once
    pub fn take_grants(&mut self) -> Option<GrantReceiver> {
        self.grants.take()
    }

    /// Connect a new client session
    pub fn open_session(&mut self) -> SessionId {
        let session = self.ids.next();
        self.sessions.insert(session.clone());
        info!(%session, "session opened");
        session
    }

    /// Forward a client operation to the active
    pub fn handle(
        &self,
        session: &SessionId,
        name: &LockName,
        operation: LockOperation,
    ) -> Result<LockTransition, LifecycleError> {
        if !self.sessions.contains(session) {
            return Err(LifecycleError::UnknownSession(session.clone()));
        }
        Ok(self.active.handle(session, name, operation)?)
    }

    /// Disconnect a session, dropping its holds and queued requests
    ///
    /// Returns the number of locks that changed.
    pub fn close_session(&mut self, session: &SessionId) -> Result<usize, LifecycleError> {
        if !self.sessions.remove(session) {
            return Err(LifecycleError::UnknownSession(session.clone()));
        }
        Ok(self.active.disconnect(session))
    }

    /// Replace the active with the first eligible standby
    ///
    /// The old active's links are closed and every message already sent is
    /// applied before a standby is chosen, so the promoted instance holds
    /// everything the old active replicated. Sessions stay connected.
    pub async fn fail_active(&mut self) -> Result<MirrorId, LifecycleError> {
        warn!(active = %self.active_id, "active lost");
        self.quiesce().await;

        let promotion = self.controller.on_active_lost(self.grant_tx.clone())?;
        self.active = promotion.active;
        self.active_id = promotion.mirror.clone();
        self.attach_standbys();

        info!(active = %self.active_id, standbys = self.controller.standbys().len(), "failover complete");
        Ok(promotion.mirror)
    }

    /// Close all replication links and wait for the mirrors to apply them
    ///
    /// Returns the number of replication messages applied.
    pub async fn quiesce(&mut self) -> u64 {
        self.active.detach_all();
        self.join_pumps().await
    }

    /// Quiesce replication, then destroy every standby
    pub async fn shutdown(&mut self) -> u64 {
        info!("shutting down entity");
        let applied = self.quiesce().await;
        for handle in self.controller.standbys() {
            if let Some(mirror) = handle.lock().as_passive_mut() {
                mirror.destroy();
            }
        }
        info!(applied, "entity shutdown complete");
        applied
    }

    fn attach_standbys(&mut self) {
        for (id, rx) in self.controller.attach_standbys(&self.active) {
            let Some(handle) = self.controller.standbys().iter().find(|h| h.id == id) else {
                continue;
            };
            let task = tokio::spawn(pump(id, rx, Arc::clone(&handle.role)));
            self.pumps.push(task);
        }
    }

    async fn join_pumps(&mut self) -> u64 {
        let mut applied = 0;
        for task in std::mem::take(&mut self.pumps) {
            match task.await {
                Ok(Ok(n)) => applied += n,
                Ok(Err(e)) if e.is_fatal() => error!(error = %e, "mirror retired"),
                Ok(Err(e)) => warn!(error = %e, "mirror retired"),
                Err(e) => error!(error = %e, "replication task failed"),
            }
        }
        applied
    }
}

#[cfg(test)]
#[path = "host_tests.rs"]
mod tests;
