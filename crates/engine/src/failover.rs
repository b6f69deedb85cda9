// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failover controller
//!
//! When the hosting runtime reports that the active is gone, the controller
//! promotes the first registered standby that is caught up and healthy. The
//! promoted instance serves exactly what it last mirrored. Remaining standbys
//! are reset and re-attached to the new active through a fresh catch-up.

use crate::active::{ActiveCoordinator, GrantSender};
use crate::error::FailoverError;
use crate::passive::{MirrorStatus, PassiveMirror};
use crate::replication::{replication_channel, MirrorId, ReplicationReceiver};
use crate::role::Role;
use std::sync::{Arc, Mutex, MutexGuard};

/// A standby instance as seen by the host
#[derive(Clone)]
pub struct MirrorHandle {
    pub id: MirrorId,
    pub role: Arc<Mutex<Role>>,
}

impl MirrorHandle {
    pub fn new(id: MirrorId, mirror: PassiveMirror) -> Self {
        Self {
            id,
            role: Arc::new(Mutex::new(Role::Passive(mirror))),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Role> {
        self.role.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Outcome of a successful failover
pub struct Promotion {
    pub mirror: MirrorId,
    pub active: Arc<ActiveCoordinator>,
}

/// Selects and promotes standbys
#[derive(Default)]
pub struct FailoverController {
    standbys: Vec<MirrorHandle>,
}

impl FailoverController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: MirrorHandle) {
        self.standbys.push(handle);
    }

    pub fn standbys(&self) -> &[MirrorHandle] {
        &self.standbys
    }

    /// Promote a standby after the active was lost
    ///
    /// Standbys are considered in registration order. The chosen one is frozen
    /// and removed from the standby list.
    pub fn on_active_lost(&mut self, grants: GrantSender) -> Result<Promotion, FailoverError> {
        let index = self
            .standbys
            .iter()
            .position(|h| {
                h.lock()
                    .as_passive()
                    .is_some_and(|m| m.check_promotable().is_ok())
            })
            .ok_or(FailoverError::NoEligibleMirror)?;

        let handle = self.standbys.remove(index);
        let promoted = handle.lock().promote(grants);
        match promoted {
            Ok(active) => {
                tracing::info!(mirror = %handle.id, "standby promoted to active");
                Ok(Promotion {
                    mirror: handle.id,
                    active,
                })
            }
            Err(e) => {
                tracing::error!(mirror = %handle.id, error = %e, "promotion failed");
                self.standbys.insert(index, handle);
                Err(e)
            }
        }
    }

    /// Reset every standby and attach it to `active`
    ///
    /// Returns each standby's replication stream for the host to pump. Failed
    /// standbys are skipped.
    pub fn attach_standbys(&self, active: &ActiveCoordinator) -> Vec<(MirrorId, ReplicationReceiver)> {
        let mut streams = Vec::new();
        for handle in &self.standbys {
            {
                let mut role = handle.lock();
                let Some(mirror) = role.as_passive_mut() else {
                    continue;
                };
                mirror.reset();
                if mirror.status() != MirrorStatus::Standby {
                    tracing::warn!(mirror = %handle.id, status = %mirror.status(), "standby not attached");
                    continue;
                }
            }
            let (tx, rx) = replication_channel();
            active.attach(handle.id.clone(), tx);
            streams.push((handle.id.clone(), rx));
        }
        streams
    }
}

#[cfg(test)]
#[path = "failover_tests.rs"]
mod tests;
