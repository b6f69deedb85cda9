// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity roles and the message boundary
//!
//! An instance is either active or passive. Both share the lock state types
//! but accept disjoint inputs: lock operations and disconnects are only valid
//! at the active, sync messages only at a passive. Anything else is a
//! protocol violation, and a passive that receives an operation is poisoned.

use crate::active::{ActiveCoordinator, GrantSender};
use crate::error::{CoordinatorError, FailoverError, ProtocolViolation};
use crate::passive::PassiveMirror;
use rwl_core::{LockName, LockOperation, LockTransition, SessionId, SyncMessage};
use std::sync::Arc;

/// A message delivered to an entity instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityMessage {
    /// Client lock operation
    Operation {
        session: SessionId,
        name: LockName,
        operation: LockOperation,
    },
    /// The transport lost a session
    Disconnect { session: SessionId },
    /// Replication from the active
    Sync(SyncMessage),
}

/// The role an instance is currently playing
pub enum Role {
    Active(Arc<ActiveCoordinator>),
    Passive(PassiveMirror),
}

impl Role {
    /// Deliver a message to this instance
    ///
    /// Returns the client result for lock operations and `None` otherwise.
    pub fn invoke(
        &mut self,
        message: EntityMessage,
    ) -> Result<Option<LockTransition>, CoordinatorError> {
        match self {
            Role::Active(active) => match message {
                EntityMessage::Operation {
                    session,
                    name,
                    operation,
                } => Ok(Some(active.handle(&session, &name, operation)?)),
                EntityMessage::Disconnect { session } => {
                    active.disconnect(&session);
                    Ok(None)
                }
                EntityMessage::Sync(sync) => {
                    let violation = ProtocolViolation::SyncAtActive(sync.kind());
                    tracing::error!(error = %violation, "active protocol violation");
                    Err(violation.into())
                }
            },
            Role::Passive(mirror) => match message {
                EntityMessage::Operation {
                    session,
                    name,
                    operation,
                } => Err(mirror
                    .reject(ProtocolViolation::OperationAtPassive {
                        session,
                        name,
                        operation,
                    })
                    .into()),
                EntityMessage::Disconnect { session } => Err(mirror
                    .reject(ProtocolViolation::DisconnectAtPassive(session))
                    .into()),
                EntityMessage::Sync(sync) => {
                    mirror.apply(sync)?;
                    Ok(None)
                }
            },
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Role::Active(_))
    }

    pub fn as_active(&self) -> Option<&Arc<ActiveCoordinator>> {
        match self {
            Role::Active(active) => Some(active),
            Role::Passive(_) => None,
        }
    }

    pub fn as_passive(&self) -> Option<&PassiveMirror> {
        match self {
            Role::Active(_) => None,
            Role::Passive(mirror) => Some(mirror),
        }
    }

    pub fn as_passive_mut(&mut self) -> Option<&mut PassiveMirror> {
        match self {
            Role::Active(_) => None,
            Role::Passive(mirror) => Some(mirror),
        }
    }

    /// Turn a passive instance into the active one, in place
    pub fn promote(&mut self, grants: GrantSender) -> Result<Arc<ActiveCoordinator>, FailoverError> {
        let active = match self {
            Role::Active(_) => return Err(FailoverError::AlreadyActive),
            Role::Passive(mirror) => Arc::new(mirror.promote(grants)?),
        };
        *self = Role::Active(Arc::clone(&active));
        Ok(active)
    }
}

#[cfg(test)]
#[path = "role_tests.rs"]
mod tests;
