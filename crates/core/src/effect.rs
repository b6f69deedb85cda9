// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects and events produced by lock transitions

use crate::operation::LockMode;
use crate::session::{LockName, SessionId};
use crate::traced::TracedEffect;

/// Effects are side effects that lock transitions request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Notify a waiting session that its queued request was granted
    Grant {
        name: LockName,
        session: SessionId,
        mode: LockMode,
    },
    /// Emit an event for observers
    Emit(Event),
}

/// Events emitted by lock transitions
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Event {
    LockGranted {
        name: LockName,
        session: SessionId,
        mode: LockMode,
    },
    LockQueued {
        name: LockName,
        session: SessionId,
        mode: LockMode,
        /// Zero-based position in the waiter queue
        position: usize,
    },
    LockRejected {
        name: LockName,
        session: SessionId,
        mode: LockMode,
    },
    LockReleased {
        name: LockName,
        session: SessionId,
        mode: LockMode,
    },
    /// A disconnected session was removed from the waiter queue
    WaiterRemoved {
        name: LockName,
        session: SessionId,
        mode: LockMode,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::LockGranted { .. } => "lock:granted",
            Event::LockQueued { .. } => "lock:queued",
            Event::LockRejected { .. } => "lock:rejected",
            Event::LockReleased { .. } => "lock:released",
            Event::WaiterRemoved { .. } => "lock:waiter_removed",
        }
    }

    pub fn lock(&self) -> &LockName {
        match self {
            Event::LockGranted { name, .. }
            | Event::LockQueued { name, .. }
            | Event::LockRejected { name, .. }
            | Event::LockReleased { name, .. }
            | Event::WaiterRemoved { name, .. } => name,
        }
    }

    pub fn session(&self) -> &SessionId {
        match self {
            Event::LockGranted { session, .. }
            | Event::LockQueued { session, .. }
            | Event::LockRejected { session, .. }
            | Event::LockReleased { session, .. }
            | Event::WaiterRemoved { session, .. } => session,
        }
    }
}

impl TracedEffect for Effect {
    fn name(&self) -> &'static str {
        match self {
            Effect::Grant { .. } => "grant",
            Effect::Emit(event) => event.name(),
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::Grant {
                name,
                session,
                mode,
            } => vec![
                ("lock", name.to_string()),
                ("session", session.to_string()),
                ("mode", mode.to_string()),
            ],
            Effect::Emit(Event::LockQueued {
                name,
                session,
                mode,
                position,
            }) => vec![
                ("lock", name.to_string()),
                ("session", session.to_string()),
                ("mode", mode.to_string()),
                ("position", position.to_string()),
            ],
            Effect::Emit(
                Event::LockGranted { name, session, mode }
                | Event::LockRejected { name, session, mode }
                | Event::LockReleased { name, session, mode }
                | Event::WaiterRemoved { name, session, mode },
            ) => vec![
                ("lock", name.to_string()),
                ("session", session.to_string()),
                ("mode", mode.to_string()),
            ],
        }
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
