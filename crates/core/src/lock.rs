// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read/write lock state machine
//!
//! One `LockState` exists per lock name. Transitions are pure: `transition`
//! never mutates `self`, it returns the next state together with the client
//! result and the effects to run.
//!
//! Invariants held by every state this module produces:
//! - an unlocked lock has no holders
//! - a write-locked lock has exactly one holder and no readers
//! - a read-locked lock has at least one reader
//! - a session holds a lock at most once and waits on it at most once,
//!   and never does both
//! - waiters are kept in arrival order

use crate::effect::{Effect, Event};
use crate::operation::{LockMode, LockOperation, LockTransition};
use crate::session::{LockName, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

/// Who currently holds the lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Hold {
    #[default]
    Unlocked,
    Read {
        holders: BTreeSet<SessionId>,
    },
    Write {
        holder: SessionId,
    },
}

/// A queued request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Waiter {
    pub session: SessionId,
    pub mode: LockMode,
}

/// State of a single named lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub hold: Hold,
    /// FIFO by arrival, only ever reordered by removal
    pub waiters: VecDeque<Waiter>,
}

/// Inputs that trigger lock transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockInput {
    /// Acquire or queue
    Acquire { session: SessionId, mode: LockMode },
    /// Acquire only if grantable now
    TryAcquire { session: SessionId, mode: LockMode },
    /// Release the session's hold
    Release { session: SessionId },
    /// Release the session's hold and drop its queued requests
    Disconnect { session: SessionId },
}

impl LockInput {
    /// Build the input for a client operation
    pub fn from_operation(session: SessionId, operation: LockOperation) -> Self {
        match operation {
            LockOperation::Acquire(mode) => LockInput::Acquire { session, mode },
            LockOperation::TryAcquire(mode) => LockInput::TryAcquire { session, mode },
            LockOperation::Release => LockInput::Release { session },
        }
    }
}

/// Client usage errors, reported to the caller without affecting the lock
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("session {session} already holds {held} lock on {name}")]
    AlreadyHeld {
        name: LockName,
        session: SessionId,
        held: LockMode,
    },
    #[error("session {session} is already waiting for {queued} lock on {name}")]
    AlreadyWaiting {
        name: LockName,
        session: SessionId,
        queued: LockMode,
    },
}

/// A broken structural invariant of a lock state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LockDefect {
    #[error("read hold without readers")]
    EmptyReadHold,
    #[error("session queued twice")]
    DuplicateWaiter,
    #[error("session both holds and waits")]
    HolderWaiting,
    #[error("waiters queued on an unlocked lock")]
    UnlockedWithWaiters,
    #[error("head waiter is grantable but still queued")]
    StalledHead,
}

/// Outcome of one transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub state: LockState,
    pub result: LockTransition,
    pub effects: Vec<Effect>,
}

impl LockState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode, `None` when unlocked
    pub fn mode(&self) -> Option<LockMode> {
        match self.hold {
            Hold::Unlocked => None,
            Hold::Read { .. } => Some(LockMode::Read),
            Hold::Write { .. } => Some(LockMode::Write),
        }
    }

    /// Unlocked with nobody waiting; equivalent to the lock being absent
    pub fn is_idle(&self) -> bool {
        matches!(self.hold, Hold::Unlocked) && self.waiters.is_empty()
    }

    pub fn read_holders(&self) -> Vec<&SessionId> {
        match &self.hold {
            Hold::Read { holders } => holders.iter().collect(),
            _ => Vec::new(),
        }
    }

    pub fn write_holder(&self) -> Option<&SessionId> {
        match &self.hold {
            Hold::Write { holder } => Some(holder),
            _ => None,
        }
    }

    /// Mode in which `session` holds the lock, if any
    pub fn held_by(&self, session: &SessionId) -> Option<LockMode> {
        match &self.hold {
            Hold::Read { holders } if holders.contains(session) => Some(LockMode::Read),
            Hold::Write { holder } if holder == session => Some(LockMode::Write),
            _ => None,
        }
    }

    /// Mode `session` is queued for, if any
    pub fn queued_by(&self, session: &SessionId) -> Option<LockMode> {
        self.waiters
            .iter()
            .find(|w| &w.session == session)
            .map(|w| w.mode)
    }

    /// Whether `session` holds or waits on this lock
    pub fn involves(&self, session: &SessionId) -> bool {
        self.held_by(session).is_some() || self.queued_by(session).is_some()
    }

    /// Check the invariants every reachable state satisfies
    pub fn check(&self) -> Result<(), LockDefect> {
        if let Hold::Read { holders } = &self.hold {
            if holders.is_empty() {
                return Err(LockDefect::EmptyReadHold);
            }
        }
        let mut queued = BTreeSet::new();
        for waiter in &self.waiters {
            if !queued.insert(&waiter.session) {
                return Err(LockDefect::DuplicateWaiter);
            }
            if self.held_by(&waiter.session).is_some() {
                return Err(LockDefect::HolderWaiting);
            }
        }
        if let Some(head) = self.waiters.front() {
            if matches!(self.hold, Hold::Unlocked) {
                return Err(LockDefect::UnlockedWithWaiters);
            }
            if self.admits(head.mode) {
                return Err(LockDefect::StalledHead);
            }
        }
        Ok(())
    }

    /// Pure state transition function
    pub fn transition(&self, name: &LockName, input: LockInput) -> Result<Step, LockError> {
        let mut next = self.clone();
        let mut effects = Vec::new();

        let result = match input {
            LockInput::Acquire { session, mode } => {
                self.check_reentry(name, &session)?;
                if next.admits(mode) && next.waiters.is_empty() {
                    next.take_hold(session.clone(), mode);
                    effects.push(Effect::Emit(Event::LockGranted {
                        name: name.clone(),
                        session,
                        mode,
                    }));
                    LockTransition::Granted
                } else {
                    let position = next.waiters.len();
                    next.waiters.push_back(Waiter {
                        session: session.clone(),
                        mode,
                    });
                    effects.push(Effect::Emit(Event::LockQueued {
                        name: name.clone(),
                        session,
                        mode,
                        position,
                    }));
                    LockTransition::Pending
                }
            }

            LockInput::TryAcquire { session, mode } => {
                self.check_reentry(name, &session)?;
                if next.admits(mode) && next.waiters.is_empty() {
                    next.take_hold(session.clone(), mode);
                    effects.push(Effect::Emit(Event::LockGranted {
                        name: name.clone(),
                        session,
                        mode,
                    }));
                    LockTransition::Granted
                } else {
                    effects.push(Effect::Emit(Event::LockRejected {
                        name: name.clone(),
                        session,
                        mode,
                    }));
                    LockTransition::Rejected
                }
            }

            LockInput::Release { session } => match next.drop_hold(&session) {
                Some(mode) => {
                    effects.push(Effect::Emit(Event::LockReleased {
                        name: name.clone(),
                        session,
                        mode,
                    }));
                    next.drain(name, &mut effects);
                    LockTransition::Released
                }
                None => LockTransition::NotHeld,
            },

            LockInput::Disconnect { session } => {
                let before = next.waiters.len();
                next.waiters.retain(|w| {
                    if w.session == session {
                        effects.push(Effect::Emit(Event::WaiterRemoved {
                            name: name.clone(),
                            session: session.clone(),
                            mode: w.mode,
                        }));
                        false
                    } else {
                        true
                    }
                });
                let dequeued = next.waiters.len() != before;

                let result = match next.drop_hold(&session) {
                    Some(mode) => {
                        effects.push(Effect::Emit(Event::LockReleased {
                            name: name.clone(),
                            session,
                            mode,
                        }));
                        LockTransition::Released
                    }
                    None => LockTransition::NotHeld,
                };
                if dequeued || result == LockTransition::Released {
                    next.drain(name, &mut effects);
                }
                result
            }
        };

        Ok(Step {
            state: next,
            result,
            effects,
        })
    }

    /// Reject acquisition by a session already holding or queued on this lock
    fn check_reentry(&self, name: &LockName, session: &SessionId) -> Result<(), LockError> {
        if let Some(held) = self.held_by(session) {
            return Err(LockError::AlreadyHeld {
                name: name.clone(),
                session: session.clone(),
                held,
            });
        }
        if let Some(queued) = self.queued_by(session) {
            return Err(LockError::AlreadyWaiting {
                name: name.clone(),
                session: session.clone(),
                queued,
            });
        }
        Ok(())
    }

    /// Whether the current hold is compatible with a request for `mode`
    fn admits(&self, mode: LockMode) -> bool {
        matches!(
            (&self.hold, mode),
            (Hold::Unlocked, _) | (Hold::Read { .. }, LockMode::Read)
        )
    }

    /// Record `session` as a holder; caller has checked `admits(mode)`
    fn take_hold(&mut self, session: SessionId, mode: LockMode) {
        if let (Hold::Read { holders }, LockMode::Read) = (&mut self.hold, mode) {
            holders.insert(session);
            return;
        }
        self.hold = match mode {
            LockMode::Read => Hold::Read {
                holders: BTreeSet::from([session]),
            },
            LockMode::Write => Hold::Write { holder: session },
        };
    }

    /// Remove `session` from the holders, returning the mode it held
    fn drop_hold(&mut self, session: &SessionId) -> Option<LockMode> {
        let mode = self.held_by(session)?;
        let unlocked = match &mut self.hold {
            Hold::Read { holders } => {
                holders.remove(session);
                holders.is_empty()
            }
            Hold::Write { .. } => true,
            Hold::Unlocked => false,
        };
        if unlocked {
            self.hold = Hold::Unlocked;
        }
        Some(mode)
    }

    /// Grant queued requests head-first while they are compatible
    ///
    /// A write waiter is granted alone; a run of read waiters is granted
    /// together up to the next write waiter.
    fn drain(&mut self, name: &LockName, effects: &mut Vec<Effect>) {
        while let Some(mode) = self.waiters.front().map(|w| w.mode) {
            if !self.admits(mode) {
                break;
            }
            let Some(waiter) = self.waiters.pop_front() else {
                break;
            };
            self.take_hold(waiter.session.clone(), mode);
            effects.push(Effect::Emit(Event::LockGranted {
                name: name.clone(),
                session: waiter.session.clone(),
                mode,
            }));
            effects.push(Effect::Grant {
                name: name.clone(),
                session: waiter.session,
                mode,
            });
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
