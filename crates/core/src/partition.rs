// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A partition of the lock name space
//!
//! Holds the lock states routed to one partition. Idle locks are not stored:
//! absence and "unlocked with no waiters" mean the same thing. Every change
//! bumps the partition sequence and yields a `LockUpdate` for replication.

use crate::effect::Effect;
use crate::lock::{LockError, LockInput, LockState};
use crate::operation::{LockOperation, LockTransition};
use crate::session::{LockName, SessionId};
use crate::sync::{LockRecord, LockUpdate, SyncSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(pub u32);

impl PartitionId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of applying one input to a partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub name: LockName,
    pub result: LockTransition,
    pub effects: Vec<Effect>,
    /// Present when the lock state changed
    pub update: Option<LockUpdate>,
}

/// Lock states for one partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    id: PartitionId,
    seq: u64,
    locks: BTreeMap<LockName, LockState>,
}

impl Partition {
    pub fn new(id: PartitionId) -> Self {
        Self {
            id,
            seq: 0,
            locks: BTreeMap::new(),
        }
    }

    /// Rebuild a partition wholesale from a snapshot
    pub fn from_snapshot(snapshot: SyncSnapshot) -> Self {
        let locks = snapshot
            .locks
            .into_iter()
            .filter(|r| !r.state.is_idle())
            .map(|r| (r.name, r.state))
            .collect();
        Self {
            id: snapshot.partition,
            seq: snapshot.seq,
            locks,
        }
    }

    pub fn id(&self) -> PartitionId {
        self.id
    }

    /// Sequence number of the last change
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn get(&self, name: &str) -> Option<&LockState> {
        self.locks.get(name)
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &LockName> {
        self.locks.keys()
    }

    /// Apply a client operation
    pub fn apply(
        &mut self,
        session: &SessionId,
        name: &LockName,
        operation: LockOperation,
    ) -> Result<Applied, LockError> {
        self.apply_input(name, LockInput::from_operation(session.clone(), operation))
    }

    /// Apply any lock input, creating the lock lazily
    pub fn apply_input(&mut self, name: &LockName, input: LockInput) -> Result<Applied, LockError> {
        let current = self.locks.get(name).cloned().unwrap_or_default();
        let step = current.transition(name, input)?;

        let update = if step.state != current {
            self.seq += 1;
            let state = if step.state.is_idle() {
                self.locks.remove(name);
                None
            } else {
                self.locks.insert(name.clone(), step.state.clone());
                Some(step.state)
            };
            Some(LockUpdate {
                partition: self.id,
                seq: self.seq,
                name: name.clone(),
                state,
            })
        } else {
            None
        };

        Ok(Applied {
            name: name.clone(),
            result: step.result,
            effects: step.effects,
            update,
        })
    }

    /// Release every hold and queued request of `session` in this partition
    ///
    /// Returns one `Applied` per lock the session was involved in, in name order.
    pub fn disconnect(&mut self, session: &SessionId) -> Vec<Applied> {
        let involved: Vec<LockName> = self
            .locks
            .iter()
            .filter(|(_, state)| state.involves(session))
            .map(|(name, _)| name.clone())
            .collect();

        involved
            .iter()
            .filter_map(|name| {
                self.apply_input(
                    name,
                    LockInput::Disconnect {
                        session: session.clone(),
                    },
                )
                .ok()
            })
            .collect()
    }

    /// Full ordered dump of this partition
    pub fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            partition: self.id,
            seq: self.seq,
            locks: self
                .locks
                .iter()
                .map(|(name, state)| LockRecord {
                    name: name.clone(),
                    state: state.clone(),
                })
                .collect(),
        }
    }

    /// Install a replicated lock change
    pub fn apply_update(&mut self, update: LockUpdate) {
        self.seq = update.seq;
        match update.state {
            Some(state) if !state.is_idle() => {
                self.locks.insert(update.name, state);
            }
            _ => {
                self.locks.remove(&update.name);
            }
        }
    }
}

#[cfg(test)]
#[path = "partition_tests.rs"]
mod tests;
