// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock name to partition routing
//!
//! The partition count is fixed when the entity is created and never changes,
//! since mirrors replicate partition by partition. The hash is CRC-32 over the
//! name bytes so every instance routes a name the same way.

use crate::partition::PartitionId;
use crate::session::LockName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("partition count must be at least 1")]
    NoPartitions,
}

/// Maps lock names onto a fixed number of partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRouter {
    partitions: u32,
}

impl PartitionRouter {
    pub fn new(partitions: u32) -> Result<Self, RouterError> {
        if partitions == 0 {
            return Err(RouterError::NoPartitions);
        }
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    pub fn route(&self, name: &LockName) -> PartitionId {
        PartitionId(crc32fast::hash(name.as_str().as_bytes()) % self.partitions)
    }

    /// Whether `id` is one of this router's partitions
    pub fn contains(&self, id: PartitionId) -> bool {
        id.0 < self.partitions
    }

    /// All partition ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = PartitionId> {
        (0..self.partitions).map(PartitionId)
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
