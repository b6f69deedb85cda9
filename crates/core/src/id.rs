// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity generation

use crate::session::SessionId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Mints identities for newly connected sessions
pub trait IdGen: Clone + Send + Sync {
    fn next(&self) -> SessionId;
}

/// UUID-based generator for production use
#[derive(Clone, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> SessionId {
        SessionId(uuid::Uuid::new_v4().to_string())
    }
}

/// Sequential generator for testing
#[derive(Clone)]
pub struct SequentialIdGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new("session")
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> SessionId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        SessionId(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_gen_creates_unique_sessions() {
        let id_gen = UuidIdGen;
        let a = id_gen.next();
        let b = id_gen.next();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn sequential_gen_is_shared_between_clones() {
        let first = SequentialIdGen::new("client");
        let second = first.clone();
        assert_eq!(first.next().as_str(), "client-1");
        assert_eq!(second.next().as_str(), "client-2");
        assert_eq!(first.next().as_str(), "client-3");
    }
}
