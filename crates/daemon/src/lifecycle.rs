// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, logging, errors.

use std::path::{Path, PathBuf};

use rwl_core::{LockError, PartitionRouter, RouterError, SessionId};
use rwl_engine::FailoverError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Daemon configuration
///
/// Loaded from a TOML file; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Number of lock partitions, fixed for the lifetime of the entity
    pub partitions: u32,
    /// Number of passive mirrors to run
    pub mirrors: u32,
    /// Path to daemon log file; defaults under the state directory
    pub log_path: Option<PathBuf>,
    /// Filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partitions: 16,
            mirrors: 1,
            log_path: None,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load and validate the config at `path`
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, LifecycleError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| LifecycleError::Config(path.to_path_buf(), e))?;
        config.router()?;
        Ok(config)
    }

    /// Partition router for this config
    pub fn router(&self) -> Result<PartitionRouter, LifecycleError> {
        Ok(PartitionRouter::new(self.partitions)?)
    }

    /// Resolved log file location
    pub fn log_path(&self) -> Result<PathBuf, LifecycleError> {
        match &self.log_path {
            Some(path) => Ok(path.clone()),
            None => Ok(state_dir()?.join("rwld.log")),
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Invalid config at {0}: {1}")]
    Config(PathBuf, #[source] toml::de::Error),

    #[error("Invalid partitioning: {0}")]
    Router(#[from] RouterError),

    #[error("Unknown session: {0}")]
    UnknownSession(SessionId),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("Failover failed: {0}")]
    Failover(#[from] FailoverError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global subscriber writing to the config's log file
pub fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_path = config.log_path()?;
    let dir = log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(
        dir,
        log_path.file_name().ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

/// Get the state directory for rwld
fn state_dir() -> Result<PathBuf, LifecycleError> {
    // Use XDG_STATE_HOME or default to ~/.local/state
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("rwl"));
    }

    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/rwl"))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
