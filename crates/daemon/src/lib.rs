// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Lock entity host: configuration, logging and instance management

mod host;
mod lifecycle;

pub use host::{startup, startup_with, Host, PRIMARY};
pub use lifecycle::{setup_logging, Config, LifecycleError};
