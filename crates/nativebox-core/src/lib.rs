// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativebox — request/result model and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod outcome;
pub mod types;

pub use config::{ActivityReference, ActivityReferenceProvider, AndroidHostOptions, HostOptions, Ownership};
pub use error::{NativeBoxError, Result};
pub use outcome::{MessageBoxOutcome, MessageBoxResult, StatusCode};
pub use types::*;
