// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host configuration.
//
// One `HostOptions` value lives inside each host behind a single lock. The
// data fields persist as JSON; the Android activity provider is runtime-only.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable naming a directory that holds the native library.
/// Consulted before any other probing path.
pub const NATIVE_PATH_ENV: &str = "NMB_NATIVE_PATH";

/// Process-wide host settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostOptions {
    /// Require a single-threaded apartment on Windows before showing dialogs
    /// that use advanced features.
    pub require_sta_thread_for_windows: bool,
    /// Name reported to the backend at initialization (logging only).
    pub runtime_name: Option<String>,
    /// Ask the backend for its own dispatch queue, where it has one.
    pub enable_async_dispatch: bool,
    #[serde(skip)]
    pub android: AndroidHostOptions,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            require_sta_thread_for_windows: true,
            runtime_name: None,
            enable_async_dispatch: false,
            android: AndroidHostOptions::default(),
        }
    }
}

impl HostOptions {
    /// Read options from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(serde_json::from_str(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Produces a reference to the foreground Android activity on demand.
pub type ActivityReferenceProvider = Arc<dyn Fn() -> ActivityReference + Send + Sync>;

#[derive(Clone, Default)]
pub struct AndroidHostOptions {
    pub activity_reference_provider: Option<ActivityReferenceProvider>,
}

impl fmt::Debug for AndroidHostOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AndroidHostOptions")
            .field(
                "activity_reference_provider",
                &self.activity_reference_provider.as_ref().map(|_| ".."),
            )
            .finish()
    }
}

/// Whether the holder of a reference must release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

/// Short-lived native reference to the current top-level UI context.
///
/// An owned reference is released exactly once, when dropped.
pub struct ActivityReference {
    handle: usize,
    ownership: Ownership,
    release: Option<fn(usize)>,
}

impl ActivityReference {
    pub fn none() -> Self {
        Self {
            handle: 0,
            ownership: Ownership::Borrowed,
            release: None,
        }
    }

    /// A reference the receiver must release through `release`.
    pub fn owned(handle: usize, release: fn(usize)) -> Self {
        Self {
            handle,
            ownership: Ownership::Owned,
            release: Some(release),
        }
    }

    pub fn borrowed(handle: usize) -> Self {
        Self {
            handle,
            ownership: Ownership::Borrowed,
            release: None,
        }
    }

    pub fn handle(&self) -> usize {
        self.handle
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_none(&self) -> bool {
        self.handle == 0
    }
}

impl Drop for ActivityReference {
    fn drop(&mut self) {
        if self.ownership == Ownership::Owned && self.handle != 0 {
            if let Some(release) = self.release.take() {
                release(self.handle);
            }
        }
    }
}

impl fmt::Debug for ActivityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivityReference")
            .field("handle", &format_args!("{:#x}", self.handle))
            .field("ownership", &self.ownership)
            .finish()
    }
}
