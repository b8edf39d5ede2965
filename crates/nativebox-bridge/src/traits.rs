// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host capability contract.
//
// Every host presents the same surface regardless of what sits behind it: a
// native library, a script bridge, or a test double. Runtime configuration is
// a separate, optional capability.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use nativebox_core::{HostOptions, MessageBoxRequest, MessageBoxResult, Result};

/// Receives one log line from the backend.
pub type LogHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Presents message boxes.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait MessageBoxHost: Send + Sync {
    /// Lazily set up the backend. Idempotent and safe to call concurrently;
    /// the first caller does the work.
    fn ensure_initialized(&self) -> Result<()>;

    /// Tear the backend down. Calling it twice is a no-op.
    fn shutdown(&self);

    /// Show a dialog and block until it is dismissed.
    fn show(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult>;

    /// Like [`show`](Self::show) but never fails: errors become a best-effort
    /// result. The flag is true exactly when the returned result's outcome is
    /// Success or Cancelled.
    fn try_show(&self, request: &MessageBoxRequest) -> (bool, MessageBoxResult) {
        let result = match self.show(request) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "message box failed");
                e.into_fallback_result(request.tag().cloned())
            }
        };
        (result.outcome().is_completed(), result)
    }

    /// Show a dialog without blocking the calling task. A token cancelled
    /// before dispatch short-circuits without touching the backend.
    async fn show_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> Result<MessageBoxResult>;

    async fn try_show_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> (bool, MessageBoxResult) {
        let tag = request.tag().cloned();
        let result = match self.show_async(request, cancel).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "async message box failed");
                e.into_fallback_result(tag)
            }
        };
        (result.outcome().is_completed(), result)
    }
}

/// Optional runtime configuration surface of a host.
pub trait RuntimeHostSupport: Send + Sync {
    /// Mutate the host options in place, under the host's lock.
    fn configure(&self, configure: &mut dyn FnMut(&mut HostOptions));

    /// Add a directory to the library probing list (insertion order).
    fn register_native_library_path(&self, path: PathBuf);

    /// Install or clear the handler for backend log lines.
    fn register_log_handler(&self, handler: Option<LogHandler>);

    /// Whether the backend speaks the ABI version this build expects.
    fn verify_abi_compatibility(&self) -> bool;
}
