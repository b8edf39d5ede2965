// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Script-hosted message boxes.
//
// The dialog itself is rendered by a JavaScript bridge object. This host
// only handshakes with it, projects requests to JSON and maps the replies.
// Every bridge fault ends up as a PlatformFailure result.

pub mod message;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use nativebox_core::{
    HostOptions, MessageBoxOutcome, MessageBoxRequest, MessageBoxResult, NativeBoxError, RequestId,
    Result, StatusCode,
};

use self::message::{BrowserMessage, parse_response};
use crate::traits::{LogHandler, MessageBoxHost, RuntimeHostSupport};

pub const BROWSER_LOG_TARGET: &str = "nativebox::browser";

/// A fault reported by the script side (exception, rejected promise,
/// missing method).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("script bridge fault: {0}")]
pub struct BridgeError(pub String);

impl BridgeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The script object that renders dialogs.
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
pub trait ScriptBridge: Send + Sync {
    /// Whether the bridge object has been registered yet.
    fn is_available(&self) -> bool;

    fn initialize(&self) -> std::result::Result<(), BridgeError>;

    fn enable_logging(&self) -> std::result::Result<(), BridgeError>;

    fn disable_logging(&self) -> std::result::Result<(), BridgeError>;

    fn shutdown(&self);

    /// Show one dialog. Takes and returns JSON.
    async fn show_message_box(&self, request_json: String) -> std::result::Result<String, BridgeError>;
}

static LOG_HANDLER: RwLock<Option<LogHandler>> = RwLock::new(None);

/// Route one log line from the script side.
pub fn dispatch_browser_log(line: &str) {
    tracing::info!(target: BROWSER_LOG_TARGET, "{line}");
    let handler = LOG_HANDLER.read().unwrap_or_else(PoisonError::into_inner).clone();
    if let Some(handler) = handler {
        handler(line);
    }
}

fn set_log_handler(handler: Option<LogHandler>) -> bool {
    let mut slot = LOG_HANDLER.write().unwrap_or_else(PoisonError::into_inner);
    *slot = handler;
    slot.is_some()
}

#[derive(Default)]
struct BrowserState {
    options: HostOptions,
    initialized: bool,
}

pub struct BrowserHost<B> {
    bridge: B,
    state: Mutex<BrowserState>,
    init: Mutex<()>,
}

impl<B: ScriptBridge> BrowserHost<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            state: Mutex::new(BrowserState::default()),
            init: Mutex::new(()),
        }
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn options(&self) -> HostOptions {
        self.state().options.clone()
    }

    fn state(&self) -> MutexGuard<'_, BrowserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_logging(&self, enabled: bool) {
        let outcome = if enabled {
            self.bridge.enable_logging()
        } else {
            self.bridge.disable_logging()
        };
        if let Err(e) = outcome {
            tracing::debug!(error = %e, enabled, "ignoring bridge logging toggle failure");
        }
    }

    async fn dispatch(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult> {
        let request_id = RequestId::new();
        tracing::debug!(%request_id, "projecting request for the script bridge");
        self.ensure_initialized()?;

        let json = BrowserMessage::from(request).to_json()?;
        match self.bridge.show_message_box(json).await {
            Ok(reply) => {
                let result = parse_response(&reply, request);
                tracing::info!(%request_id, outcome = ?result.outcome(), button = result.button_id(), "message box closed");
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(%request_id, error = %e, "script bridge failed");
                Ok(MessageBoxResult::failure(
                    MessageBoxOutcome::PlatformFailure,
                    StatusCode::PlatformFailure.raw(),
                    request.tag().cloned(),
                ))
            }
        }
    }
}

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl<B: ScriptBridge> MessageBoxHost for BrowserHost<B> {
    fn ensure_initialized(&self) -> Result<()> {
        if self.state().initialized {
            return Ok(());
        }
        let _init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state().initialized {
            return Ok(());
        }

        if !self.bridge.is_available() {
            return Err(NativeBoxError::initialization(
                StatusCode::PlatformFailure,
                "script bridge is not loaded; include the bridge script before showing dialogs",
            ));
        }
        self.bridge.initialize().map_err(|e| {
            NativeBoxError::initialization(StatusCode::PlatformFailure, e.to_string())
        })?;
        if LOG_HANDLER.read().unwrap_or_else(PoisonError::into_inner).is_some() {
            self.set_logging(true);
        }

        self.state().initialized = true;
        tracing::info!("script bridge host initialized");
        Ok(())
    }

    fn shutdown(&self) {
        let _init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let mut state = self.state();
            if !state.initialized {
                return;
            }
            state.initialized = false;
        }
        self.bridge.shutdown();
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn show(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult> {
        futures::executor::block_on(self.dispatch(request))
    }

    #[cfg(target_arch = "wasm32")]
    fn show(&self, _request: &MessageBoxRequest) -> Result<MessageBoxResult> {
        Err(NativeBoxError::status(
            StatusCode::NotSupported,
            "synchronous show cannot wait on the script bridge; use show_async",
        ))
    }

    async fn show_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> Result<MessageBoxResult> {
        if cancel.is_cancelled() {
            return Err(NativeBoxError::DispatchCancelled);
        }
        self.dispatch(&request).await
    }
}

impl<B: ScriptBridge> RuntimeHostSupport for BrowserHost<B> {
    fn configure(&self, configure: &mut dyn FnMut(&mut HostOptions)) {
        configure(&mut self.state().options);
    }

    fn register_native_library_path(&self, path: PathBuf) {
        tracing::info!(
            path = %path.display(),
            "script bridge host has no native library; probing path ignored"
        );
    }

    fn register_log_handler(&self, handler: Option<LogHandler>) {
        let enabled = set_log_handler(handler);
        if self.state().initialized {
            self.set_logging(enabled);
        }
    }

    fn verify_abi_compatibility(&self) -> bool {
        true
    }
}
