// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `globalThis.NativeMessageBoxManaged` as a ScriptBridge.

use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use super::{BridgeError, ScriptBridge, dispatch_browser_log};

/// Name of the bridge object on `globalThis`.
pub const BRIDGE_OBJECT: &str = "NativeMessageBoxManaged";

/// Looks the bridge object up on every call, so a script loaded after the
/// host was created is still found.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalThisBridge;

fn js_error(value: JsValue) -> BridgeError {
    BridgeError(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

fn bridge_object() -> Option<JsValue> {
    let value = Reflect::get(&js_sys::global(), &BRIDGE_OBJECT.into()).ok()?;
    (!value.is_undefined() && !value.is_null()).then_some(value)
}

fn call(method: &str, arg: Option<&JsValue>) -> Result<JsValue, BridgeError> {
    let object =
        bridge_object().ok_or_else(|| BridgeError::new(format!("{BRIDGE_OBJECT} is not loaded")))?;
    let function: Function = Reflect::get(&object, &method.into())
        .map_err(js_error)?
        .dyn_into()
        .map_err(|_| BridgeError::new(format!("{BRIDGE_OBJECT}.{method} is not a function")))?;
    match arg {
        Some(arg) => function.call1(&object, arg),
        None => function.call0(&object),
    }
    .map_err(js_error)
}

#[async_trait(?Send)]
impl ScriptBridge for GlobalThisBridge {
    fn is_available(&self) -> bool {
        bridge_object().is_some()
    }

    fn initialize(&self) -> Result<(), BridgeError> {
        call("initialize", None).map(drop)
    }

    fn enable_logging(&self) -> Result<(), BridgeError> {
        call("enableLogging", None).map(drop)
    }

    fn disable_logging(&self) -> Result<(), BridgeError> {
        call("disableLogging", None).map(drop)
    }

    fn shutdown(&self) {
        if let Err(e) = call("shutdown", None) {
            tracing::debug!(error = %e, "bridge shutdown failed");
        }
    }

    async fn show_message_box(&self, request_json: String) -> Result<String, BridgeError> {
        let pending = call("showMessageBox", Some(&JsValue::from_str(&request_json)))?;
        // Accepts a promise or a plain value.
        let reply = JsFuture::from(Promise::resolve(&pending))
            .await
            .map_err(js_error)?;
        reply
            .as_string()
            .ok_or_else(|| BridgeError::new("showMessageBox resolved to a non-string value"))
    }
}

/// Called by the bridge script for every log line.
#[wasm_bindgen]
pub fn nativebox_dispatch_log(message: &str) {
    dispatch_browser_log(message);
}
