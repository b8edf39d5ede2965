// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativebox-bridge — hosts that present message boxes.
//
// Three hosts share one capability contract (`traits::MessageBoxHost`):
//
//   native:  loads `nativemessagebox` (.dll / .so / .dylib) and calls its C
//            ABI. Desktop and Android.
//   browser: talks to a JavaScript bridge object. wasm32, or any target
//            through a custom `ScriptBridge`.
//   android: not a host; it tracks the foreground activity and feeds it to
//            the native host as the default parent window.
//
// `harness` provides a scripted in-process backend for tests and demos.

pub mod android;
pub mod browser;
pub mod traits;
pub mod validate;

#[cfg(not(target_arch = "wasm32"))]
pub mod harness;
#[cfg(not(target_arch = "wasm32"))]
pub mod native;

pub use traits::{LogHandler, MessageBoxHost, RuntimeHostSupport};
pub use validate::{ApartmentState, Platform, PlatformCapabilities};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeRuntimeHost;
