// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native log callback.
//
// The backend receives `forward_native_log` plus a pointer to a `LogSink`
// owned by the host. Each line goes to `tracing` and, when one is
// registered, to the caller's handler.

use std::ffi::{CStr, c_char, c_void};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{PoisonError, RwLock};

use crate::traits::LogHandler;

pub const NATIVE_LOG_TARGET: &str = "nativebox::native";

#[derive(Default)]
pub struct LogSink {
    handler: RwLock<Option<LogHandler>>,
}

impl LogSink {
    pub fn set_handler(&self, handler: Option<LogHandler>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    pub fn has_handler(&self) -> bool {
        self.handler.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn dispatch(&self, line: &str) {
        tracing::info!(target: NATIVE_LOG_TARGET, "{line}");
        let handler = self.handler.read().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(handler) = handler {
            handler(line);
        }
    }

    /// `user_data` to hand the backend alongside [`forward_native_log`].
    pub fn as_user_data(&self) -> *mut c_void {
        std::ptr::from_ref(self).cast_mut().cast()
    }
}

/// C callback installed on the backend.
///
/// # Safety
/// `user_data` must be null or point to a live [`LogSink`].
pub unsafe extern "C" fn forward_native_log(user_data: *mut c_void, message: *const c_char) {
    if user_data.is_null() || message.is_null() {
        return;
    }
    // SAFETY: both pointers were checked; the sink outlives the backend.
    let sink = unsafe { &*user_data.cast::<LogSink>() };
    let line = unsafe { CStr::from_ptr(message) }.to_string_lossy();
    // A panicking handler must not unwind into native code.
    let _ = catch_unwind(AssertUnwindSafe(|| sink.dispatch(&line)));
}
