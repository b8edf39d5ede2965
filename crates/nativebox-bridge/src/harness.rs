// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process native backend for tests and headless runs.
//
// `ScriptedBackend` speaks the same entry points as the real library: it
// checks the size and version stamps, decodes and records every request, and
// answers with whatever the current script says. Input text goes back
// through the allocator the request carried, exactly as a real backend would.

use std::ffi::{c_char, c_void};
use std::sync::{Mutex, MutexGuard, PoisonError};

use nativebox_abi::alloc::{Allocator, read_c_str};
use nativebox_abi::schema::{
    ABI_VERSION, INITIALIZE_OPTIONS_MIN_SIZE, LogCallback, MESSAGE_BOX_OPTIONS_MIN_SIZE,
    MESSAGE_BOX_RESULT_MIN_SIZE, NmbButtonOption, NmbInitializeOptions,
    NmbMessageBoxOptions, NmbMessageBoxResult, from_nmb_bool, nmb_bool, result_code,
};

use crate::native::NativeBackend;

/// How the next dialogs answer.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Button to report; the default (else first) button when unset.
    pub button: Option<u32>,
    pub checkbox_checked: bool,
    /// Report the request's timeout button with `was_timeout` set.
    pub simulate_timeout: bool,
    /// Written into the result block.
    pub result_code: u32,
    /// Returned from `nmb_show_message_box`.
    pub status: u32,
    pub input_value: Option<String>,
    /// Returned from `nmb_initialize`.
    pub initialize_status: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedButton {
    pub id: u32,
    pub label: String,
    pub description: Option<String>,
    pub kind: u32,
    pub is_default: bool,
    pub is_cancel: bool,
}

/// Decoded copy of one request block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub buttons: Vec<RecordedButton>,
    pub icon: u32,
    pub severity: u32,
    pub modality: u32,
    pub parent_window: usize,
    pub input_mode: Option<u32>,
    pub combo_items: Vec<String>,
    pub has_secondary: bool,
    pub verification_text: Option<String>,
    pub allow_cancel_via_escape: bool,
    pub show_suppress_checkbox: bool,
    pub requires_explicit_ack: bool,
    pub timeout_milliseconds: u32,
    pub timeout_button_id: u32,
    pub locale: Option<String>,
}

#[derive(Debug, Default)]
struct Calls {
    initialize: usize,
    show: usize,
    shutdown: usize,
    runtime_name: Option<String>,
    requests: Vec<RecordedRequest>,
}

#[derive(Default)]
struct LogTarget {
    callback: Option<LogCallback>,
    user_data: usize,
}

pub struct ScriptedBackend {
    abi_version: u32,
    script: Mutex<Script>,
    calls: Mutex<Calls>,
    log: Mutex<LogTarget>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::with_abi_version(ABI_VERSION)
    }

    /// A backend that reports `version` from `nmb_get_abi_version`.
    pub fn with_abi_version(version: u32) -> Self {
        Self {
            abi_version: version,
            script: Mutex::new(Script::default()),
            calls: Mutex::new(Calls::default()),
            log: Mutex::new(LogTarget::default()),
        }
    }

    pub fn script(&self, update: impl FnOnce(&mut Script)) {
        update(&mut lock(&self.script));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.calls).requests.clone()
    }

    pub fn initialize_calls(&self) -> usize {
        lock(&self.calls).initialize
    }

    pub fn show_calls(&self) -> usize {
        lock(&self.calls).show
    }

    pub fn shutdown_calls(&self) -> usize {
        lock(&self.calls).shutdown
    }

    pub fn runtime_name(&self) -> Option<String> {
        lock(&self.calls).runtime_name.clone()
    }

    /// Send a line through the installed log callback, if any.
    pub fn emit_log(&self, line: &str) {
        let (callback, user_data) = {
            let target = lock(&self.log);
            (target.callback, target.user_data)
        };
        let Ok(text) = std::ffi::CString::new(line) else {
            return;
        };
        if let Some(callback) = callback {
            // SAFETY: the host guarantees `user_data` outlives the callback.
            unsafe { callback(user_data as *mut c_void, text.as_ptr()) };
        }
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

unsafe fn text(ptr: *const c_char) -> Option<String> {
    unsafe { read_c_str(ptr) }
}

unsafe fn decode(options: &NmbMessageBoxOptions) -> RecordedRequest {
    let buttons: &[NmbButtonOption] = if options.buttons.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(options.buttons, options.button_count) }
    };
    let input = unsafe { options.input.as_ref() };
    let mut combo_items = Vec::new();
    if let Some(input) = input {
        let mut cursor = input.combo_items_utf8;
        while !cursor.is_null() && unsafe { !(*cursor).is_null() } {
            combo_items.extend(unsafe { text(*cursor) });
            cursor = unsafe { cursor.add(1) };
        }
    }

    RecordedRequest {
        title: unsafe { text(options.title_utf8) },
        message: unsafe { text(options.message_utf8) },
        buttons: buttons
            .iter()
            .map(|b| RecordedButton {
                id: b.id,
                label: unsafe { text(b.label_utf8) }.unwrap_or_default(),
                description: unsafe { text(b.description_utf8) },
                kind: b.kind,
                is_default: from_nmb_bool(b.is_default),
                is_cancel: from_nmb_bool(b.is_cancel),
            })
            .collect(),
        icon: options.icon,
        severity: options.severity,
        modality: options.modality,
        parent_window: options.parent_window as usize,
        input_mode: input.map(|i| i.mode),
        combo_items,
        has_secondary: !options.secondary.is_null(),
        verification_text: unsafe { text(options.verification_text_utf8) },
        allow_cancel_via_escape: from_nmb_bool(options.allow_cancel_via_escape),
        show_suppress_checkbox: from_nmb_bool(options.show_suppress_checkbox),
        requires_explicit_ack: from_nmb_bool(options.requires_explicit_ack),
        timeout_milliseconds: options.timeout_milliseconds,
        timeout_button_id: options.timeout_button_id,
        locale: unsafe { text(options.locale_utf8) },
    }
}

impl NativeBackend for ScriptedBackend {
    unsafe fn initialize(&self, options: &NmbInitializeOptions) -> u32 {
        let mut calls = lock(&self.calls);
        calls.initialize += 1;
        if (options.struct_size as usize) < INITIALIZE_OPTIONS_MIN_SIZE {
            return result_code::INVALID_ARGUMENT;
        }
        if options.abi_version != ABI_VERSION {
            return result_code::NOT_SUPPORTED;
        }
        calls.runtime_name = unsafe { text(options.runtime_name_utf8) };
        drop(calls);

        *lock(&self.log) = LogTarget {
            callback: options.log_callback,
            user_data: options.log_user_data as usize,
        };
        lock(&self.script).initialize_status
    }

    unsafe fn show_message_box(
        &self,
        options: &NmbMessageBoxOptions,
        result: &mut NmbMessageBoxResult,
    ) -> u32 {
        lock(&self.calls).show += 1;
        if (options.struct_size as usize) < MESSAGE_BOX_OPTIONS_MIN_SIZE
            || (result.struct_size as usize) < MESSAGE_BOX_RESULT_MIN_SIZE
        {
            return result_code::INVALID_ARGUMENT;
        }
        if options.abi_version != ABI_VERSION {
            return result_code::NOT_SUPPORTED;
        }

        let request = unsafe { decode(options) };
        let script = lock(&self.script).clone();

        let button = if script.simulate_timeout {
            request.timeout_button_id
        } else {
            script.button.unwrap_or_else(|| {
                request
                    .buttons
                    .iter()
                    .find(|b| b.is_default)
                    .or(request.buttons.first())
                    .map_or(0, |b| b.id)
            })
        };

        result.button = button;
        result.checkbox_checked = nmb_bool(script.checkbox_checked);
        result.was_timeout = nmb_bool(script.simulate_timeout);
        result.result_code = script.result_code;
        if let Some(value) = &script.input_value {
            // SAFETY: the allocator record lives in the caller's request scope.
            let allocator = unsafe { options.allocator.as_ref() }
                .and_then(|raw| unsafe { Allocator::from_raw(*raw) });
            match allocator.map(|a| a.copy_str(value)) {
                Some(Ok(copy)) => result.input_value_utf8 = copy.as_ptr(),
                _ => return result_code::OUT_OF_MEMORY,
            }
        }

        lock(&self.calls).requests.push(request);
        script.status
    }

    fn shutdown(&self) {
        lock(&self.calls).shutdown += 1;
        *lock(&self.log) = LogTarget::default();
    }

    fn abi_version(&self) -> u32 {
        self.abi_version
    }

    unsafe fn set_log_callback(&self, callback: Option<LogCallback>, user_data: *mut c_void) {
        *lock(&self.log) = LogTarget {
            callback,
            user_data: user_data as usize,
        };
    }
}

#[cfg(test)]
mod tests {
    use nativebox_abi::{MemoryScope, build_request, new_result_block, parse_result};
    use nativebox_core::{ButtonSpec, InputSpec, MessageBoxOutcome, MessageBoxRequest};

    use super::*;

    fn run(backend: &ScriptedBackend, request: &MessageBoxRequest) -> u32 {
        let scope = MemoryScope::new();
        let block = build_request(request, &scope, None).unwrap();
        let mut raw = new_result_block();
        let status = unsafe { backend.show_message_box(&block, &mut raw) };
        let parsed = parse_result(&mut raw, request, &scope.allocator());
        assert_eq!(parsed.native_result_code(), raw.result_code);
        status
    }

    #[test]
    fn records_decoded_request() {
        let backend = ScriptedBackend::new();
        let request = MessageBoxRequest::builder("Pick")
            .title("Choice")
            .button(ButtonSpec::new(3, "Yes").unwrap().as_default())
            .button(ButtonSpec::new(4, "No").unwrap().as_cancel())
            .input(InputSpec::combo(["one", "two"]).unwrap())
            .build()
            .unwrap();
        let status = run(&backend, &request);
        assert_eq!(status, result_code::OK);

        let recorded = &backend.requests()[0];
        assert_eq!(recorded.title.as_deref(), Some("Choice"));
        assert_eq!(recorded.message.as_deref(), Some("Pick"));
        assert_eq!(recorded.buttons.len(), 2);
        assert!(recorded.buttons[0].is_default);
        assert!(recorded.buttons[1].is_cancel);
        assert_eq!(recorded.combo_items, ["one", "two"]);
        assert!(recorded.allow_cancel_via_escape);
    }

    #[test]
    fn input_text_travels_through_request_allocator() {
        let backend = ScriptedBackend::new();
        backend.script(|s| s.input_value = Some("typed".into()));
        let request = MessageBoxRequest::builder("Name?")
            .input(InputSpec::text())
            .build()
            .unwrap();

        let scope = MemoryScope::new();
        let block = build_request(&request, &scope, None).unwrap();
        let mut raw = new_result_block();
        unsafe { backend.show_message_box(&block, &mut raw) };
        let parsed = parse_result(&mut raw, &request, &scope.allocator());
        assert_eq!(parsed.input_value(), Some("typed"));
        assert_eq!(parsed.outcome(), MessageBoxOutcome::Success);
    }

    #[test]
    fn rejects_truncated_blocks() {
        let backend = ScriptedBackend::new();
        let request = MessageBoxRequest::message("x").unwrap();
        let scope = MemoryScope::new();
        let block = build_request(&request, &scope, None).unwrap();
        let mut options = *block;
        options.struct_size = 8;
        let mut raw = new_result_block();
        let status = unsafe { backend.show_message_box(&options, &mut raw) };
        assert_eq!(status, result_code::INVALID_ARGUMENT);

        options.struct_size = block.struct_size;
        options.abi_version = ABI_VERSION + 1;
        let status = unsafe { backend.show_message_box(&options, &mut raw) };
        assert_eq!(status, result_code::NOT_SUPPORTED);
        assert!(backend.requests().is_empty());
    }
}
