// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire contract between callers and the native dialog library.
//
// Field order and widths must match `native_message_box.h` exactly. Every
// block starts with its own byte size; the top-level blocks also carry the
// ABI version. Enum-typed fields are plain `u32` so a backend writing an
// unexpected value can never produce an invalid Rust enum.

use std::ffi::{CStr, c_char, c_void};
use std::mem::{offset_of, size_of};
use std::ptr;

/// One-byte boolean used by every block.
pub type NmbBool = u8;
pub const NMB_FALSE: NmbBool = 0;
pub const NMB_TRUE: NmbBool = 1;

pub fn nmb_bool(value: bool) -> NmbBool {
    if value { NMB_TRUE } else { NMB_FALSE }
}

/// Any non-zero byte reads as true.
pub fn from_nmb_bool(value: NmbBool) -> bool {
    value != NMB_FALSE
}

/// `MAJOR << 16 | MINOR << 8 | PATCH`.
pub const fn make_version(major: u32, minor: u32, patch: u32) -> u32 {
    ((major & 0xFF) << 16) | ((minor & 0xFF) << 8) | (patch & 0xFF)
}

/// ABI version this crate was compiled against.
pub const ABI_VERSION: u32 = make_version(0, 1, 0);

pub mod result_code {
    pub const OK: u32 = 0;
    pub const INVALID_ARGUMENT: u32 = 1;
    pub const UNINITIALIZED: u32 = 2;
    pub const NOT_SUPPORTED: u32 = 3;
    pub const PLATFORM_FAILURE: u32 = 4;
    pub const CANCELLED: u32 = 5;
    pub const OUT_OF_MEMORY: u32 = 6;
    pub const UNKNOWN: u32 = 0xFFFF_FFFF;
}

pub mod modality {
    pub const APP: u32 = 0;
    pub const WINDOW: u32 = 1;
    pub const SYSTEM: u32 = 2;
}

pub type AllocateFn =
    unsafe extern "C" fn(user_data: *mut c_void, size: usize, alignment: usize) -> *mut c_void;
pub type DeallocateFn = unsafe extern "C" fn(user_data: *mut c_void, ptr: *mut c_void);
pub type LogCallback = unsafe extern "C" fn(user_data: *mut c_void, message_utf8: *const c_char);

/// Allocator handed to the backend for anything it returns to the caller.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbAllocator {
    pub allocate: Option<AllocateFn>,
    pub deallocate: Option<DeallocateFn>,
    pub user_data: *mut c_void,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbButtonOption {
    pub struct_size: u32,
    pub id: u32,
    pub label_utf8: *const c_char,
    pub description_utf8: *const c_char,
    pub kind: u32,
    pub is_default: NmbBool,
    pub is_cancel: NmbBool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbInputOption {
    pub struct_size: u32,
    pub mode: u32,
    pub prompt_utf8: *const c_char,
    pub placeholder_utf8: *const c_char,
    pub default_value_utf8: *const c_char,
    /// Null-terminated array of item pointers; only set for combo mode.
    pub combo_items_utf8: *const *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbSecondaryContentOption {
    pub struct_size: u32,
    pub informative_text_utf8: *const c_char,
    pub expanded_text_utf8: *const c_char,
    pub footer_text_utf8: *const c_char,
    pub help_link_utf8: *const c_char,
}

/// Top-level request block. All pointers are owned by the caller and stay
/// valid for the duration of `nmb_show_message_box`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbMessageBoxOptions {
    pub struct_size: u32,
    pub abi_version: u32,
    pub title_utf8: *const c_char,
    pub message_utf8: *const c_char,
    pub buttons: *const NmbButtonOption,
    pub button_count: usize,
    pub icon: u32,
    pub severity: u32,
    pub modality: u32,
    pub parent_window: *const c_void,
    pub input: *const NmbInputOption,
    pub secondary: *const NmbSecondaryContentOption,
    pub verification_text_utf8: *const c_char,
    pub allow_cancel_via_escape: NmbBool,
    pub show_suppress_checkbox: NmbBool,
    pub requires_explicit_ack: NmbBool,
    pub timeout_milliseconds: u32,
    pub timeout_button_id: u32,
    pub locale_utf8: *const c_char,
    pub allocator: *const NmbAllocator,
    pub user_context: *mut c_void,
}

/// Result block filled by the backend. `input_value_utf8` is allocated with
/// the request's allocator and belongs to the caller afterwards.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbMessageBoxResult {
    pub struct_size: u32,
    pub button: u32,
    pub checkbox_checked: NmbBool,
    pub input_value_utf8: *const c_char,
    pub was_timeout: NmbBool,
    pub result_code: u32,
}

impl NmbMessageBoxResult {
    /// Empty result stamped with its size and an optimistic `OK` code.
    pub fn new() -> Self {
        Self {
            struct_size: struct_size::<Self>(),
            button: 0,
            checkbox_checked: NMB_FALSE,
            input_value_utf8: ptr::null(),
            was_timeout: NMB_FALSE,
            result_code: result_code::OK,
        }
    }
}

impl Default for NmbMessageBoxResult {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NmbInitializeOptions {
    pub struct_size: u32,
    pub abi_version: u32,
    pub runtime_name_utf8: *const c_char,
    pub allocator: *const NmbAllocator,
    pub enable_async_dispatch: NmbBool,
    pub log_callback: Option<LogCallback>,
    pub log_user_data: *mut c_void,
}

impl NmbInitializeOptions {
    pub fn new() -> Self {
        Self {
            struct_size: struct_size::<Self>(),
            abi_version: ABI_VERSION,
            runtime_name_utf8: ptr::null(),
            allocator: ptr::null(),
            enable_async_dispatch: NMB_FALSE,
            log_callback: None,
            log_user_data: ptr::null_mut(),
        }
    }
}

impl Default for NmbInitializeOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte size stamped into a block's `struct_size` field.
pub fn struct_size<T>() -> u32 {
    size_of::<T>() as u32
}

/// Smallest blocks a backend accepts: everything up to the last field it reads.
pub const INITIALIZE_OPTIONS_MIN_SIZE: usize =
    offset_of!(NmbInitializeOptions, log_user_data) + size_of::<*mut c_void>();
pub const MESSAGE_BOX_OPTIONS_MIN_SIZE: usize =
    offset_of!(NmbMessageBoxOptions, user_context) + size_of::<*mut c_void>();
pub const MESSAGE_BOX_RESULT_MIN_SIZE: usize =
    offset_of!(NmbMessageBoxResult, result_code) + size_of::<u32>();

// Exported entry points. Windows builds use stdcall on x86, hence "system".
pub type InitializeFn = unsafe extern "system" fn(options: *const NmbInitializeOptions) -> u32;
pub type ShowMessageBoxFn = unsafe extern "system" fn(
    options: *const NmbMessageBoxOptions,
    out_result: *mut NmbMessageBoxResult,
) -> u32;
pub type ShutdownFn = unsafe extern "system" fn();
pub type GetAbiVersionFn = unsafe extern "system" fn() -> u32;
pub type SetLogCallbackFn =
    unsafe extern "system" fn(callback: Option<LogCallback>, user_data: *mut c_void);

pub const ENTRY_INITIALIZE: &CStr = c"nmb_initialize";
pub const ENTRY_SHOW_MESSAGE_BOX: &CStr = c"nmb_show_message_box";
pub const ENTRY_SHUTDOWN: &CStr = c"nmb_shutdown";
pub const ENTRY_GET_ABI_VERSION: &CStr = c"nmb_get_abi_version";
pub const ENTRY_SET_LOG_CALLBACK: &CStr = c"nmb_set_log_callback";
