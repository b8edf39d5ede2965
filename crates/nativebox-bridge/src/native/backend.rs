// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The five native entry points as a trait, so the host can drive either a
// loaded library or an in-process double.

use std::ffi::c_void;

use nativebox_abi::schema::{
    LogCallback, NmbInitializeOptions, NmbMessageBoxOptions, NmbMessageBoxResult,
};

/// A native dialog backend.
///
/// # Safety
/// Every pointer reachable from the blocks passed in must be valid for the
/// duration of the call. The host only passes blocks built by
/// `nativebox_abi::build_request` inside a live memory scope.
pub trait NativeBackend: Send + Sync {
    /// `nmb_initialize`. Returns a raw status code.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn initialize(&self, options: &NmbInitializeOptions) -> u32;

    /// `nmb_show_message_box`. Blocks for the lifetime of the dialog.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn show_message_box(
        &self,
        options: &NmbMessageBoxOptions,
        result: &mut NmbMessageBoxResult,
    ) -> u32;

    fn shutdown(&self);

    fn abi_version(&self) -> u32;

    /// # Safety
    /// `user_data` must stay valid until the callback is replaced or the
    /// backend is shut down.
    unsafe fn set_log_callback(&self, callback: Option<LogCallback>, user_data: *mut c_void);
}
