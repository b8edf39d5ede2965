// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Backend status codes, the caller-facing outcome taxonomy, and the result
// every Show call produces.
//
// Status codes are the raw `u32` values the backends write. Anything outside
// the documented table maps to `Unknown` instead of failing.

use serde::Serialize;

use crate::types::CallerTag;

/// Raw status codes shared by every backend. Values never change between
/// ABI versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum StatusCode {
    Ok = 0,
    InvalidArgument = 1,
    Uninitialized = 2,
    NotSupported = 3,
    PlatformFailure = 4,
    Cancelled = 5,
    OutOfMemory = 6,
}

impl StatusCode {
    /// Decode a raw backend value. Returns `None` for codes outside the table.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Ok),
            1 => Some(Self::InvalidArgument),
            2 => Some(Self::Uninitialized),
            3 => Some(Self::NotSupported),
            4 => Some(Self::PlatformFailure),
            5 => Some(Self::Cancelled),
            6 => Some(Self::OutOfMemory),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?} ({})", self.raw())
    }
}

/// Caller-facing classification of how a Show call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageBoxOutcome {
    Success,
    Cancelled,
    NotSupported,
    PlatformFailure,
    OutOfMemory,
    InvalidArgument,
    Uninitialized,
    Unknown,
}

impl MessageBoxOutcome {
    /// Map a raw backend status to an outcome. Total over `u32`.
    pub fn from_status(raw: u32) -> Self {
        match StatusCode::from_raw(raw) {
            Some(StatusCode::Ok) => Self::Success,
            Some(StatusCode::Cancelled) => Self::Cancelled,
            Some(StatusCode::NotSupported) => Self::NotSupported,
            Some(StatusCode::PlatformFailure) => Self::PlatformFailure,
            Some(StatusCode::OutOfMemory) => Self::OutOfMemory,
            Some(StatusCode::InvalidArgument) => Self::InvalidArgument,
            Some(StatusCode::Uninitialized) => Self::Uninitialized,
            None => Self::Unknown,
        }
    }

    /// True when the dialog ran to completion, confirmed or dismissed.
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Success | Self::Cancelled)
    }
}

impl From<StatusCode> for MessageBoxOutcome {
    fn from(code: StatusCode) -> Self {
        Self::from_status(code.raw())
    }
}

/// Outcome of one Show invocation. Built once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageBoxResult {
    button_id: u32,
    checkbox_checked: bool,
    input_value: Option<String>,
    was_timeout: bool,
    outcome: MessageBoxOutcome,
    #[serde(skip)]
    tag: Option<CallerTag>,
    native_result_code: u32,
}

impl MessageBoxResult {
    /// Build a result from backend fields. The outcome is derived from the
    /// raw code so the two can never disagree.
    pub fn new(
        button_id: u32,
        checkbox_checked: bool,
        input_value: Option<String>,
        was_timeout: bool,
        native_result_code: u32,
        tag: Option<CallerTag>,
    ) -> Self {
        Self {
            button_id,
            checkbox_checked,
            input_value,
            was_timeout,
            outcome: MessageBoxOutcome::from_status(native_result_code),
            tag,
            native_result_code,
        }
    }

    /// Best-effort result for a call that never produced backend output.
    pub fn failure(outcome: MessageBoxOutcome, native_result_code: u32, tag: Option<CallerTag>) -> Self {
        Self {
            button_id: 0,
            checkbox_checked: false,
            input_value: None,
            was_timeout: false,
            outcome,
            tag,
            native_result_code,
        }
    }

    pub fn button_id(&self) -> u32 {
        self.button_id
    }

    pub fn checkbox_checked(&self) -> bool {
        self.checkbox_checked
    }

    pub fn input_value(&self) -> Option<&str> {
        self.input_value.as_deref()
    }

    pub fn was_timeout(&self) -> bool {
        self.was_timeout
    }

    pub fn outcome(&self) -> MessageBoxOutcome {
        self.outcome
    }

    pub fn tag(&self) -> Option<&CallerTag> {
        self.tag.as_ref()
    }

    /// Raw backend status, kept for diagnostics.
    pub fn native_result_code(&self) -> u32 {
        self.native_result_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_defined_code_maps_to_its_outcome() {
        let table = [
            (StatusCode::Ok, MessageBoxOutcome::Success),
            (StatusCode::Cancelled, MessageBoxOutcome::Cancelled),
            (StatusCode::NotSupported, MessageBoxOutcome::NotSupported),
            (StatusCode::PlatformFailure, MessageBoxOutcome::PlatformFailure),
            (StatusCode::OutOfMemory, MessageBoxOutcome::OutOfMemory),
            (StatusCode::InvalidArgument, MessageBoxOutcome::InvalidArgument),
            (StatusCode::Uninitialized, MessageBoxOutcome::Uninitialized),
        ];
        for (code, expected) in table {
            assert_eq!(MessageBoxOutcome::from_status(code.raw()), expected, "{code}");
        }
    }

    #[test]
    fn undefined_codes_map_to_unknown() {
        for raw in [7, 42, 1000, 0xFFFF_FFFF] {
            assert_eq!(MessageBoxOutcome::from_status(raw), MessageBoxOutcome::Unknown);
        }
    }

    #[test]
    fn status_values_are_stable() {
        assert_eq!(StatusCode::Ok.raw(), 0);
        assert_eq!(StatusCode::InvalidArgument.raw(), 1);
        assert_eq!(StatusCode::Uninitialized.raw(), 2);
        assert_eq!(StatusCode::NotSupported.raw(), 3);
        assert_eq!(StatusCode::PlatformFailure.raw(), 4);
        assert_eq!(StatusCode::Cancelled.raw(), 5);
        assert_eq!(StatusCode::OutOfMemory.raw(), 6);
        assert_eq!(StatusCode::from_raw(6), Some(StatusCode::OutOfMemory));
        assert_eq!(StatusCode::from_raw(7), None);
    }

    #[test]
    fn only_success_and_cancel_complete() {
        assert!(MessageBoxOutcome::Success.is_completed());
        assert!(MessageBoxOutcome::Cancelled.is_completed());
        assert!(!MessageBoxOutcome::PlatformFailure.is_completed());
        assert!(!MessageBoxOutcome::Unknown.is_completed());
    }

    #[test]
    fn result_outcome_follows_raw_code() {
        let result = MessageBoxResult::new(2, true, Some("x".into()), false, 5, None);
        assert_eq!(result.outcome(), MessageBoxOutcome::Cancelled);
        assert_eq!(result.native_result_code(), 5);
        assert_eq!(result.input_value(), Some("x"));
    }
}
