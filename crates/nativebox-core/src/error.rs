// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error type for nativebox.

use thiserror::Error;

use crate::outcome::{MessageBoxOutcome, MessageBoxResult, StatusCode};
use crate::types::CallerTag;

/// Top-level error type for all nativebox operations.
#[derive(Debug, Error)]
pub enum NativeBoxError {
    // -- Request construction --
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // -- Host / backend --
    #[error("{message} (status {code})")]
    Status { code: StatusCode, message: String },

    #[error("initialization failed: {message} (status {code})")]
    Initialization { code: StatusCode, message: String },

    #[error("message box returned an error outcome: {:?}", .0.outcome())]
    Dialog(Box<MessageBoxResult>),

    #[error("request was cancelled before dispatch")]
    DispatchCancelled,

    // -- Facade --
    #[error("the current host does not support {0}")]
    RuntimeSupportUnavailable(&'static str),

    // -- Serialization / IO --
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NativeBoxError {
    pub fn status(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    pub fn initialization(code: StatusCode, message: impl Into<String>) -> Self {
        Self::Initialization {
            code,
            message: message.into(),
        }
    }

    /// Raw status code the error corresponds to.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::Status { code, .. } | Self::Initialization { code, .. } => code.raw(),
            Self::Dialog(result) => result.native_result_code(),
            Self::InvalidRequest(_) => StatusCode::InvalidArgument.raw(),
            Self::DispatchCancelled => StatusCode::Cancelled.raw(),
            Self::RuntimeSupportUnavailable(_) => StatusCode::NotSupported.raw(),
            Self::Serialization(_) | Self::Io(_) => StatusCode::PlatformFailure.raw(),
        }
    }

    pub fn outcome(&self) -> MessageBoxOutcome {
        match self {
            Self::Dialog(result) => result.outcome(),
            _ => MessageBoxOutcome::from_status(self.status_code()),
        }
    }

    /// The partially-formed result, when the error carries one.
    pub fn result(&self) -> Option<&MessageBoxResult> {
        match self {
            Self::Dialog(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_initialization(&self) -> bool {
        matches!(self, Self::Initialization { .. })
    }

    /// Best-effort result used by the Try-variants in place of the error.
    pub fn into_fallback_result(self, tag: Option<CallerTag>) -> MessageBoxResult {
        match self {
            Self::Dialog(result) => *result,
            other => MessageBoxResult::failure(other.outcome(), other.status_code(), tag),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NativeBoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_error_carries_code() {
        let err = NativeBoxError::initialization(StatusCode::NotSupported, "entry point missing");
        assert!(err.is_initialization());
        assert_eq!(err.status_code(), 3);
        assert_eq!(err.outcome(), MessageBoxOutcome::NotSupported);
    }

    #[test]
    fn dialog_error_exposes_result() {
        let result = MessageBoxResult::new(0, false, None, false, 4, None);
        let err = NativeBoxError::Dialog(Box::new(result.clone()));
        assert_eq!(err.status_code(), 4);
        assert_eq!(err.outcome(), MessageBoxOutcome::PlatformFailure);
        assert_eq!(err.result(), Some(&result));
        assert_eq!(err.into_fallback_result(None), result);
    }

    #[test]
    fn fallback_result_keeps_tag() {
        let tag = CallerTag::new("ctx");
        let err = NativeBoxError::status(StatusCode::InvalidArgument, "needs STA");
        let fallback = err.into_fallback_result(Some(tag.clone()));
        assert_eq!(fallback.outcome(), MessageBoxOutcome::InvalidArgument);
        assert_eq!(fallback.native_result_code(), 1);
        assert_eq!(fallback.button_id(), 0);
        assert_eq!(fallback.tag(), Some(&tag));
    }
}
