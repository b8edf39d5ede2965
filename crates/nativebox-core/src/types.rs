// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Caller-facing request model.
//
// Every type here is validated on construction and immutable afterwards, so a
// request that reaches a host is always well-formed. Enum discriminants are
// the ABI values and must never be renumbered.

use std::any::Any;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NativeBoxError, Result};

/// Well-known button identifiers understood by every backend.
pub mod button_id {
    pub const NONE: u32 = 0;
    pub const OK: u32 = 1;
    pub const CANCEL: u32 = 2;
    pub const YES: u32 = 3;
    pub const NO: u32 = 4;
    pub const RETRY: u32 = 5;
    pub const CONTINUE: u32 = 6;
    pub const IGNORE: u32 = 7;
    pub const ABORT: u32 = 8;
    pub const CLOSE: u32 = 9;
    pub const HELP: u32 = 10;
    pub const TRY_AGAIN: u32 = 11;
    /// First id available for application-defined buttons.
    pub const CUSTOM_BASE: u32 = 1000;
}

/// Correlates the log lines of one Show call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Semantic styling hint for a button.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ButtonKind {
    #[default]
    Default = 0,
    Primary = 1,
    Secondary = 2,
    Destructive = 3,
    Help = 4,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Icon {
    #[default]
    None = 0,
    Information = 1,
    Warning = 2,
    Error = 3,
    Question = 4,
    Shield = 5,
}

/// Severity forwarded to accessibility APIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Severity {
    #[default]
    Info = 0,
    Warning = 1,
    Error = 2,
    Critical = 3,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum Modality {
    #[default]
    Application = 0,
    Window = 1,
    System = 2,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum InputMode {
    #[default]
    None = 0,
    Checkbox = 1,
    Text = 2,
    Password = 3,
    Combo = 4,
}

/// Opaque platform window handle (HWND, NSWindow*, GtkWindow*, jobject).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(NonZeroUsize);

impl WindowHandle {
    /// Wrap a raw handle. Returns `None` for a null pointer.
    pub fn from_raw(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn as_raw(self) -> usize {
        self.0.get()
    }
}

/// Caller-owned value carried through a Show call and echoed into the result.
#[derive(Clone)]
pub struct CallerTag(Arc<dyn Any + Send + Sync>);

impl CallerTag {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for CallerTag {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for CallerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallerTag(..)")
    }
}

/// One dialog button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonSpec {
    id: u32,
    label: String,
    kind: ButtonKind,
    is_default: bool,
    is_cancel: bool,
    description: Option<String>,
}

impl ButtonSpec {
    /// Create a button. The label must contain visible text.
    pub fn new(id: u32, label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(NativeBoxError::InvalidRequest("button label must be provided".into()));
        }
        Ok(Self {
            id,
            label,
            kind: ButtonKind::Default,
            is_default: false,
            is_cancel: false,
            description: None,
        })
    }

    /// The button synthesised when a request supplies none.
    pub fn ok() -> Self {
        Self {
            id: button_id::OK,
            label: "OK".into(),
            kind: ButtonKind::Primary,
            is_default: true,
            is_cancel: false,
            description: None,
        }
    }

    pub fn with_kind(mut self, kind: ButtonKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn as_cancel(mut self) -> Self {
        self.is_cancel = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn is_cancel(&self) -> bool {
        self.is_cancel
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Optional input control shown below the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    mode: InputMode,
    prompt: Option<String>,
    placeholder: Option<String>,
    default_value: Option<String>,
    combo_items: Vec<String>,
}

impl InputSpec {
    /// Create an input spec. Combo mode needs at least one item; the items are
    /// ignored for every other mode.
    pub fn new<I, S>(mode: InputMode, combo_items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let combo_items: Vec<String> = match mode {
            InputMode::Combo => combo_items.into_iter().map(Into::into).collect(),
            _ => Vec::new(),
        };
        if mode == InputMode::Combo && combo_items.is_empty() {
            return Err(NativeBoxError::InvalidRequest(
                "combo box mode requires at least one item".into(),
            ));
        }
        Ok(Self {
            mode,
            prompt: None,
            placeholder: None,
            default_value: None,
            combo_items,
        })
    }

    pub fn checkbox() -> Self {
        Self::simple(InputMode::Checkbox)
    }

    pub fn text() -> Self {
        Self::simple(InputMode::Text)
    }

    pub fn password() -> Self {
        Self::simple(InputMode::Password)
    }

    pub fn combo<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(InputMode::Combo, items)
    }

    fn simple(mode: InputMode) -> Self {
        Self {
            mode,
            prompt: None,
            placeholder: None,
            default_value: None,
            combo_items: Vec::new(),
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn combo_items(&self) -> &[String] {
        &self.combo_items
    }
}

/// Presentational extras. Passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecondaryContent {
    pub informative_text: Option<String>,
    pub expanded_text: Option<String>,
    pub footer_text: Option<String>,
    pub help_link: Option<String>,
}

/// A fully validated message box request.
#[derive(Debug, Clone)]
pub struct MessageBoxRequest {
    message: String,
    title: Option<String>,
    buttons: Vec<ButtonSpec>,
    icon: Icon,
    severity: Severity,
    modality: Modality,
    parent_window: Option<WindowHandle>,
    input: Option<InputSpec>,
    secondary: Option<SecondaryContent>,
    verification_text: Option<String>,
    allow_cancel_via_escape: bool,
    show_suppress_checkbox: bool,
    requires_explicit_ack: bool,
    timeout: Option<Duration>,
    timeout_button_id: Option<u32>,
    locale: Option<String>,
    tag: Option<CallerTag>,
}

impl MessageBoxRequest {
    pub fn builder(message: impl Into<String>) -> MessageBoxRequestBuilder {
        MessageBoxRequestBuilder::new(message)
    }

    /// Shorthand for a plain message with the default OK button.
    pub fn message(message: impl Into<String>) -> Result<Self> {
        Self::builder(message).build()
    }

    pub fn text(&self) -> &str {
        &self.message
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn buttons(&self) -> &[ButtonSpec] {
        &self.buttons
    }

    pub fn icon(&self) -> Icon {
        self.icon
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn parent_window(&self) -> Option<WindowHandle> {
        self.parent_window
    }

    pub fn input(&self) -> Option<&InputSpec> {
        self.input.as_ref()
    }

    /// Input mode, `None` when no input spec is set.
    pub fn input_mode(&self) -> InputMode {
        self.input.as_ref().map_or(InputMode::None, InputSpec::mode)
    }

    pub fn secondary(&self) -> Option<&SecondaryContent> {
        self.secondary.as_ref()
    }

    pub fn verification_text(&self) -> Option<&str> {
        self.verification_text.as_deref()
    }

    pub fn allow_cancel_via_escape(&self) -> bool {
        self.allow_cancel_via_escape
    }

    pub fn show_suppress_checkbox(&self) -> bool {
        self.show_suppress_checkbox
    }

    pub fn requires_explicit_ack(&self) -> bool {
        self.requires_explicit_ack
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn timeout_button_id(&self) -> Option<u32> {
        self.timeout_button_id
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn tag(&self) -> Option<&CallerTag> {
        self.tag.as_ref()
    }

    /// Timeout in milliseconds, clamped to `u32`. Zero means disabled.
    pub fn timeout_millis(&self) -> u32 {
        self.timeout
            .map(|t| u32::try_from(t.as_millis()).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }

    /// Button reported when the timeout elapses: the explicit timeout button,
    /// else the default button, else the cancel button, else the first one.
    /// `None` when no timeout is configured.
    pub fn effective_timeout_button(&self) -> Option<u32> {
        if self.timeout_millis() == 0 {
            return None;
        }
        self.timeout_button_id
            .or_else(|| self.buttons.iter().find(|b| b.is_default).map(ButtonSpec::id))
            .or_else(|| self.buttons.iter().find(|b| b.is_cancel).map(ButtonSpec::id))
            .or_else(|| self.buttons.first().map(ButtonSpec::id))
    }

    /// Whether the request uses anything beyond message + buttons.
    pub fn uses_advanced_features(&self) -> bool {
        self.input_mode() != InputMode::None
            || self.secondary.is_some()
            || self.verification_text.as_deref().is_some_and(|t| !t.trim().is_empty())
            || self.show_suppress_checkbox
            || self.requires_explicit_ack
            || self.timeout_millis() > 0
            || self.timeout_button_id.is_some()
            || self.buttons.len() > 3
    }
}

/// Builder for [`MessageBoxRequest`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct MessageBoxRequestBuilder {
    message: String,
    title: Option<String>,
    buttons: Option<Vec<ButtonSpec>>,
    icon: Icon,
    severity: Severity,
    modality: Modality,
    parent_window: Option<WindowHandle>,
    input: Option<InputSpec>,
    secondary: Option<SecondaryContent>,
    verification_text: Option<String>,
    allow_cancel_via_escape: bool,
    show_suppress_checkbox: bool,
    requires_explicit_ack: bool,
    timeout: Option<Duration>,
    timeout_button_id: Option<u32>,
    locale: Option<String>,
    tag: Option<CallerTag>,
}

impl MessageBoxRequestBuilder {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: None,
            buttons: None,
            icon: Icon::None,
            severity: Severity::Info,
            modality: Modality::Application,
            parent_window: None,
            input: None,
            secondary: None,
            verification_text: None,
            allow_cancel_via_escape: true,
            show_suppress_checkbox: false,
            requires_explicit_ack: false,
            timeout: None,
            timeout_button_id: None,
            locale: None,
            tag: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Append one button.
    pub fn button(mut self, button: ButtonSpec) -> Self {
        self.buttons.get_or_insert_with(Vec::new).push(button);
        self
    }

    /// Replace the button list. An empty list fails validation.
    pub fn buttons(mut self, buttons: impl IntoIterator<Item = ButtonSpec>) -> Self {
        self.buttons = Some(buttons.into_iter().collect());
        self
    }

    pub fn icon(mut self, icon: Icon) -> Self {
        self.icon = icon;
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn modality(mut self, modality: Modality) -> Self {
        self.modality = modality;
        self
    }

    pub fn parent_window(mut self, handle: WindowHandle) -> Self {
        self.parent_window = Some(handle);
        self
    }

    pub fn input(mut self, input: InputSpec) -> Self {
        self.input = Some(input);
        self
    }

    pub fn secondary(mut self, secondary: SecondaryContent) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn verification_text(mut self, text: impl Into<String>) -> Self {
        self.verification_text = Some(text.into());
        self
    }

    pub fn allow_cancel_via_escape(mut self, allow: bool) -> Self {
        self.allow_cancel_via_escape = allow;
        self
    }

    pub fn show_suppress_checkbox(mut self, show: bool) -> Self {
        self.show_suppress_checkbox = show;
        self
    }

    pub fn requires_explicit_ack(mut self, required: bool) -> Self {
        self.requires_explicit_ack = required;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_button(mut self, id: u32) -> Self {
        self.timeout_button_id = Some(id);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn tag(mut self, tag: CallerTag) -> Self {
        self.tag = Some(tag);
        self
    }

    pub fn build(self) -> Result<MessageBoxRequest> {
        if self.message.trim().is_empty() {
            return Err(NativeBoxError::InvalidRequest("message text must be provided".into()));
        }

        let buttons = self.buttons.unwrap_or_else(|| vec![ButtonSpec::ok()]);
        if buttons.is_empty() {
            return Err(NativeBoxError::InvalidRequest(
                "at least one button must be specified".into(),
            ));
        }

        let mut seen = std::collections::HashSet::with_capacity(buttons.len());
        for button in &buttons {
            if button.id == button_id::NONE {
                return Err(NativeBoxError::InvalidRequest(format!(
                    "button '{}' uses the reserved id 0",
                    button.label
                )));
            }
            if !seen.insert(button.id) {
                return Err(NativeBoxError::InvalidRequest(format!(
                    "duplicate button id {}",
                    button.id
                )));
            }
        }

        Ok(MessageBoxRequest {
            message: self.message,
            title: self.title,
            buttons,
            icon: self.icon,
            severity: self.severity,
            modality: self.modality,
            parent_window: self.parent_window,
            input: self.input,
            secondary: self.secondary,
            verification_text: self.verification_text,
            allow_cancel_via_escape: self.allow_cancel_via_escape,
            show_suppress_checkbox: self.show_suppress_checkbox,
            requires_explicit_ack: self.requires_explicit_ack,
            timeout: self.timeout,
            timeout_button_id: self.timeout_button_id,
            locale: self.locale,
            tag: self.tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_button_is_synthesised() {
        let request = MessageBoxRequest::message("Hello").unwrap();
        assert_eq!(request.buttons().len(), 1);
        let ok = &request.buttons()[0];
        assert_eq!(ok.id(), 1);
        assert_eq!(ok.label(), "OK");
        assert!(ok.is_default());
        assert_eq!(ok.kind(), ButtonKind::Primary);
    }

    #[test]
    fn blank_message_is_rejected() {
        assert!(matches!(
            MessageBoxRequest::message("   "),
            Err(NativeBoxError::InvalidRequest(_))
        ));
    }

    #[test]
    fn explicit_empty_button_list_is_rejected() {
        let result = MessageBoxRequest::builder("Hello").buttons(Vec::new()).build();
        assert!(matches!(result, Err(NativeBoxError::InvalidRequest(_))));
    }

    #[test]
    fn duplicate_and_reserved_ids_are_rejected() {
        let dup = MessageBoxRequest::builder("Hello")
            .button(ButtonSpec::new(3, "Yes").unwrap())
            .button(ButtonSpec::new(3, "Also yes").unwrap())
            .build();
        assert!(dup.is_err());

        let reserved = MessageBoxRequest::builder("Hello")
            .button(ButtonSpec::new(0, "Zero").unwrap())
            .build();
        assert!(reserved.is_err());
    }

    #[test]
    fn blank_button_label_is_rejected() {
        assert!(ButtonSpec::new(1, " ").is_err());
    }

    #[test]
    fn combo_requires_items() {
        assert!(InputSpec::new(InputMode::Combo, Vec::<String>::new()).is_err());
        assert!(InputSpec::combo(Vec::<&str>::new()).is_err());
    }

    #[test]
    fn combo_preserves_item_order() {
        let input = InputSpec::combo(["gamma", "alpha", "beta"]).unwrap();
        assert_eq!(input.combo_items(), ["gamma", "alpha", "beta"]);
    }

    #[test]
    fn non_combo_modes_drop_items() {
        let input = InputSpec::new(InputMode::Text, ["ignored"]).unwrap();
        assert!(input.combo_items().is_empty());
    }

    #[test]
    fn timeout_falls_back_to_default_button() {
        let request = MessageBoxRequest::builder("Closing soon")
            .button(ButtonSpec::new(2, "Close").unwrap().as_default())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        assert_eq!(request.timeout_millis(), 5000);
        assert_eq!(request.effective_timeout_button(), Some(2));
    }

    #[test]
    fn timeout_fallback_order() {
        let request = MessageBoxRequest::builder("Pick")
            .button(ButtonSpec::new(7, "First").unwrap())
            .button(ButtonSpec::new(8, "Cancel").unwrap().as_cancel())
            .timeout(Duration::from_millis(10))
            .build()
            .unwrap();
        assert_eq!(request.effective_timeout_button(), Some(8));

        let explicit = MessageBoxRequest::builder("Pick")
            .button(ButtonSpec::new(7, "First").unwrap().as_default())
            .timeout(Duration::from_millis(10))
            .timeout_button(9)
            .build()
            .unwrap();
        assert_eq!(explicit.effective_timeout_button(), Some(9));

        let none = MessageBoxRequest::message("No timeout").unwrap();
        assert_eq!(none.effective_timeout_button(), None);
    }

    #[test]
    fn huge_timeout_is_clamped() {
        let request = MessageBoxRequest::builder("Long")
            .timeout(Duration::from_secs(u64::MAX / 4))
            .build()
            .unwrap();
        assert_eq!(request.timeout_millis(), u32::MAX);
    }

    #[test]
    fn advanced_feature_detection() {
        assert!(!MessageBoxRequest::message("plain").unwrap().uses_advanced_features());
        let with_ack = MessageBoxRequest::builder("ack")
            .requires_explicit_ack(true)
            .build()
            .unwrap();
        assert!(with_ack.uses_advanced_features());
        let with_secondary = MessageBoxRequest::builder("more")
            .secondary(SecondaryContent::default())
            .build()
            .unwrap();
        assert!(with_secondary.uses_advanced_features());
    }

    #[test]
    fn tag_identity_is_preserved() {
        let tag = CallerTag::new(42_u64);
        let request = MessageBoxRequest::builder("tagged").tag(tag.clone()).build().unwrap();
        assert_eq!(request.tag(), Some(&tag));
        assert_eq!(request.tag().and_then(|t| t.downcast_ref::<u64>()), Some(&42));
    }
}
