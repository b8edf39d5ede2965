// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON messages exchanged with the script bridge.
//
// The request projection is explicit, field by field. Absent or blank
// optional strings are left out of the JSON rather than sent as null or "".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use nativebox_core::{
    ButtonSpec, InputMode, InputSpec, MessageBoxOutcome, MessageBoxRequest, MessageBoxResult,
    SecondaryContent, StatusCode,
};

fn present(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_owned)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserButton {
    pub id: u32,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: u32,
    pub is_default: bool,
    pub is_cancel: bool,
}

impl From<&ButtonSpec> for BrowserButton {
    fn from(button: &ButtonSpec) -> Self {
        Self {
            id: button.id(),
            label: button.label().to_owned(),
            description: present(button.description()),
            kind: button.kind() as u32,
            is_default: button.is_default(),
            is_cancel: button.is_cancel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserInput {
    pub mode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub combo_items: Vec<String>,
}

impl From<&InputSpec> for BrowserInput {
    fn from(input: &InputSpec) -> Self {
        Self {
            mode: input.mode() as u32,
            prompt: present(input.prompt()),
            placeholder: present(input.placeholder()),
            default_value: present(input.default_value()),
            combo_items: input.combo_items().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserSecondary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub informative_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_link: Option<String>,
}

impl From<&SecondaryContent> for BrowserSecondary {
    fn from(secondary: &SecondaryContent) -> Self {
        Self {
            informative_text: present(secondary.informative_text.as_deref()),
            expanded_text: present(secondary.expanded_text.as_deref()),
            footer_text: present(secondary.footer_text.as_deref()),
            help_link: present(secondary.help_link.as_deref()),
        }
    }
}

/// Request as the bridge's `showMessageBox` receives it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    pub buttons: Vec<BrowserButton>,
    pub icon: u32,
    pub severity: u32,
    pub modality: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_text: Option<String>,
    pub allow_escape: bool,
    pub show_suppress_checkbox: bool,
    pub requires_explicit_ack: bool,
    pub timeout_milliseconds: u32,
    /// 0 when the request has no timeout.
    pub timeout_button_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<BrowserInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary: Option<BrowserSecondary>,
}

impl From<&MessageBoxRequest> for BrowserMessage {
    fn from(request: &MessageBoxRequest) -> Self {
        Self {
            title: present(request.title()),
            message: request.text().to_owned(),
            buttons: request.buttons().iter().map(BrowserButton::from).collect(),
            icon: request.icon() as u32,
            severity: request.severity() as u32,
            modality: request.modality() as u32,
            verification_text: present(request.verification_text()),
            allow_escape: request.allow_cancel_via_escape(),
            show_suppress_checkbox: request.show_suppress_checkbox(),
            requires_explicit_ack: request.requires_explicit_ack(),
            timeout_milliseconds: request.timeout_millis(),
            timeout_button_id: request.effective_timeout_button().unwrap_or(0),
            locale: present(request.locale()),
            input: request
                .input()
                .filter(|input| input.mode() != InputMode::None)
                .map(BrowserInput::from),
            secondary: request.secondary().map(BrowserSecondary::from),
        }
    }
}

impl BrowserMessage {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Reply from the bridge.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrowserResponse {
    pub result_code: u32,
    pub button_id: u32,
    pub checkbox_checked: bool,
    pub was_timeout: bool,
    pub input_value: Option<String>,
}

impl BrowserResponse {
    pub fn into_result(self, request: &MessageBoxRequest) -> MessageBoxResult {
        MessageBoxResult::new(
            self.button_id,
            self.checkbox_checked,
            self.input_value,
            self.was_timeout,
            self.result_code,
            request.tag().cloned(),
        )
    }
}

/// Turn the bridge's reply into a result. Anything but a JSON object with the
/// expected field types becomes a PlatformFailure result.
pub fn parse_response(json: &str, request: &MessageBoxRequest) -> MessageBoxResult {
    let platform_failure = || {
        MessageBoxResult::failure(
            MessageBoxOutcome::PlatformFailure,
            StatusCode::PlatformFailure.raw(),
            request.tag().cloned(),
        )
    };
    if json.trim().is_empty() {
        tracing::warn!("script bridge returned an empty response");
        return platform_failure();
    }
    let value = match serde_json::from_str::<Value>(json) {
        Ok(value @ Value::Object(_)) => value,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "script bridge response is not an object");
            return platform_failure();
        }
        Err(e) => {
            tracing::warn!(error = %e, "script bridge returned a malformed response");
            return platform_failure();
        }
    };
    match BrowserResponse::deserialize(value) {
        Ok(response) => response.into_result(request),
        Err(e) => {
            tracing::warn!(error = %e, "script bridge response has unexpected fields");
            platform_failure()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nativebox_core::{CallerTag, Icon};
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn projection_uses_bridge_field_names() {
        let request = MessageBoxRequest::builder("Delete the file?")
            .title("Confirm")
            .icon(Icon::Warning)
            .button(ButtonSpec::new(3, "Delete").unwrap().as_default())
            .button(ButtonSpec::new(2, "Keep").unwrap().as_cancel())
            .input(InputSpec::combo(["a", "b"]).unwrap().with_prompt("Pick"))
            .secondary(SecondaryContent {
                informative_text: Some("Cannot be undone".into()),
                footer_text: Some("   ".into()),
                ..Default::default()
            })
            .timeout(Duration::from_millis(1500))
            .build()
            .unwrap();

        let value: Value = serde_json::from_str(&BrowserMessage::from(&request).to_json().unwrap()).unwrap();
        assert_eq!(value["title"], "Confirm");
        assert_eq!(value["message"], "Delete the file?");
        assert_eq!(value["icon"], 2);
        assert_eq!(value["allowEscape"], true);
        assert_eq!(value["timeoutMilliseconds"], 1500);
        assert_eq!(value["timeoutButtonId"], 3);
        assert_eq!(
            value["buttons"][1],
            json!({"id": 2, "label": "Keep", "kind": 0, "isDefault": false, "isCancel": true})
        );
        assert_eq!(value["input"], json!({"mode": 4, "prompt": "Pick", "comboItems": ["a", "b"]}));
        assert_eq!(value["secondary"], json!({"informativeText": "Cannot be undone"}));
        assert!(value.get("locale").is_none());
        assert!(value.get("verificationText").is_none());
    }

    #[test]
    fn no_input_and_no_timeout_still_send_timeout_button() {
        let request = MessageBoxRequest::builder("Saved")
            .input(InputSpec::new(InputMode::None, Vec::<String>::new()).unwrap())
            .build()
            .unwrap();
        let value: Value = serde_json::from_str(&BrowserMessage::from(&request).to_json().unwrap()).unwrap();
        assert!(value.get("input").is_none());
        assert_eq!(value["timeoutMilliseconds"], 0);
        assert_eq!(value["timeoutButtonId"], 0);
    }

    #[test]
    fn response_maps_to_result_with_tag() {
        let tag = CallerTag::new(7_u32);
        let request = MessageBoxRequest::builder("x").tag(tag.clone()).build().unwrap();
        let result = parse_response(
            r#"{"resultCode":0,"buttonId":1,"checkboxChecked":true,"wasTimeout":false,"inputValue":"hi"}"#,
            &request,
        );
        assert_eq!(result.outcome(), MessageBoxOutcome::Success);
        assert_eq!(result.button_id(), 1);
        assert!(result.checkbox_checked());
        assert_eq!(result.input_value(), Some("hi"));
        assert_eq!(result.tag(), Some(&tag));

        let cancelled = parse_response(r#"{"resultCode":5,"inputValue":null}"#, &request);
        assert_eq!(cancelled.outcome(), MessageBoxOutcome::Cancelled);
        assert_eq!(cancelled.input_value(), None);
    }

    #[test]
    fn bad_responses_are_platform_failures() {
        let request = MessageBoxRequest::message("x").unwrap();
        for body in [
            "",
            "   ",
            "null",
            "{not json",
            "[1,2]",
            "[0,3,true]",
            "\"ok\"",
            "7",
            r#"{"resultCode":"zero"}"#,
        ] {
            let result = parse_response(body, &request);
            assert_eq!(result.outcome(), MessageBoxOutcome::PlatformFailure, "{body:?}");
            assert_eq!(result.native_result_code(), StatusCode::PlatformFailure.raw());
        }
    }
}
