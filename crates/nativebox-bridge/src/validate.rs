// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-platform capability tables and the two pre-dispatch validation passes.
//
// The tables describe what each native backend can render today. They are
// data, not policy: when a backend gains a feature, change its row.

use nativebox_core::{HostOptions, InputMode, MessageBoxRequest, NativeBoxError, Result, StatusCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Android,
    Browser,
}

/// What one backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    pub platform: Platform,
    pub supported_input_modes: &'static [InputMode],
    pub supports_locale: bool,
    /// Advanced dialogs need a single-threaded apartment on the calling thread.
    pub apartment_gated: bool,
    /// Dialogs without a parent attach to the foreground activity.
    pub parent_defaults_to_activity: bool,
}

const ALL_INPUT_MODES: &[InputMode] = &[
    InputMode::None,
    InputMode::Checkbox,
    InputMode::Text,
    InputMode::Password,
    InputMode::Combo,
];

impl PlatformCapabilities {
    pub const WINDOWS: Self = Self {
        platform: Platform::Windows,
        supported_input_modes: &[InputMode::None, InputMode::Checkbox],
        supports_locale: false,
        apartment_gated: true,
        parent_defaults_to_activity: false,
    };

    pub const MACOS: Self = Self {
        platform: Platform::MacOs,
        supported_input_modes: ALL_INPUT_MODES,
        supports_locale: false,
        apartment_gated: false,
        parent_defaults_to_activity: false,
    };

    pub const LINUX: Self = Self {
        platform: Platform::Linux,
        supported_input_modes: ALL_INPUT_MODES,
        supports_locale: false,
        apartment_gated: false,
        parent_defaults_to_activity: false,
    };

    pub const ANDROID: Self = Self {
        platform: Platform::Android,
        supported_input_modes: ALL_INPUT_MODES,
        supports_locale: false,
        apartment_gated: false,
        parent_defaults_to_activity: true,
    };

    pub const BROWSER: Self = Self {
        platform: Platform::Browser,
        supported_input_modes: ALL_INPUT_MODES,
        supports_locale: false,
        apartment_gated: false,
        parent_defaults_to_activity: false,
    };

    /// Row for the compilation target.
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::BROWSER
        } else if cfg!(windows) {
            Self::WINDOWS
        } else if cfg!(target_os = "android") {
            Self::ANDROID
        } else if cfg!(target_vendor = "apple") {
            Self::MACOS
        } else {
            Self::LINUX
        }
    }

    pub fn supports_input(&self, mode: InputMode) -> bool {
        self.supported_input_modes.contains(&mode)
    }
}

/// COM apartment of the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApartmentState {
    SingleThreaded,
    MultiThreaded,
    /// Not a COM platform.
    Unknown,
}

/// Probe the calling thread's apartment.
#[cfg(windows)]
pub fn current_apartment() -> ApartmentState {
    use windows_sys::Win32::System::Com::{
        APTTYPE, APTTYPE_MAINSTA, APTTYPE_STA, APTTYPEQUALIFIER, CoGetApartmentType,
    };

    let mut kind: APTTYPE = 0;
    let mut qualifier: APTTYPEQUALIFIER = 0;
    // SAFETY: both out-pointers reference live locals.
    let hr = unsafe { CoGetApartmentType(&mut kind, &mut qualifier) };
    if hr == 0 && (kind == APTTYPE_STA || kind == APTTYPE_MAINSTA) {
        ApartmentState::SingleThreaded
    } else {
        // Threads that never initialised COM default to the MTA.
        ApartmentState::MultiThreaded
    }
}

#[cfg(not(windows))]
pub fn current_apartment() -> ApartmentState {
    ApartmentState::Unknown
}

/// Thread-affinity pass: advanced dialogs on apartment-gated platforms need
/// an STA caller unless the host options switch the check off.
pub fn validate_thread(
    request: &MessageBoxRequest,
    options: &HostOptions,
    capabilities: &PlatformCapabilities,
    apartment: ApartmentState,
) -> Result<()> {
    if !capabilities.apartment_gated
        || !options.require_sta_thread_for_windows
        || !request.uses_advanced_features()
    {
        return Ok(());
    }
    if apartment != ApartmentState::SingleThreaded {
        return Err(NativeBoxError::status(
            StatusCode::InvalidArgument,
            "advanced dialogs require an STA thread; disable require_sta_thread_for_windows \
             in the host options to skip this check",
        ));
    }
    Ok(())
}

/// Capability pass: reject options the backend cannot render.
pub fn validate_capabilities(
    request: &MessageBoxRequest,
    capabilities: &PlatformCapabilities,
    apartment: ApartmentState,
) -> Result<()> {
    if !capabilities.supports_locale && request.locale().is_some_and(|l| !l.trim().is_empty()) {
        return Err(NativeBoxError::status(
            StatusCode::NotSupported,
            "locale selection is not supported by the native backends",
        ));
    }

    let mode = request.input_mode();
    if !capabilities.supports_input(mode) {
        return Err(NativeBoxError::status(
            StatusCode::NotSupported,
            format!("{mode:?} input is not supported on {:?}", capabilities.platform),
        ));
    }

    if capabilities.apartment_gated
        && request.requires_explicit_ack()
        && !request.allow_cancel_via_escape()
        && apartment != ApartmentState::SingleThreaded
    {
        return Err(NativeBoxError::status(
            StatusCode::InvalidArgument,
            "explicit acknowledgement dialogs require an STA thread",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nativebox_core::{ButtonSpec, InputSpec, MessageBoxOutcome};

    use super::*;

    fn with_timeout() -> MessageBoxRequest {
        MessageBoxRequest::builder("soon")
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap()
    }

    #[test]
    fn windows_requires_sta_for_advanced_dialogs() {
        let options = HostOptions::default();
        let caps = PlatformCapabilities::WINDOWS;
        let err = validate_thread(&with_timeout(), &options, &caps, ApartmentState::MultiThreaded)
            .unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::InvalidArgument);
        assert!(
            validate_thread(&with_timeout(), &options, &caps, ApartmentState::SingleThreaded)
                .is_ok()
        );
    }

    #[test]
    fn sta_check_can_be_disabled() {
        let options = HostOptions {
            require_sta_thread_for_windows: false,
            ..Default::default()
        };
        assert!(
            validate_thread(
                &with_timeout(),
                &options,
                &PlatformCapabilities::WINDOWS,
                ApartmentState::MultiThreaded
            )
            .is_ok()
        );
    }

    #[test]
    fn plain_dialogs_skip_the_sta_check() {
        let plain = MessageBoxRequest::message("plain").unwrap();
        assert!(
            validate_thread(
                &plain,
                &HostOptions::default(),
                &PlatformCapabilities::WINDOWS,
                ApartmentState::MultiThreaded
            )
            .is_ok()
        );
    }

    #[test]
    fn four_buttons_count_as_advanced() {
        let request = MessageBoxRequest::builder("many")
            .buttons((1..=4).map(|id| ButtonSpec::new(id, format!("B{id}")).unwrap()))
            .build()
            .unwrap();
        assert!(
            validate_thread(
                &request,
                &HostOptions::default(),
                &PlatformCapabilities::WINDOWS,
                ApartmentState::MultiThreaded
            )
            .is_err()
        );
    }

    #[test]
    fn non_gated_platforms_never_check_threads() {
        for caps in [PlatformCapabilities::LINUX, PlatformCapabilities::MACOS] {
            assert!(
                validate_thread(
                    &with_timeout(),
                    &HostOptions::default(),
                    &caps,
                    ApartmentState::Unknown
                )
                .is_ok()
            );
        }
    }

    #[test]
    fn locale_is_never_supported() {
        let request = MessageBoxRequest::builder("hola").locale("es-ES").build().unwrap();
        for caps in [
            PlatformCapabilities::WINDOWS,
            PlatformCapabilities::MACOS,
            PlatformCapabilities::LINUX,
            PlatformCapabilities::ANDROID,
        ] {
            let err = validate_capabilities(&request, &caps, ApartmentState::SingleThreaded)
                .unwrap_err();
            assert_eq!(err.outcome(), MessageBoxOutcome::NotSupported);
        }
        let blank = MessageBoxRequest::builder("x").locale("  ").build().unwrap();
        assert!(
            validate_capabilities(&blank, &PlatformCapabilities::LINUX, ApartmentState::Unknown)
                .is_ok()
        );
    }

    #[test]
    fn windows_only_supports_checkbox_input() {
        let caps = PlatformCapabilities::WINDOWS;
        let sta = ApartmentState::SingleThreaded;
        let checkbox = MessageBoxRequest::builder("c").input(InputSpec::checkbox()).build().unwrap();
        assert!(validate_capabilities(&checkbox, &caps, sta).is_ok());

        for input in [
            InputSpec::text(),
            InputSpec::password(),
            InputSpec::combo(["a"]).unwrap(),
        ] {
            let request = MessageBoxRequest::builder("i").input(input).build().unwrap();
            let err = validate_capabilities(&request, &caps, sta).unwrap_err();
            assert_eq!(err.status_code(), 3);
        }

        let text = MessageBoxRequest::builder("t").input(InputSpec::text()).build().unwrap();
        assert!(validate_capabilities(&text, &PlatformCapabilities::LINUX, sta).is_ok());
    }

    #[test]
    fn explicit_ack_without_escape_needs_sta_on_windows() {
        let request = MessageBoxRequest::builder("ack")
            .requires_explicit_ack(true)
            .allow_cancel_via_escape(false)
            .build()
            .unwrap();
        let caps = PlatformCapabilities::WINDOWS;
        let err = validate_capabilities(&request, &caps, ApartmentState::MultiThreaded).unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::InvalidArgument);
        assert!(validate_capabilities(&request, &caps, ApartmentState::SingleThreaded).is_ok());
    }

    #[test]
    fn current_row_matches_target() {
        let caps = PlatformCapabilities::current();
        #[cfg(target_os = "linux")]
        assert_eq!(caps.platform, Platform::Linux);
        #[cfg(windows)]
        assert_eq!(caps.platform, Platform::Windows);
        assert!(caps.supports_input(InputMode::None));
    }
}
