// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Model <-> ABI block conversion. No I/O and no backend calls happen here.

use std::marker::PhantomData;
use std::ops::Deref;
use std::ptr::{self, NonNull};

use nativebox_core::{
    ButtonSpec, InputMode, InputSpec, MessageBoxRequest, MessageBoxResult, Result,
    SecondaryContent, WindowHandle,
};

use crate::alloc::{Allocator, read_c_str};
use crate::schema::{
    ABI_VERSION, NmbButtonOption, NmbInputOption, NmbMessageBoxOptions,
    NmbMessageBoxResult, NmbSecondaryContentOption, from_nmb_bool, nmb_bool, struct_size,
};
use crate::scope::MemoryScope;

/// A request block whose pointers borrow from a [`MemoryScope`].
///
/// The borrow keeps the block from outliving the memory it points into.
#[derive(Debug)]
pub struct RequestBlock<'scope> {
    options: NmbMessageBoxOptions,
    _scope: PhantomData<&'scope MemoryScope>,
}

impl RequestBlock<'_> {
    pub fn as_ptr(&self) -> *const NmbMessageBoxOptions {
        &self.options
    }
}

impl Deref for RequestBlock<'_> {
    type Target = NmbMessageBoxOptions;

    fn deref(&self) -> &Self::Target {
        &self.options
    }
}

/// Build the ABI request for `request`, allocating every nested block in
/// `scope`. `parent_override` replaces the request's parent window when the
/// host supplies one (the Android foreground activity).
pub fn build_request<'s>(
    request: &MessageBoxRequest,
    scope: &'s MemoryScope,
    parent_override: Option<WindowHandle>,
) -> Result<RequestBlock<'s>> {
    let default_buttons;
    let buttons = if request.buttons().is_empty() {
        default_buttons = [ButtonSpec::ok()];
        &default_buttons[..]
    } else {
        request.buttons()
    };

    let button_blocks = buttons
        .iter()
        .map(|button| build_button(button, scope))
        .collect::<Result<Vec<_>>>()?;
    let buttons_ptr = scope.alloc_array(&button_blocks)?;

    let input = match request.input() {
        Some(input) if input.mode() != InputMode::None => {
            scope.alloc_value(build_input(input, scope)?)?
        }
        _ => ptr::null(),
    };

    let secondary = match request.secondary() {
        Some(secondary) => scope.alloc_value(build_secondary(secondary, scope)?)?,
        None => ptr::null(),
    };

    let allocator = scope.alloc_value(scope.allocator().raw())?;
    let parent = parent_override
        .or(request.parent_window())
        .map_or(ptr::null(), |h| h.as_raw() as *const std::ffi::c_void);

    let options = NmbMessageBoxOptions {
        struct_size: struct_size::<NmbMessageBoxOptions>(),
        abi_version: ABI_VERSION,
        title_utf8: scope.alloc_utf8(request.title())?,
        message_utf8: scope.alloc_utf8(Some(request.text()))?,
        buttons: buttons_ptr,
        button_count: button_blocks.len(),
        icon: request.icon() as u32,
        severity: request.severity() as u32,
        modality: request.modality() as u32,
        parent_window: parent,
        input,
        secondary,
        verification_text_utf8: scope.alloc_utf8(request.verification_text())?,
        allow_cancel_via_escape: nmb_bool(request.allow_cancel_via_escape()),
        show_suppress_checkbox: nmb_bool(request.show_suppress_checkbox()),
        requires_explicit_ack: nmb_bool(request.requires_explicit_ack()),
        timeout_milliseconds: request.timeout_millis(),
        timeout_button_id: request.effective_timeout_button().unwrap_or(0),
        locale_utf8: scope.alloc_utf8(request.locale())?,
        allocator,
        user_context: ptr::null_mut(),
    };

    tracing::trace!(
        buttons = options.button_count,
        allocations = scope.live_allocations(),
        "request block built"
    );

    Ok(RequestBlock {
        options,
        _scope: PhantomData,
    })
}

fn build_button(button: &ButtonSpec, scope: &MemoryScope) -> Result<NmbButtonOption> {
    Ok(NmbButtonOption {
        struct_size: struct_size::<NmbButtonOption>(),
        id: button.id(),
        label_utf8: scope.alloc_utf8(Some(button.label()))?,
        description_utf8: scope.alloc_utf8(button.description())?,
        kind: button.kind() as u32,
        is_default: nmb_bool(button.is_default()),
        is_cancel: nmb_bool(button.is_cancel()),
    })
}

fn build_input(input: &InputSpec, scope: &MemoryScope) -> Result<NmbInputOption> {
    let combo_items = if input.mode() == InputMode::Combo {
        let items = input
            .combo_items()
            .iter()
            .map(|item| scope.alloc_utf8(Some(item)))
            .collect::<Result<Vec<_>>>()?;
        scope.alloc_pointer_array(&items)?
    } else {
        ptr::null()
    };

    Ok(NmbInputOption {
        struct_size: struct_size::<NmbInputOption>(),
        mode: input.mode() as u32,
        prompt_utf8: scope.alloc_utf8(input.prompt())?,
        placeholder_utf8: scope.alloc_utf8(input.placeholder())?,
        default_value_utf8: scope.alloc_utf8(input.default_value())?,
        combo_items_utf8: combo_items,
    })
}

fn build_secondary(
    secondary: &SecondaryContent,
    scope: &MemoryScope,
) -> Result<NmbSecondaryContentOption> {
    Ok(NmbSecondaryContentOption {
        struct_size: struct_size::<NmbSecondaryContentOption>(),
        informative_text_utf8: scope.alloc_utf8(secondary.informative_text.as_deref())?,
        expanded_text_utf8: scope.alloc_utf8(secondary.expanded_text.as_deref())?,
        footer_text_utf8: scope.alloc_utf8(secondary.footer_text.as_deref())?,
        help_link_utf8: scope.alloc_utf8(secondary.help_link.as_deref())?,
    })
}

/// Fresh result block for the backend to fill.
pub fn new_result_block() -> NmbMessageBoxResult {
    NmbMessageBoxResult::new()
}

/// Convert a filled result block into the caller's result.
///
/// The input text lives outside the request scope: it is copied, released
/// through `allocator` and the field is nulled, so parsing the same block
/// twice never frees it twice.
pub fn parse_result(
    block: &mut NmbMessageBoxResult,
    request: &MessageBoxRequest,
    allocator: &Allocator,
) -> MessageBoxResult {
    let input_value = NonNull::new(block.input_value_utf8.cast_mut()).map(|raw| {
        // SAFETY: the backend hands back a NUL-terminated buffer from `allocator`.
        let text = unsafe { read_c_str(raw.as_ptr()) }.unwrap_or_default();
        unsafe { allocator.deallocate(raw.cast()) };
        text
    });
    block.input_value_utf8 = ptr::null();

    MessageBoxResult::new(
        block.button,
        from_nmb_bool(block.checkbox_checked),
        input_value,
        from_nmb_bool(block.was_timeout),
        block.result_code,
        request.tag().cloned(),
    )
}
