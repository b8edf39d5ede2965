// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Allocator pair shared with the backend.
//
// The backend frees with `deallocate(user_data, ptr)` and never passes a size,
// so the system allocator stores the layout in a header just before the
// pointer it hands out.

use std::alloc::{Layout, alloc, dealloc};
use std::ffi::{c_char, c_void};
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicUsize, Ordering};

use nativebox_core::{NativeBoxError, Result, StatusCode};

use crate::schema::NmbAllocator;

/// Minimum alignment of every block; also the header size.
const HEADER_ALIGN: usize = 2 * size_of::<usize>();

unsafe extern "C" fn system_allocate(
    _user_data: *mut c_void,
    size: usize,
    alignment: usize,
) -> *mut c_void {
    let align = alignment.max(HEADER_ALIGN);
    if !align.is_power_of_two() {
        return ptr::null_mut();
    }
    let Some(total) = size.max(1).checked_add(align) else {
        return ptr::null_mut();
    };
    let Ok(layout) = Layout::from_size_align(total, align) else {
        return ptr::null_mut();
    };
    // SAFETY: layout has non-zero size.
    let base = unsafe { alloc(layout) };
    if base.is_null() {
        return ptr::null_mut();
    }
    // SAFETY: `align >= HEADER_ALIGN`, so the header fits between `base` and
    // the payload and is suitably aligned for two usizes.
    unsafe {
        let payload = base.add(align);
        let header = payload.sub(HEADER_ALIGN).cast::<[usize; 2]>();
        header.write([total, align]);
        payload.cast()
    }
}

unsafe extern "C" fn system_deallocate(_user_data: *mut c_void, ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: `ptr` came from `system_allocate`, which wrote the header.
    unsafe {
        let payload = ptr.cast::<u8>();
        let [total, align] = payload.sub(HEADER_ALIGN).cast::<[usize; 2]>().read();
        let base = payload.sub(align);
        dealloc(base, Layout::from_size_align_unchecked(total, align));
    }
}

/// Safe handle over an [`NmbAllocator`] record.
#[derive(Debug, Clone, Copy)]
pub struct Allocator {
    raw: NmbAllocator,
}

impl Allocator {
    /// Process allocator used when nothing else is configured.
    pub fn system() -> Self {
        Self {
            raw: NmbAllocator {
                allocate: Some(system_allocate),
                deallocate: Some(system_deallocate),
                user_data: ptr::null_mut(),
            },
        }
    }

    /// Wrap a record received over the boundary. Both callbacks must be set.
    ///
    /// # Safety
    /// The callbacks must honour the allocator contract and `user_data` must
    /// stay valid for as long as the returned handle is used.
    pub unsafe fn from_raw(raw: NmbAllocator) -> Option<Self> {
        (raw.allocate.is_some() && raw.deallocate.is_some()).then_some(Self { raw })
    }

    pub fn raw(&self) -> NmbAllocator {
        self.raw
    }

    /// Allocate `size` bytes. Zero-size requests get one byte.
    pub fn allocate(&self, size: usize, alignment: usize) -> Option<NonNull<u8>> {
        let allocate = self.raw.allocate?;
        // SAFETY: the record was validated on construction.
        let ptr = unsafe { allocate(self.raw.user_data, size.max(1), alignment) };
        NonNull::new(ptr.cast())
    }

    /// Release a block produced by this allocator.
    ///
    /// # Safety
    /// `ptr` must come from this allocator and must not be released twice.
    pub unsafe fn deallocate(&self, ptr: NonNull<u8>) {
        if let Some(deallocate) = self.raw.deallocate {
            unsafe { deallocate(self.raw.user_data, ptr.as_ptr().cast()) };
        }
    }

    /// Copy `value` into a NUL-terminated buffer owned by this allocator.
    pub fn copy_str(&self, value: &str) -> Result<NonNull<c_char>> {
        if value.as_bytes().contains(&0) {
            return Err(NativeBoxError::status(
                StatusCode::InvalidArgument,
                "string contains an interior NUL byte",
            ));
        }
        let len = value.len();
        let buffer = self.allocate(len + 1, 1).ok_or_else(|| {
            NativeBoxError::status(StatusCode::OutOfMemory, "string allocation failed")
        })?;
        // SAFETY: `buffer` holds `len + 1` bytes.
        unsafe {
            ptr::copy_nonoverlapping(value.as_ptr(), buffer.as_ptr(), len);
            buffer.as_ptr().add(len).write(0);
        }
        Ok(buffer.cast())
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::system()
    }
}

/// Read a NUL-terminated UTF-8 string. Invalid sequences are replaced.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer.
pub unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { std::ffi::CStr::from_ptr(ptr) };
    Some(text.to_string_lossy().into_owned())
}

#[derive(Default)]
struct TrackingState {
    live: AtomicUsize,
    attempts: AtomicUsize,
    releases: AtomicUsize,
    fail_on: AtomicUsize,
}

unsafe extern "C" fn tracking_allocate(
    user_data: *mut c_void,
    size: usize,
    alignment: usize,
) -> *mut c_void {
    // SAFETY: `user_data` points at the boxed state of a live TrackingAllocator.
    let state = unsafe { &*user_data.cast::<TrackingState>() };
    let attempt = state.attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt == state.fail_on.load(Ordering::SeqCst) {
        return ptr::null_mut();
    }
    let ptr = unsafe { system_allocate(ptr::null_mut(), size, alignment) };
    if !ptr.is_null() {
        state.live.fetch_add(1, Ordering::SeqCst);
    }
    ptr
}

unsafe extern "C" fn tracking_deallocate(user_data: *mut c_void, ptr: *mut c_void) {
    if ptr.is_null() {
        return;
    }
    let state = unsafe { &*user_data.cast::<TrackingState>() };
    state.live.fetch_sub(1, Ordering::SeqCst);
    state.releases.fetch_add(1, Ordering::SeqCst);
    unsafe { system_deallocate(ptr::null_mut(), ptr) };
}

/// Allocator that counts live blocks and can fail a chosen allocation.
///
/// Used to check that scopes and result parsing release everything exactly
/// once. The handles returned by [`allocator`](Self::allocator) must not be
/// used after this value is dropped.
pub struct TrackingAllocator {
    state: Box<TrackingState>,
}

impl TrackingAllocator {
    pub fn new() -> Self {
        Self {
            state: Box::default(),
        }
    }

    /// Fail the `n`th allocation attempt (1-based).
    pub fn failing_on(n: usize) -> Self {
        let tracker = Self::new();
        tracker.state.fail_on.store(n, Ordering::SeqCst);
        tracker
    }

    pub fn allocator(&self) -> Allocator {
        let user_data = ptr::from_ref::<TrackingState>(&self.state).cast_mut().cast();
        Allocator {
            raw: NmbAllocator {
                allocate: Some(tracking_allocate),
                deallocate: Some(tracking_deallocate),
                user_data,
            },
        }
    }

    pub fn live(&self) -> usize {
        self.state.live.load(Ordering::SeqCst)
    }

    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.state.releases.load(Ordering::SeqCst)
    }
}

impl Default for TrackingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_allocator_honours_alignment() {
        let allocator = Allocator::system();
        for align in [1, 8, 16, 64, 256] {
            let block = allocator.allocate(24, align).unwrap();
            assert_eq!(block.as_ptr() as usize % align, 0);
            unsafe { allocator.deallocate(block) };
        }
    }

    #[test]
    fn zero_size_allocates() {
        let allocator = Allocator::system();
        let block = allocator.allocate(0, 1).unwrap();
        unsafe { allocator.deallocate(block) };
    }

    #[test]
    fn rejects_non_power_of_two_alignment() {
        assert!(Allocator::system().allocate(8, 24).is_none());
    }

    #[test]
    fn copy_str_round_trips() {
        let tracker = TrackingAllocator::new();
        let allocator = tracker.allocator();
        let copy = allocator.copy_str("grüße").unwrap();
        assert_eq!(unsafe { read_c_str(copy.as_ptr()) }.as_deref(), Some("grüße"));
        assert_eq!(tracker.live(), 1);
        unsafe { allocator.deallocate(copy.cast()) };
        assert_eq!(tracker.live(), 0);
    }

    #[test]
    fn copy_str_rejects_interior_nul() {
        assert!(Allocator::system().copy_str("a\0b").is_err());
    }

    #[test]
    fn tracking_allocator_fails_requested_attempt() {
        let tracker = TrackingAllocator::failing_on(2);
        let allocator = tracker.allocator();
        let first = allocator.allocate(4, 1).unwrap();
        assert!(allocator.allocate(4, 1).is_none());
        let third = allocator.allocate(4, 1).unwrap();
        assert_eq!(tracker.attempts(), 3);
        assert_eq!(tracker.live(), 2);
        unsafe {
            allocator.deallocate(first);
            allocator.deallocate(third);
        }
        assert_eq!(tracker.live(), 0);
        assert_eq!(tracker.releases(), 2);
    }

    #[test]
    fn from_raw_requires_both_callbacks() {
        let mut raw = Allocator::system().raw();
        raw.deallocate = None;
        assert!(unsafe { Allocator::from_raw(raw) }.is_none());
    }
}
