// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request-scoped memory.
//
// Everything the request blocks point at is allocated here and released in
// one go when the scope drops, on every exit path. A scope belongs to a single
// Show call and is never shared between threads.

use std::cell::RefCell;
use std::ffi::c_char;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

use nativebox_core::{NativeBoxError, Result, StatusCode};

use crate::alloc::Allocator;

pub struct MemoryScope {
    allocator: Allocator,
    allocations: RefCell<Vec<NonNull<u8>>>,
}

impl MemoryScope {
    /// Scope backed by the process allocator.
    pub fn new() -> Self {
        Self::with_allocator(Allocator::system())
    }

    pub fn with_allocator(allocator: Allocator) -> Self {
        Self {
            allocator,
            allocations: RefCell::new(Vec::new()),
        }
    }

    pub fn allocator(&self) -> Allocator {
        self.allocator
    }

    /// Number of blocks the scope currently owns.
    pub fn live_allocations(&self) -> usize {
        self.allocations.borrow().len()
    }

    /// Copy a string as NUL-terminated UTF-8. `None` and `""` give null.
    pub fn alloc_utf8(&self, value: Option<&str>) -> Result<*const c_char> {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return Ok(ptr::null());
        };
        if value.as_bytes().contains(&0) {
            return Err(NativeBoxError::status(
                StatusCode::InvalidArgument,
                "string contains an interior NUL byte",
            ));
        }
        let bytes = value.as_bytes();
        let block = self.raw_alloc(bytes.len() + 1, 1)?;
        // SAFETY: `block` holds `len + 1` bytes and does not overlap `bytes`.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), block.as_ptr(), bytes.len());
            block.as_ptr().add(bytes.len()).write(0);
        }
        Ok(block.as_ptr().cast_const().cast())
    }

    /// Copy a single fixed-layout value.
    pub fn alloc_value<T: Copy>(&self, value: T) -> Result<*const T> {
        let block = self.raw_alloc(size_of::<T>(), align_of::<T>())?.cast::<T>();
        // SAFETY: freshly allocated, sized and aligned for `T`.
        unsafe { block.as_ptr().write(value) };
        Ok(block.as_ptr().cast_const())
    }

    /// Copy a slice into a contiguous array. Empty slices give null.
    pub fn alloc_array<T: Copy>(&self, items: &[T]) -> Result<*const T> {
        if items.is_empty() {
            return Ok(ptr::null());
        }
        let bytes = size_of::<T>().checked_mul(items.len()).ok_or_else(|| {
            NativeBoxError::status(StatusCode::OutOfMemory, "array size overflows")
        })?;
        let block = self.raw_alloc(bytes, align_of::<T>())?.cast::<T>();
        // SAFETY: `block` has room for `items.len()` values of `T`.
        unsafe { ptr::copy_nonoverlapping(items.as_ptr(), block.as_ptr(), items.len()) };
        Ok(block.as_ptr().cast_const())
    }

    /// Null-terminated array of pointers, as used for combo items.
    pub fn alloc_pointer_array<T>(&self, pointers: &[*const T]) -> Result<*const *const T> {
        let mut terminated = Vec::with_capacity(pointers.len() + 1);
        terminated.extend_from_slice(pointers);
        terminated.push(ptr::null());
        self.alloc_array(&terminated)
    }

    fn raw_alloc(&self, size: usize, alignment: usize) -> Result<NonNull<u8>> {
        let block = self.allocator.allocate(size, alignment).ok_or_else(|| {
            NativeBoxError::status(
                StatusCode::OutOfMemory,
                format!("failed to allocate {size} bytes for the request"),
            )
        })?;
        self.allocations.borrow_mut().push(block);
        Ok(block)
    }
}

impl Default for MemoryScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MemoryScope {
    fn drop(&mut self) {
        for block in self.allocations.get_mut().drain(..).rev() {
            // SAFETY: each block came from `self.allocator` and is drained once.
            unsafe { self.allocator.deallocate(block) };
        }
    }
}
