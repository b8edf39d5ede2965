// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Foreground activity tracking.
//
// Lifecycle notifications update a single slot holding a weak reference to
// the resumed context. The host asks the tracker for a native reference on
// every Show; the tracker never keeps a context alive on its own.

#[cfg(target_os = "android")]
mod jni_activity;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use nativebox_core::ActivityReference;

use crate::traits::RuntimeHostSupport;

#[cfg(target_os = "android")]
pub use jni_activity::{JniActivity, ndk_activity};

/// A top-level UI context that can hand out native references to itself.
pub trait ForegroundContext: Send + Sync + 'static {
    fn activity_reference(&self) -> ActivityReference;
}

pub struct ActivityTracker<T> {
    current: Mutex<Weak<T>>,
    installed: AtomicBool,
}

impl<T: ForegroundContext> ActivityTracker<T> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: Mutex::new(Weak::new()),
            installed: AtomicBool::new(false),
        })
    }

    pub fn on_resume(&self, context: &Arc<T>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(context);
    }

    /// Clears the slot only if `context` is the one currently tracked.
    pub fn on_pause(&self, context: &Arc<T>) {
        let mut slot = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if std::ptr::eq(slot.as_ptr(), Arc::as_ptr(context)) {
            *slot = Weak::new();
        }
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).upgrade()
    }

    /// Reference to the resumed context, or a none reference.
    pub fn reference(&self) -> ActivityReference {
        self.current()
            .map_or_else(ActivityReference::none, |context| context.activity_reference())
    }

    /// Point the host's activity provider at this tracker. Only the first
    /// call has any effect.
    pub fn install(self: &Arc<Self>, host: &dyn RuntimeHostSupport) {
        if self.installed.swap(true, Ordering::SeqCst) {
            return;
        }
        let tracker = Arc::clone(self);
        host.configure(&mut |options| {
            let tracker = Arc::clone(&tracker);
            options.android.activity_reference_provider = Some(Arc::new(move || tracker.reference()));
        });
        tracing::debug!("activity tracker installed");
    }
}
