// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Activity references as JNI global references.
//
// Each reference handed to the host is a fresh global ref, released with
// DeleteGlobalRef when the host drops it after the native call returns.

use std::sync::{Arc, OnceLock};

use jni::JavaVM;
use jni::objects::{GlobalRef, JObject};
use jni::sys::jobject;

use nativebox_core::ActivityReference;

use super::ForegroundContext;

/// Obtain the process VM set by the NDK glue.
fn java_vm() -> Option<JavaVM> {
    let ctx = ndk_context::android_context();
    // SAFETY: `ctx.vm()` is the `JavaVM*` installed by the NDK glue; it lives
    // for the whole process.
    unsafe { JavaVM::from_raw(ctx.vm().cast()) }.ok()
}

/// The hosting activity, held through a global reference.
pub struct JniActivity {
    activity: GlobalRef,
}

impl JniActivity {
    pub fn new(activity: GlobalRef) -> Self {
        Self { activity }
    }

    fn from_ndk_context() -> Option<Self> {
        let ctx = ndk_context::android_context();
        let ptr = ctx.context();
        if ptr.is_null() {
            tracing::warn!("Android context is null; native activity not initialised");
            return None;
        }
        let vm = java_vm()?;
        let env = vm.attach_current_thread().ok()?;
        // SAFETY: the NDK context pointer is a valid jobject for the activity.
        let object = unsafe { JObject::from_raw(ptr.cast()) };
        env.new_global_ref(&object).ok().map(Self::new)
    }
}

impl ForegroundContext for JniActivity {
    fn activity_reference(&self) -> ActivityReference {
        let Some(vm) = java_vm() else {
            return ActivityReference::none();
        };
        let Ok(env) = vm.attach_current_thread() else {
            return ActivityReference::none();
        };
        let raw = env.get_raw();
        // SAFETY: `raw` is the attached thread's env; the source object is a
        // live global reference.
        let handle = unsafe {
            match (**raw).NewGlobalRef {
                Some(new_global_ref) => new_global_ref(raw, self.activity.as_obj().as_raw()),
                None => std::ptr::null_mut(),
            }
        };
        if handle.is_null() {
            tracing::warn!("NewGlobalRef failed for the foreground activity");
            return ActivityReference::none();
        }
        ActivityReference::owned(handle as usize, release_global_ref)
    }
}

fn release_global_ref(handle: usize) {
    let Some(vm) = java_vm() else {
        return;
    };
    let Ok(env) = vm.attach_current_thread() else {
        return;
    };
    let raw = env.get_raw();
    // SAFETY: `handle` came from NewGlobalRef above and is released once.
    unsafe {
        if let Some(delete_global_ref) = (**raw).DeleteGlobalRef {
            delete_global_ref(raw, handle as jobject);
        }
    }
}

static NDK_ACTIVITY: OnceLock<Option<Arc<JniActivity>>> = OnceLock::new();

/// The activity that hosts the native code, kept for the life of the
/// process.
pub fn ndk_activity() -> Option<Arc<JniActivity>> {
    NDK_ACTIVITY
        .get_or_init(|| JniActivity::from_ndk_context().map(Arc::new))
        .clone()
}
