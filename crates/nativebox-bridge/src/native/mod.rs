// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host backed by the `nativemessagebox` shared library.
//
// State lives behind one mutex and is never held across a backend call.
// Initialization is serialized by a second lock so the first caller does the
// work and later callers see the finished state.

pub mod backend;
pub mod loader;
pub mod log;

use std::ffi::CString;
use std::path::PathBuf;
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use nativebox_abi::schema::{
    ABI_VERSION, NmbAllocator, NmbInitializeOptions, nmb_bool, result_code,
};
use nativebox_abi::{Allocator, MemoryScope, build_request, new_result_block, parse_result};
use nativebox_core::{
    ActivityReference, HostOptions, MessageBoxRequest, MessageBoxResult, NativeBoxError,
    RequestId, Result, StatusCode, WindowHandle,
};

pub use backend::NativeBackend;
pub use loader::{LibraryBackend, LoadError, ProbingPaths};

use self::log::{LogSink, forward_native_log};
use crate::traits::{LogHandler, MessageBoxHost, RuntimeHostSupport};
use crate::validate::{self, ApartmentState, PlatformCapabilities};

/// Produces a backend from the probing candidates.
pub type BackendFactory = Arc<
    dyn Fn(&[PathBuf]) -> std::result::Result<Arc<dyn NativeBackend>, LoadError> + Send + Sync,
>;

/// Probe for the calling thread's apartment.
pub type ApartmentProbe = fn() -> ApartmentState;

/// Allocator record handed to `nmb_initialize`; the backend may keep it.
struct InitAllocator(NmbAllocator);

// SAFETY: the system allocator record has null user data and thread-safe
// callbacks.
unsafe impl Send for InitAllocator {}
unsafe impl Sync for InitAllocator {}

#[derive(Default)]
struct HostState {
    options: HostOptions,
    probing: ProbingPaths,
    backend: Option<Arc<dyn NativeBackend>>,
    initialized: bool,
    development_paths_registered: bool,
}

struct Inner {
    state: Mutex<HostState>,
    init: Mutex<()>,
    factory: BackendFactory,
    capabilities: PlatformCapabilities,
    apartment: ApartmentProbe,
    log_sink: Box<LogSink>,
    allocator: Box<InitAllocator>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.initialized {
            if let Some(backend) = state.backend.take() {
                backend.shutdown();
            }
        }
    }
}

/// Native-library host. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct NativeRuntimeHost {
    inner: Arc<Inner>,
}

impl NativeRuntimeHost {
    /// Host that loads the shared library from the probing path.
    pub fn new() -> Self {
        Self::with_factory(Arc::new(|candidates: &[PathBuf]| {
            LibraryBackend::load(candidates).map(|b| Arc::new(b) as Arc<dyn NativeBackend>)
        }))
    }

    pub fn with_factory(factory: BackendFactory) -> Self {
        Self::from_parts(factory, PlatformCapabilities::current(), validate::current_apartment)
    }

    /// Host driving an already constructed backend.
    pub fn with_backend(backend: Arc<dyn NativeBackend>) -> Self {
        Self::with_factory(Arc::new(move |_: &[PathBuf]| Ok(Arc::clone(&backend))))
    }

    /// Fully explicit constructor, used to exercise other platforms' rules.
    pub fn from_parts(
        factory: BackendFactory,
        capabilities: PlatformCapabilities,
        apartment: ApartmentProbe,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(HostState::default()),
                init: Mutex::new(()),
                factory,
                capabilities,
                apartment,
                log_sink: Box::default(),
                allocator: Box::new(InitAllocator(Allocator::system().raw())),
            }),
        }
    }

    pub fn capabilities(&self) -> PlatformCapabilities {
        self.inner.capabilities
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> HostOptions {
        self.state().options.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.state().initialized
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the backend without initializing it.
    fn load_backend(&self) -> std::result::Result<Arc<dyn NativeBackend>, LoadError> {
        let candidates = {
            let state = self.state();
            if let Some(backend) = &state.backend {
                return Ok(Arc::clone(backend));
            }
            state.probing.candidates()
        };
        let backend = (self.inner.factory)(&candidates)?;
        self.state().backend.get_or_insert_with(|| Arc::clone(&backend));
        Ok(backend)
    }

    fn register_development_paths(&self) {
        let mut state = self.state();
        if state.development_paths_registered {
            return;
        }
        state.development_paths_registered = true;
        let Some(binary_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.to_path_buf()))
        else {
            return;
        };
        for dir in loader::development_probing_paths(&binary_dir) {
            tracing::debug!(path = %dir.display(), "registering development probing path");
            state.probing.register(dir);
        }
    }

    fn initialize_backend(&self, options: &HostOptions) -> Result<Arc<dyn NativeBackend>> {
        let backend = self.load_backend().map_err(LoadError::into_init_error)?;

        let version = backend.abi_version();
        if version != ABI_VERSION {
            return Err(NativeBoxError::initialization(
                StatusCode::NotSupported,
                format!(
                    "native library reports ABI version {version:#08x}, expected {ABI_VERSION:#08x}"
                ),
            ));
        }

        let runtime_name = options
            .runtime_name
            .as_deref()
            .and_then(|name| CString::new(name).ok());
        let mut init = NmbInitializeOptions::new();
        init.runtime_name_utf8 = runtime_name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
        init.allocator = &self.inner.allocator.0;
        init.enable_async_dispatch = nmb_bool(options.enable_async_dispatch);
        init.log_callback = Some(forward_native_log);
        init.log_user_data = self.inner.log_sink.as_user_data();

        // SAFETY: every pointer in `init` outlives the call; the sink and the
        // allocator record live as long as the host.
        let status = unsafe { backend.initialize(&init) };
        match StatusCode::from_raw(status) {
            Some(StatusCode::Ok) => {}
            Some(StatusCode::PlatformFailure) => {
                tracing::warn!("native initialize reported a platform failure; continuing");
            }
            code => {
                return Err(NativeBoxError::initialization(
                    code.unwrap_or(StatusCode::PlatformFailure),
                    format!("native initialization failed with status {status}"),
                ));
            }
        }
        Ok(backend)
    }

    /// Foreground activity to parent the dialog to, when the platform does
    /// that and the request names no parent itself.
    fn foreground_activity(
        &self,
        request: &MessageBoxRequest,
        options: &HostOptions,
    ) -> Option<ActivityReference> {
        if !self.inner.capabilities.parent_defaults_to_activity || request.parent_window().is_some()
        {
            return None;
        }
        let provider = options.android.activity_reference_provider.as_ref()?;
        let reference = provider();
        (!reference.is_none()).then_some(reference)
    }
}

impl Default for NativeRuntimeHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBoxHost for NativeRuntimeHost {
    fn ensure_initialized(&self) -> Result<()> {
        if self.state().initialized {
            return Ok(());
        }
        let _init = self.inner.init.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state().initialized {
            return Ok(());
        }

        self.register_development_paths();
        let options = self.options();
        let backend = self.initialize_backend(&options)?;

        let mut state = self.state();
        state.backend = Some(backend);
        state.initialized = true;
        tracing::info!(platform = ?self.inner.capabilities.platform, "native message box host initialized");
        Ok(())
    }

    fn shutdown(&self) {
        let _init = self.inner.init.lock().unwrap_or_else(PoisonError::into_inner);
        let backend = {
            let mut state = self.state();
            if !state.initialized {
                return;
            }
            state.initialized = false;
            state.backend.clone()
        };
        if let Some(backend) = backend {
            backend.shutdown();
        }
        tracing::info!("native message box host shut down");
    }

    fn show(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult> {
        let request_id = RequestId::new();
        let span = tracing::info_span!("message_box", %request_id);
        let _entered = span.enter();

        self.ensure_initialized()?;
        let (backend, options) = {
            let state = self.state();
            (state.backend.clone(), state.options.clone())
        };
        let backend = backend.ok_or_else(|| {
            NativeBoxError::status(StatusCode::Uninitialized, "native backend is not initialized")
        })?;

        let apartment = (self.inner.apartment)();
        validate::validate_thread(request, &options, &self.inner.capabilities, apartment)?;
        validate::validate_capabilities(request, &self.inner.capabilities, apartment)?;

        let activity = self.foreground_activity(request, &options);
        let parent = activity.as_ref().and_then(|a| WindowHandle::from_raw(a.handle()));

        let scope = MemoryScope::new();
        let block = build_request(request, &scope, parent)?;
        let mut raw = new_result_block();
        tracing::debug!(buttons = block.button_count, "dispatching to native backend");

        // SAFETY: `block` points into `scope`, which outlives the call.
        let status = unsafe { backend.show_message_box(&block, &mut raw) };
        drop(activity);

        if status != result_code::OK {
            raw.result_code = status;
        }
        let result = parse_result(&mut raw, request, &scope.allocator());
        tracing::info!(
            outcome = ?result.outcome(),
            button = result.button_id(),
            timed_out = result.was_timeout(),
            "message box closed"
        );
        Ok(result)
    }

    async fn show_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> Result<MessageBoxResult> {
        if cancel.is_cancelled() {
            return Err(NativeBoxError::DispatchCancelled);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            NativeBoxError::status(StatusCode::NotSupported, "no Tokio runtime for async dispatch")
        })?;
        let host = self.clone();
        let worker = runtime.spawn_blocking(move || {
            if cancel.is_cancelled() {
                return Err(NativeBoxError::DispatchCancelled);
            }
            host.show(&request)
        });
        worker.await.map_err(|e| {
            NativeBoxError::status(StatusCode::PlatformFailure, format!("dialog worker failed: {e}"))
        })?
    }
}

impl RuntimeHostSupport for NativeRuntimeHost {
    fn configure(&self, configure: &mut dyn FnMut(&mut HostOptions)) {
        configure(&mut self.state().options);
    }

    fn register_native_library_path(&self, path: PathBuf) {
        let mut state = self.state();
        if state.backend.is_some() {
            tracing::debug!(path = %path.display(), "library already loaded; path kept for reference");
        }
        state.probing.register(path);
    }

    fn register_log_handler(&self, handler: Option<LogHandler>) {
        self.inner.log_sink.set_handler(handler);
        let backend = {
            let state = self.state();
            if !state.initialized {
                return;
            }
            state.backend.clone()
        };
        if let Some(backend) = backend {
            // SAFETY: the sink lives as long as the host.
            unsafe {
                backend.set_log_callback(
                    Some(forward_native_log),
                    self.inner.log_sink.as_user_data(),
                )
            };
        }
    }

    fn verify_abi_compatibility(&self) -> bool {
        match self.load_backend() {
            Ok(backend) => backend.abi_version() == ABI_VERSION,
            Err(e) => {
                tracing::debug!(error = %e, "ABI check could not load the native library");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use nativebox_core::{
        ButtonSpec, CallerTag, InputSpec, MessageBoxOutcome, Ownership, button_id,
    };

    use super::*;
    use crate::harness::ScriptedBackend;

    fn scripted() -> (Arc<ScriptedBackend>, NativeRuntimeHost) {
        let backend = Arc::new(ScriptedBackend::new());
        let host = NativeRuntimeHost::from_parts(
            {
                let backend = Arc::clone(&backend);
                Arc::new(move |_: &[PathBuf]| Ok(Arc::clone(&backend) as Arc<dyn NativeBackend>))
            },
            PlatformCapabilities::LINUX,
            || ApartmentState::Unknown,
        );
        (backend, host)
    }

    fn missing_library() -> NativeRuntimeHost {
        NativeRuntimeHost::with_factory(Arc::new(|candidates: &[PathBuf]| {
            Err(LoadError::NotFound {
                tried: candidates.len(),
            })
        }))
    }

    #[test]
    fn initialization_is_lazy_and_idempotent() {
        let (backend, host) = scripted();
        assert_eq!(backend.initialize_calls(), 0);
        host.ensure_initialized().unwrap();
        host.ensure_initialized().unwrap();
        assert_eq!(backend.initialize_calls(), 1);
        assert!(host.is_initialized());
    }

    #[test]
    fn concurrent_initialization_runs_once() {
        let (backend, host) = scripted();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| host.ensure_initialized().unwrap());
            }
        });
        assert_eq!(backend.initialize_calls(), 1);
    }

    #[test]
    fn runtime_name_reaches_backend() {
        let (backend, host) = scripted();
        host.configure(&mut |o| o.runtime_name = Some("tests".into()));
        host.ensure_initialized().unwrap();
        assert_eq!(backend.runtime_name().as_deref(), Some("tests"));
    }

    #[test]
    fn shutdown_is_idempotent() {
        let (backend, host) = scripted();
        host.shutdown();
        host.ensure_initialized().unwrap();
        host.shutdown();
        host.shutdown();
        assert_eq!(backend.shutdown_calls(), 1);
        assert!(!host.is_initialized());
    }

    #[test]
    fn missing_library_is_an_initialization_platform_failure() {
        let err = missing_library().ensure_initialized().unwrap_err();
        assert!(err.is_initialization());
        assert_eq!(err.outcome(), MessageBoxOutcome::PlatformFailure);
    }

    #[test]
    fn missing_entry_point_is_an_initialization_not_supported() {
        let host = NativeRuntimeHost::with_factory(Arc::new(|_: &[PathBuf]| {
            Err(LoadError::MissingEntryPoint {
                path: PathBuf::from("libnativemessagebox.so"),
                entry_point: "nmb_initialize",
            })
        }));
        let err = host.ensure_initialized().unwrap_err();
        assert!(err.is_initialization());
        assert_eq!(err.outcome(), MessageBoxOutcome::NotSupported);
    }

    #[test]
    fn abi_mismatch_fails_initialization() {
        let host = NativeRuntimeHost::with_backend(Arc::new(ScriptedBackend::with_abi_version(
            nativebox_abi::schema::make_version(9, 0, 0),
        )));
        let err = host.ensure_initialized().unwrap_err();
        assert!(err.is_initialization());
        assert_eq!(err.status_code(), StatusCode::NotSupported.raw());
        assert!(!host.verify_abi_compatibility());
    }

    #[test]
    fn initialize_platform_failure_is_tolerated() {
        let (backend, host) = scripted();
        backend.script(|s| s.initialize_status = result_code::PLATFORM_FAILURE);
        host.ensure_initialized().unwrap();

        let (backend, host) = scripted();
        backend.script(|s| s.initialize_status = result_code::INVALID_ARGUMENT);
        let err = host.ensure_initialized().unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::InvalidArgument);
        assert!(!host.is_initialized());
    }

    #[test]
    fn show_returns_scripted_answer() {
        let (backend, host) = scripted();
        backend.script(|s| {
            s.button = Some(button_id::NO);
            s.checkbox_checked = true;
        });
        let request = MessageBoxRequest::builder("Save changes?")
            .button(ButtonSpec::new(button_id::YES, "Yes").unwrap().as_default())
            .button(ButtonSpec::new(button_id::NO, "No").unwrap())
            .show_suppress_checkbox(true)
            .build()
            .unwrap();
        let result = host.show(&request).unwrap();
        assert_eq!(result.button_id(), button_id::NO);
        assert!(result.checkbox_checked());
        assert_eq!(result.outcome(), MessageBoxOutcome::Success);
        assert_eq!(backend.requests()[0].message.as_deref(), Some("Save changes?"));
    }

    #[test]
    fn timeout_reports_default_button() {
        let (backend, host) = scripted();
        backend.script(|s| s.simulate_timeout = true);
        let request = MessageBoxRequest::builder("Closing in five seconds")
            .button(ButtonSpec::new(2, "Close").unwrap().as_default())
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let result = host.show(&request).unwrap();
        assert!(result.was_timeout());
        assert_eq!(result.button_id(), 2);
        assert_eq!(backend.requests()[0].timeout_milliseconds, 5000);
    }

    #[test]
    fn backend_status_overrides_result_code() {
        let (backend, host) = scripted();
        backend.script(|s| s.status = result_code::PLATFORM_FAILURE);
        let result = host.show(&MessageBoxRequest::message("x").unwrap()).unwrap();
        assert_eq!(result.outcome(), MessageBoxOutcome::PlatformFailure);
        assert_eq!(result.native_result_code(), result_code::PLATFORM_FAILURE);

        let (backend, host) = scripted();
        backend.script(|s| s.result_code = result_code::CANCELLED);
        let result = host.show(&MessageBoxRequest::message("x").unwrap()).unwrap();
        assert_eq!(result.outcome(), MessageBoxOutcome::Cancelled);
    }

    #[test]
    fn windows_rules_apply_before_the_backend_is_called() {
        let backend = Arc::new(ScriptedBackend::new());
        let host = NativeRuntimeHost::from_parts(
            {
                let backend = Arc::clone(&backend);
                Arc::new(move |_: &[PathBuf]| Ok(Arc::clone(&backend) as Arc<dyn NativeBackend>))
            },
            PlatformCapabilities::WINDOWS,
            || ApartmentState::MultiThreaded,
        );

        let text_input = MessageBoxRequest::builder("Name?")
            .input(InputSpec::text())
            .build()
            .unwrap();
        let err = host.show(&text_input).unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::InvalidArgument);

        host.configure(&mut |o| o.require_sta_thread_for_windows = false);
        let err = host.show(&text_input).unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::NotSupported);
        assert_eq!(backend.show_calls(), 0);
    }

    #[test]
    fn try_show_never_fails_without_a_library() {
        let tag = CallerTag::new("caller");
        let request = MessageBoxRequest::builder("x").tag(tag.clone()).build().unwrap();
        let (ok, result) = missing_library().try_show(&request);
        assert!(!ok);
        assert_ne!(result.outcome(), MessageBoxOutcome::Success);
        assert_eq!(result.tag(), Some(&tag));
    }

    #[test]
    fn android_parent_defaults_to_activity_and_releases_it() {
        static RELEASED: AtomicUsize = AtomicUsize::new(0);
        fn release(_: usize) {
            RELEASED.fetch_add(1, Ordering::SeqCst);
        }

        let backend = Arc::new(ScriptedBackend::new());
        let host = NativeRuntimeHost::from_parts(
            {
                let backend = Arc::clone(&backend);
                Arc::new(move |_: &[PathBuf]| Ok(Arc::clone(&backend) as Arc<dyn NativeBackend>))
            },
            PlatformCapabilities::ANDROID,
            || ApartmentState::Unknown,
        );
        host.configure(&mut |o| {
            o.android.activity_reference_provider =
                Some(Arc::new(|| ActivityReference::owned(0xA0, release)));
        });

        host.show(&MessageBoxRequest::message("hello").unwrap()).unwrap();
        assert_eq!(backend.requests()[0].parent_window, 0xA0);
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);

        let explicit = MessageBoxRequest::builder("child")
            .parent_window(WindowHandle::from_raw(0xB0).unwrap())
            .build()
            .unwrap();
        host.show(&explicit).unwrap();
        assert_eq!(backend.requests()[1].parent_window, 0xB0);
        assert_eq!(RELEASED.load(Ordering::SeqCst), 1);
        assert_eq!(ActivityReference::borrowed(1).ownership(), Ownership::Borrowed);
    }

    #[test]
    fn log_lines_reach_handler_registered_after_init() {
        let (backend, host) = scripted();
        host.ensure_initialized().unwrap();
        let seen = Arc::new(Mutex::new(Vec::<String>::new()));
        let captured = Arc::clone(&seen);
        host.register_log_handler(Some(Arc::new(move |line: &str| {
            captured.lock().unwrap().push(line.to_owned());
        })));
        backend.emit_log("dialog created");
        assert_eq!(*seen.lock().unwrap(), ["dialog created"]);
    }

    #[test]
    fn abi_check_without_library_is_false() {
        assert!(!missing_library().verify_abi_compatibility());
        let (_, host) = scripted();
        assert!(host.verify_abi_compatibility());
    }

    #[tokio::test]
    async fn cancelled_token_never_reaches_backend() {
        let (backend, host) = scripted();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = host
            .show_async(MessageBoxRequest::message("x").unwrap(), cancel.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, NativeBoxError::DispatchCancelled));

        let (ok, result) = host
            .try_show_async(MessageBoxRequest::message("x").unwrap(), cancel)
            .await;
        assert!(ok);
        assert_eq!(result.outcome(), MessageBoxOutcome::Cancelled);
        assert_eq!(result.native_result_code(), StatusCode::Cancelled.raw());
        assert_eq!(backend.show_calls(), 0);
    }

    #[tokio::test]
    async fn try_show_async_never_fails_without_a_library() {
        let tag = CallerTag::new("caller");
        let request = MessageBoxRequest::builder("x").tag(tag.clone()).build().unwrap();
        let (ok, result) = missing_library()
            .try_show_async(request, CancellationToken::new())
            .await;
        assert!(!ok);
        assert_ne!(result.outcome(), MessageBoxOutcome::Success);
        assert_eq!(result.outcome(), MessageBoxOutcome::PlatformFailure);
        assert_eq!(result.tag(), Some(&tag));
    }

    #[test]
    fn async_dispatch_outside_tokio_is_not_supported() {
        let (backend, host) = scripted();
        let err = futures::executor::block_on(
            host.show_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new()),
        )
        .unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::NotSupported);

        let (ok, result) = futures::executor::block_on(
            host.try_show_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new()),
        );
        assert!(!ok);
        assert_eq!(result.outcome(), MessageBoxOutcome::NotSupported);
        assert_eq!(backend.show_calls(), 0);
    }

    #[tokio::test]
    async fn async_show_runs_on_worker() {
        let (backend, host) = scripted();
        backend.script(|s| s.button = Some(button_id::OK));
        let result = host
            .show_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.button_id(), button_id::OK);
        assert_eq!(backend.show_calls(), 1);
    }
}
