// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativebox-client — the object applications hold to show message boxes.
//
// A `MessageBoxClient` owns the active host. There is no global instance:
// the application creates one (usually `for_current_platform`) and passes it
// where it is needed. Tests swap the host with `use_host`.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use nativebox_bridge::{LogHandler, MessageBoxHost, RuntimeHostSupport};
pub use nativebox_core::{
    ButtonSpec, HostOptions, Icon, InputSpec, MessageBoxOutcome, MessageBoxRequest,
    MessageBoxResult, NativeBoxError, Result, button_id,
};
pub use tokio_util::sync::CancellationToken;

/// A host plus, when it has one, its runtime configuration surface.
#[derive(Clone)]
pub struct HostHandle {
    host: Arc<dyn MessageBoxHost>,
    runtime: Option<Arc<dyn RuntimeHostSupport>>,
}

impl HostHandle {
    /// A host without runtime configuration.
    pub fn new(host: Arc<dyn MessageBoxHost>) -> Self {
        Self { host, runtime: None }
    }

    /// A host that also accepts runtime configuration.
    pub fn with_runtime<T>(host: Arc<T>) -> Self
    where
        T: MessageBoxHost + RuntimeHostSupport + 'static,
    {
        Self {
            host: host.clone(),
            runtime: Some(host),
        }
    }

    pub fn host(&self) -> &Arc<dyn MessageBoxHost> {
        &self.host
    }

    pub fn runtime(&self) -> Option<&Arc<dyn RuntimeHostSupport>> {
        self.runtime.as_ref()
    }

    fn require_runtime(&self, what: &'static str) -> Result<&Arc<dyn RuntimeHostSupport>> {
        self.runtime
            .as_ref()
            .ok_or(NativeBoxError::RuntimeSupportUnavailable(what))
    }
}

pub struct MessageBoxClient {
    handle: Mutex<HostHandle>,
}

impl MessageBoxClient {
    /// Client over the host for the compilation target.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn for_current_platform() -> Self {
        let host = Arc::new(nativebox_bridge::NativeRuntimeHost::new());

        #[cfg(target_os = "android")]
        {
            use nativebox_bridge::android::{ActivityTracker, ndk_activity};

            let tracker = ActivityTracker::new();
            if let Some(activity) = ndk_activity() {
                tracker.on_resume(&activity);
            }
            tracker.install(&*host);
        }

        Self::new(HostHandle::with_runtime(host))
    }

    /// Client over the host for the compilation target.
    #[cfg(target_arch = "wasm32")]
    pub fn for_current_platform() -> Self {
        use nativebox_bridge::browser::BrowserHost;
        use nativebox_bridge::browser::wasm::GlobalThisBridge;

        Self::new(HostHandle::with_runtime(Arc::new(BrowserHost::new(GlobalThisBridge))))
    }

    pub fn new(handle: HostHandle) -> Self {
        Self {
            handle: Mutex::new(handle),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostHandle> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the active host; the lock is released on return.
    pub fn current_host(&self) -> HostHandle {
        self.lock().clone()
    }

    /// Replace the active host, returning the previous one.
    pub fn use_host(&self, handle: HostHandle) -> HostHandle {
        std::mem::replace(&mut *self.lock(), handle)
    }

    fn host(&self) -> Arc<dyn MessageBoxHost> {
        self.lock().host.clone()
    }

    // -- Runtime configuration ------------------------------------------------

    pub fn configure_host(&self, configure: impl FnOnce(&mut HostOptions)) -> Result<()> {
        let handle = self.current_host();
        let runtime = handle.require_runtime("runtime configuration")?;
        let mut configure = Some(configure);
        runtime.configure(&mut |options| {
            if let Some(configure) = configure.take() {
                configure(options);
            }
        });
        Ok(())
    }

    /// Load options from a JSON file and apply them. The Android activity
    /// provider already installed on the host is kept.
    pub fn apply_options_file(&self, path: &Path) -> Result<()> {
        let loaded = HostOptions::load(path)?;
        tracing::debug!(path = %path.display(), "applying host options file");
        self.configure_host(move |options| {
            let android = std::mem::take(&mut options.android);
            *options = loaded;
            options.android = android;
        })
    }

    pub fn register_native_library_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let handle = self.current_host();
        handle
            .require_runtime("native library probing paths")?
            .register_native_library_path(path.into());
        Ok(())
    }

    /// Install or clear the handler for backend log lines.
    pub fn register_log_handler(&self, handler: Option<LogHandler>) -> Result<()> {
        let handle = self.current_host();
        handle
            .require_runtime("log handlers")?
            .register_log_handler(handler);
        Ok(())
    }

    /// True when the backend speaks this build's ABI, or when the host has
    /// no loadable native library at all.
    pub fn verify_abi_compatibility(&self) -> bool {
        if cfg!(target_arch = "wasm32") {
            return true;
        }
        self.current_host()
            .runtime()
            .is_none_or(|runtime| runtime.verify_abi_compatibility())
    }

    // -- Lifecycle ----------------------------------------------------------------

    pub fn ensure_initialized(&self) -> Result<()> {
        self.host().ensure_initialized()
    }

    pub fn shutdown(&self) {
        self.host().shutdown();
    }

    // -- Show ---------------------------------------------------------------------

    pub fn show(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult> {
        self.host().show(request)
    }

    /// Like [`show`](Self::show), but an outcome other than Success or
    /// Cancelled is raised as [`NativeBoxError::Dialog`].
    pub fn show_or_throw(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult> {
        completed_or_raise(self.show(request)?)
    }

    pub fn try_show(&self, request: &MessageBoxRequest) -> (bool, MessageBoxResult) {
        self.host().try_show(request)
    }

    pub async fn show_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> Result<MessageBoxResult> {
        let host = self.host();
        host.show_async(request, cancel).await
    }

    pub async fn show_or_throw_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> Result<MessageBoxResult> {
        completed_or_raise(self.show_async(request, cancel).await?)
    }

    pub async fn try_show_async(
        &self,
        request: MessageBoxRequest,
        cancel: CancellationToken,
    ) -> (bool, MessageBoxResult) {
        let host = self.host();
        host.try_show_async(request, cancel).await
    }
}

fn completed_or_raise(result: MessageBoxResult) -> Result<MessageBoxResult> {
    if result.outcome().is_completed() {
        Ok(result)
    } else {
        Err(NativeBoxError::Dialog(Box::new(result)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use nativebox_bridge::NativeRuntimeHost;
    use nativebox_bridge::harness::ScriptedBackend;
    use nativebox_bridge::native::{LoadError, NativeBackend};
    use nativebox_core::{CallerTag, StatusCode};

    use super::*;

    fn scripted_client() -> (Arc<ScriptedBackend>, MessageBoxClient) {
        let backend = Arc::new(ScriptedBackend::new());
        let host = NativeRuntimeHost::with_backend(backend.clone() as Arc<dyn NativeBackend>);
        (backend, MessageBoxClient::new(HostHandle::with_runtime(Arc::new(host))))
    }

    /// Host with no runtime support that always answers the same way.
    struct FixedHost {
        code: u32,
        calls: AtomicUsize,
    }

    impl FixedHost {
        fn answer(&self, request: &MessageBoxRequest) -> MessageBoxResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            MessageBoxResult::new(button_id::OK, false, None, false, self.code, request.tag().cloned())
        }
    }

    #[async_trait]
    impl MessageBoxHost for FixedHost {
        fn ensure_initialized(&self) -> Result<()> {
            Ok(())
        }

        fn shutdown(&self) {}

        fn show(&self, request: &MessageBoxRequest) -> Result<MessageBoxResult> {
            Ok(self.answer(request))
        }

        async fn show_async(
            &self,
            request: MessageBoxRequest,
            cancel: CancellationToken,
        ) -> Result<MessageBoxResult> {
            if cancel.is_cancelled() {
                return Err(NativeBoxError::DispatchCancelled);
            }
            Ok(self.answer(&request))
        }
    }

    fn fixed(code: u32) -> Arc<FixedHost> {
        Arc::new(FixedHost {
            code,
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn show_or_throw_raises_only_for_error_outcomes() {
        let request = MessageBoxRequest::message("x").unwrap();
        let client = MessageBoxClient::new(HostHandle::new(fixed(StatusCode::PlatformFailure.raw())));
        let err = client.show_or_throw(&request).unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::PlatformFailure);
        assert_eq!(err.status_code(), err.result().unwrap().native_result_code());

        for code in [StatusCode::Ok, StatusCode::Cancelled] {
            client.use_host(HostHandle::new(fixed(code.raw())));
            assert!(client.show_or_throw(&request).is_ok());
        }
    }

    #[test]
    fn configuration_needs_runtime_support() {
        let client = MessageBoxClient::new(HostHandle::new(fixed(0)));
        assert!(matches!(
            client.configure_host(|o| o.enable_async_dispatch = true),
            Err(NativeBoxError::RuntimeSupportUnavailable(_))
        ));
        assert!(client.register_native_library_path("/opt/native").is_err());
        assert!(client.register_log_handler(None).is_err());
        assert!(client.verify_abi_compatibility());
    }

    #[test]
    fn use_host_swaps_and_returns_previous() {
        let first = fixed(0);
        let second = fixed(0);
        let client = MessageBoxClient::new(HostHandle::new(first.clone()));
        let previous = client.use_host(HostHandle::new(second.clone()));
        assert!(previous.runtime().is_none());

        client.show(&MessageBoxRequest::message("x").unwrap()).unwrap();
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scripted_backend_round_trip() {
        let (backend, client) = scripted_client();
        backend.script(|s| {
            s.button = Some(button_id::CUSTOM_BASE);
            s.input_value = Some("typed".into());
        });
        let tag = CallerTag::new("form");
        let request = MessageBoxRequest::builder("Name?")
            .button(ButtonSpec::new(button_id::CUSTOM_BASE, "Save").unwrap())
            .tag(tag.clone())
            .build()
            .unwrap();

        let result = client.show_or_throw(&request).unwrap();
        assert_eq!(result.button_id(), button_id::CUSTOM_BASE);
        assert_eq!(result.input_value(), Some("typed"));
        assert_eq!(result.tag(), Some(&tag));
        assert!(client.verify_abi_compatibility());
    }

    #[test]
    fn log_handler_and_paths_reach_native_host() {
        let (backend, client) = scripted_client();
        client.register_native_library_path("/opt/nativebox").unwrap();
        client.ensure_initialized().unwrap();

        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let captured = lines.clone();
        client
            .register_log_handler(Some(Arc::new(move |line: &str| {
                captured.lock().unwrap().push(line.to_owned());
            })))
            .unwrap();
        backend.emit_log("native says hi");
        assert_eq!(*lines.lock().unwrap(), ["native says hi"]);

        client.shutdown();
        assert_eq!(backend.shutdown_calls(), 1);
    }

    #[test]
    fn options_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nativebox.json");
        std::fs::write(&path, r#"{"runtime_name":"from-file"}"#).unwrap();

        let (backend, client) = scripted_client();
        client.apply_options_file(&path).unwrap();
        client.ensure_initialized().unwrap();
        assert_eq!(backend.runtime_name().as_deref(), Some("from-file"));

        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            client.apply_options_file(&path),
            Err(NativeBoxError::Serialization(_))
        ));
    }

    #[test]
    fn try_show_without_library_reports_failure() {
        let host = NativeRuntimeHost::with_factory(Arc::new(|_: &[PathBuf]| {
            Err(LoadError::NotFound { tried: 0 })
        }));
        let client = MessageBoxClient::new(HostHandle::with_runtime(Arc::new(host)));
        let (ok, result) = client.try_show(&MessageBoxRequest::message("x").unwrap());
        assert!(!ok);
        assert_ne!(result.outcome(), MessageBoxOutcome::Success);
        assert!(!client.verify_abi_compatibility());
    }

    #[tokio::test]
    async fn try_show_async_without_library_reports_failure() {
        let host = NativeRuntimeHost::with_factory(Arc::new(|_: &[PathBuf]| {
            Err(LoadError::NotFound { tried: 0 })
        }));
        let client = MessageBoxClient::new(HostHandle::with_runtime(Arc::new(host)));
        let (ok, result) = client
            .try_show_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new())
            .await;
        assert!(!ok);
        assert_ne!(result.outcome(), MessageBoxOutcome::Success);
    }

    #[tokio::test]
    async fn async_variants_follow_sync_rules() {
        let client = MessageBoxClient::new(HostHandle::new(fixed(StatusCode::NotSupported.raw())));
        let err = client
            .show_or_throw_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.outcome(), MessageBoxOutcome::NotSupported);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let (ok, result) = client
            .try_show_async(MessageBoxRequest::message("x").unwrap(), cancel)
            .await;
        assert!(ok);
        assert_eq!(result.outcome(), MessageBoxOutcome::Cancelled);

        let (ok, result) = client
            .try_show_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new())
            .await;
        assert!(!ok);
        assert_eq!(result.outcome(), MessageBoxOutcome::NotSupported);
    }

    #[tokio::test]
    async fn native_async_show_uses_worker() {
        let (backend, client) = scripted_client();
        let result = client
            .show_async(MessageBoxRequest::message("x").unwrap(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.outcome(), MessageBoxOutcome::Success);
        assert_eq!(backend.show_calls(), 1);
    }
}
