// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Locating and loading the native dialog library.
//
// Probing order: `NMB_NATIVE_PATH`, registered directories (insertion order),
// the executable's directory, then `runtimes/<rid>/native/` below it for each
// runtime fallback. The system search path is tried last.

use std::ffi::{CStr, c_void};
use std::path::{Path, PathBuf};

use thiserror::Error;

use nativebox_abi::schema::{
    ENTRY_GET_ABI_VERSION, ENTRY_INITIALIZE, ENTRY_SET_LOG_CALLBACK, ENTRY_SHOW_MESSAGE_BOX,
    ENTRY_SHUTDOWN, GetAbiVersionFn, InitializeFn, LogCallback, NmbInitializeOptions,
    NmbMessageBoxOptions, NmbMessageBoxResult, SetLogCallbackFn, ShowMessageBoxFn, ShutdownFn,
};
use nativebox_core::{NativeBoxError, StatusCode};

use super::backend::NativeBackend;

/// Platform file name of the library.
pub fn library_file_name() -> &'static str {
    if cfg!(windows) {
        "nativemessagebox.dll"
    } else if cfg!(target_vendor = "apple") {
        "libnativemessagebox.dylib"
    } else {
        "libnativemessagebox.so"
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("native message box library not found on the probing path ({tried} candidates)")]
    NotFound { tried: usize },

    #[error("{path} does not export {entry_point}")]
    MissingEntryPoint {
        path: PathBuf,
        entry_point: &'static str,
    },
}

impl LoadError {
    /// Initialization error kind for this failure: a missing library is a
    /// platform failure, a library with the wrong exports is unsupported.
    pub fn into_init_error(self) -> NativeBoxError {
        let code = match &self {
            Self::NotFound { .. } => StatusCode::PlatformFailure,
            Self::MissingEntryPoint { .. } => StatusCode::NotSupported,
        };
        NativeBoxError::initialization(code, self.to_string())
    }
}

/// Runtime identifier prefix for a Rust `target_os` value.
pub fn rid_os_prefix(os: &str) -> &str {
    match os {
        "windows" => "win",
        "macos" => "osx",
        other => other,
    }
}

/// Runtime identifier architecture for a Rust `target_arch` value.
pub fn rid_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "x86",
        "arm" => "arm",
        other => other,
    }
}

/// Runtime fallbacks for the running process, most specific first.
pub fn runtime_fallbacks() -> Vec<String> {
    let mut os = rid_os_prefix(std::env::consts::OS).to_owned();
    if cfg!(target_abi = "sim") {
        os.push_str("simulator");
    }
    runtime_fallbacks_for(&os, rid_arch(std::env::consts::ARCH))
}

/// `<prefix>-<arch>` before the bare prefix. Simulator prefixes also try
/// their device counterpart. Duplicates are dropped ignoring case.
pub fn runtime_fallbacks_for(os_prefix: &str, arch: &str) -> Vec<String> {
    let alias = os_prefix.strip_suffix("simulator").filter(|base| !base.is_empty());

    let mut candidates = vec![format!("{os_prefix}-{arch}")];
    if let Some(base) = alias {
        candidates.push(format!("{base}-{arch}"));
    }
    candidates.push(os_prefix.to_owned());
    if let Some(base) = alias {
        candidates.push(base.to_owned());
    }

    let mut rids: Vec<String> = Vec::with_capacity(candidates.len());
    for rid in candidates {
        if !rids.iter().any(|known| known.eq_ignore_ascii_case(&rid)) {
            rids.push(rid);
        }
    }
    rids
}

/// Full candidate list in probing order.
pub fn candidate_paths(
    env_dir: Option<&Path>,
    registered: &[PathBuf],
    binary_dir: Option<&Path>,
    rids: &[String],
    file_name: &str,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = env_dir {
        paths.push(dir.join(file_name));
    }
    paths.extend(registered.iter().map(|dir| dir.join(file_name)));
    if let Some(dir) = binary_dir {
        paths.push(dir.join(file_name));
        for rid in rids {
            paths.push(dir.join("runtimes").join(rid).join("native").join(file_name));
        }
    }
    paths
}

/// Build-output directories near the executable that exist on disk.
pub fn development_probing_paths(binary_dir: &Path) -> Vec<PathBuf> {
    const RELATIVE: &[&[&str]] = &[
        &["..", "..", "build", "native", "src", "native"],
        &["..", "..", "src", "native", "macos"],
        &["..", "..", "src", "native", "linux"],
        &["..", "..", "src", "native", "windows"],
    ];
    RELATIVE
        .iter()
        .map(|parts| parts.iter().fold(binary_dir.to_path_buf(), |dir, part| dir.join(part)))
        .filter(|dir| dir.is_dir())
        .filter_map(|dir| dir.canonicalize().ok())
        .collect()
}

/// Directories registered by the caller, deduplicated, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ProbingPaths {
    registered: Vec<PathBuf>,
}

impl ProbingPaths {
    pub fn register(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() || self.registered.contains(&path) {
            return;
        }
        self.registered.push(path);
    }

    pub fn registered(&self) -> &[PathBuf] {
        &self.registered
    }

    /// Candidates for this process, reading `NMB_NATIVE_PATH` now.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let env_dir = std::env::var_os(nativebox_core::config::NATIVE_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let binary_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));
        candidate_paths(
            env_dir.as_deref(),
            &self.registered,
            binary_dir.as_deref(),
            &runtime_fallbacks(),
            library_file_name(),
        )
    }
}

// ---------------------------------------------------------------------------
// Dynamic library handle
// ---------------------------------------------------------------------------

#[cfg(unix)]
mod sys {
    use std::ffi::{CStr, CString, c_void};
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr::NonNull;

    pub struct Handle(NonNull<c_void>);

    pub fn open(path: &Path) -> Option<Handle> {
        let name = CString::new(path.as_os_str().as_bytes()).ok()?;
        // SAFETY: `name` is NUL-terminated.
        let raw = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_LOCAL) };
        NonNull::new(raw).map(Handle)
    }

    pub fn symbol(handle: &Handle, name: &CStr) -> Option<NonNull<c_void>> {
        // SAFETY: the handle is open until `close`.
        NonNull::new(unsafe { libc::dlsym(handle.0.as_ptr(), name.as_ptr()) })
    }

    pub fn close(handle: &Handle) {
        // SAFETY: called once from Drop.
        unsafe { libc::dlclose(handle.0.as_ptr()) };
    }
}

#[cfg(windows)]
mod sys {
    use std::ffi::{CStr, c_void};
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use std::ptr::NonNull;

    use windows_sys::Win32::System::LibraryLoader::{FreeLibrary, GetProcAddress, LoadLibraryW};

    pub struct Handle(NonNull<c_void>);

    pub fn open(path: &Path) -> Option<Handle> {
        let wide: Vec<u16> = path.as_os_str().encode_wide().chain(Some(0)).collect();
        // SAFETY: `wide` is NUL-terminated.
        let raw = unsafe { LoadLibraryW(wide.as_ptr()) };
        NonNull::new(raw).map(Handle)
    }

    pub fn symbol(handle: &Handle, name: &CStr) -> Option<NonNull<c_void>> {
        // SAFETY: the module stays loaded until `close`.
        let proc = unsafe { GetProcAddress(handle.0.as_ptr(), name.as_ptr().cast()) }?;
        NonNull::new(proc as *mut c_void)
    }

    pub fn close(handle: &Handle) {
        // SAFETY: called once from Drop.
        unsafe { FreeLibrary(handle.0.as_ptr()) };
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use std::ffi::{CStr, c_void};
    use std::path::Path;
    use std::ptr::NonNull;

    pub struct Handle;

    pub fn open(_path: &Path) -> Option<Handle> {
        None
    }

    pub fn symbol(_handle: &Handle, _name: &CStr) -> Option<NonNull<c_void>> {
        None
    }

    pub fn close(_handle: &Handle) {}
}

/// An open shared library. Closed on drop.
pub struct DynamicLibrary {
    handle: sys::Handle,
    path: PathBuf,
}

// SAFETY: the handle is an opaque token; the loader APIs are thread-safe.
unsafe impl Send for DynamicLibrary {}
unsafe impl Sync for DynamicLibrary {}

impl DynamicLibrary {
    pub fn open(path: &Path) -> Option<Self> {
        sys::open(path).map(|handle| Self {
            handle,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an exported function and reinterpret it as `F`.
    ///
    /// # Safety
    /// `F` must be a function pointer type matching the export's signature.
    pub unsafe fn function<F: Copy>(&self, name: &'static CStr) -> Result<F, LoadError> {
        debug_assert_eq!(size_of::<F>(), size_of::<*mut c_void>());
        let raw = sys::symbol(&self.handle, name).ok_or_else(|| LoadError::MissingEntryPoint {
            path: self.path.clone(),
            entry_point: name.to_str().unwrap_or("?"),
        })?;
        // SAFETY: same size as a pointer; caller guarantees the signature.
        Ok(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&raw.as_ptr()) })
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        sys::close(&self.handle);
    }
}

/// Backend driving a loaded `nativemessagebox` library.
pub struct LibraryBackend {
    initialize: InitializeFn,
    show_message_box: ShowMessageBoxFn,
    shutdown: ShutdownFn,
    get_abi_version: GetAbiVersionFn,
    set_log_callback: SetLogCallbackFn,
    library: DynamicLibrary,
}

impl LibraryBackend {
    pub fn open(path: &Path) -> Result<Option<Self>, LoadError> {
        let Some(library) = DynamicLibrary::open(path) else {
            return Ok(None);
        };
        // SAFETY: the type aliases mirror the exported C signatures.
        unsafe {
            Ok(Some(Self {
                initialize: library.function(ENTRY_INITIALIZE)?,
                show_message_box: library.function(ENTRY_SHOW_MESSAGE_BOX)?,
                shutdown: library.function(ENTRY_SHUTDOWN)?,
                get_abi_version: library.function(ENTRY_GET_ABI_VERSION)?,
                set_log_callback: library.function(ENTRY_SET_LOG_CALLBACK)?,
                library,
            }))
        }
    }

    /// Try every candidate, then the bare file name on the system search
    /// path. A library that loads but lacks an export stops the search.
    pub fn load(candidates: &[PathBuf]) -> Result<Self, LoadError> {
        let fallback = PathBuf::from(library_file_name());
        for path in candidates.iter().chain(std::iter::once(&fallback)) {
            if let Some(backend) = Self::open(path)? {
                tracing::info!(path = %path.display(), "native message box library loaded");
                return Ok(backend);
            }
            tracing::debug!(path = %path.display(), "no native library at candidate");
        }
        Err(LoadError::NotFound {
            tried: candidates.len() + 1,
        })
    }

    pub fn path(&self) -> &Path {
        self.library.path()
    }
}

impl NativeBackend for LibraryBackend {
    unsafe fn initialize(&self, options: &NmbInitializeOptions) -> u32 {
        unsafe { (self.initialize)(options) }
    }

    unsafe fn show_message_box(
        &self,
        options: &NmbMessageBoxOptions,
        result: &mut NmbMessageBoxResult,
    ) -> u32 {
        unsafe { (self.show_message_box)(options, result) }
    }

    fn shutdown(&self) {
        // SAFETY: takes no arguments; the library tolerates repeated calls.
        unsafe { (self.shutdown)() }
    }

    fn abi_version(&self) -> u32 {
        // SAFETY: takes no arguments.
        unsafe { (self.get_abi_version)() }
    }

    unsafe fn set_log_callback(&self, callback: Option<LogCallback>, user_data: *mut c_void) {
        unsafe { (self.set_log_callback)(callback, user_data) }
    }
}
