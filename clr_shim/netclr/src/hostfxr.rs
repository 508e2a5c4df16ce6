use crate::bindings::{
    char_t, CloseFn, GetRuntimeDelegateFn, InitializeForRuntimeConfigFn, SetErrorWriterFn, CLOSE,
    GET_RUNTIME_DELEGATE, INITIALIZE_FOR_RUNTIME_CONFIG, SET_ERROR_WRITER,
};
use crate::hosting::{HostContext, HostOptions};
use crate::NetClrError;
use libloading::Library;
use log::{debug, error, info, warn};
use netcorehost::nethost;
use netcorehost::pdcstring::PdCStr;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Typed entry points of the hosting library.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub initialize_for_runtime_config: InitializeForRuntimeConfigFn,
    pub get_runtime_delegate: GetRuntimeDelegateFn,
    pub close: CloseFn,
    /// Not required for hosting; missing on very old hosts.
    pub set_error_writer: Option<SetErrorWriterFn>,
}

impl EntryPoints {
    /// # Safety
    /// `lib` must be a `hostfxr` build whose exports match the signatures in [`crate::bindings`].
    unsafe fn resolve(lib: &Library) -> Result<Self, NetClrError> {
        Self::resolve_with(|symbol| lib.get::<*const ()>(symbol).ok().map(|sym| *sym))
    }

    /// Resolve every entry point through `lookup`, which maps a nul-terminated
    /// symbol name to its address. Null addresses count as missing.
    ///
    /// # Safety
    /// Every address returned by `lookup` must be a function with the signature
    /// [`crate::bindings`] declares for that symbol.
    unsafe fn resolve_with<F>(lookup: F) -> Result<Self, NetClrError>
    where
        F: Fn(&[u8]) -> Option<*const ()>,
    {
        let find = |symbol: &[u8]| lookup(symbol).filter(|address| !address.is_null());
        let required = |symbol: &[u8]| {
            find(symbol).ok_or_else(|| {
                debug!("Lookup of {} failed", symbol_name(symbol));
                NetClrError::MissingEntryPoint {
                    symbol: symbol_name(symbol),
                }
            })
        };

        let initialize_for_runtime_config = required(INITIALIZE_FOR_RUNTIME_CONFIG)?;
        let get_runtime_delegate = required(GET_RUNTIME_DELEGATE)?;
        let close = required(CLOSE)?;
        let set_error_writer = find(SET_ERROR_WRITER);
        if set_error_writer.is_none() {
            debug!("Optional entry point {} not exported", symbol_name(SET_ERROR_WRITER));
        }

        Ok(Self {
            initialize_for_runtime_config: mem::transmute::<*const (), InitializeForRuntimeConfigFn>(
                initialize_for_runtime_config,
            ),
            get_runtime_delegate: mem::transmute::<*const (), GetRuntimeDelegateFn>(get_runtime_delegate),
            close: mem::transmute::<*const (), CloseFn>(close),
            set_error_writer: match set_error_writer {
                Some(address) => Some(mem::transmute::<*const (), SetErrorWriterFn>(address)),
                None => None,
            },
        })
    }
}

fn symbol_name(symbol: &[u8]) -> String {
    let trimmed = symbol.strip_suffix(b"\0").unwrap_or(symbol);
    String::from_utf8_lossy(trimmed).into_owned()
}

/// A loaded hosting library. Cloning shares the underlying library, which stays
/// mapped for as long as any clone (or any [`HostContext`] made from it) lives.
#[derive(Clone)]
pub struct Hostfxr {
    entry_points: EntryPoints,
    lib: Option<Arc<Library>>,
}

impl Hostfxr {
    /// Ask `nethost` where the active .NET installation keeps `hostfxr`.
    pub fn locate() -> Result<PathBuf, NetClrError> {
        let path = nethost::get_hostfxr_path().map_err(|e| NetClrError::Locate(e.to_string()))?;
        Ok(PathBuf::from(path))
    }

    pub fn load() -> Result<Self, NetClrError> {
        let path = Self::locate()?;
        Self::load_from_path(path)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, NetClrError> {
        let path = path.as_ref();
        debug!("Loading hosting library from {:?}", path);

        let lib = unsafe { Library::new(path) }?;
        let entry_points = unsafe { EntryPoints::resolve(&lib)? };

        info!("Loaded hosting library {:?}", path);
        Ok(Self {
            entry_points,
            lib: Some(Arc::new(lib)),
        })
    }

    /// Build from entry points resolved elsewhere.
    ///
    /// # Safety
    /// Every function pointer must honour the `hostfxr` contract for its entry point
    /// and stay callable for the lifetime of the returned value and its contexts.
    pub unsafe fn from_entry_points(entry_points: EntryPoints) -> Self {
        Self {
            entry_points,
            lib: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_library(entry_points: EntryPoints, lib: Arc<Library>) -> Self {
        Self {
            entry_points,
            lib: Some(lib),
        }
    }

    pub fn entry_points(&self) -> &EntryPoints {
        &self.entry_points
    }

    /// Initialize a host context for `runtime_config`. See [`HostContext::initialize`].
    pub fn initialize(&self, runtime_config: &Path, options: &HostOptions) -> Result<HostContext, NetClrError> {
        HostContext::initialize(self, runtime_config, options)
    }

    /// Route the hosting library's diagnostics into `log` under the `hostfxr` target.
    /// The writer is registered for the calling thread only.
    pub fn redirect_errors_to_log(&self) -> bool {
        let Some(set_error_writer) = self.entry_points.set_error_writer else {
            warn!("hostfxr_set_error_writer is not available, hosting errors will go to stderr");
            return false;
        };

        let previous = unsafe { set_error_writer(Some(log_hostfxr_error)) };
        if previous.is_some() {
            debug!("Replaced a previously installed hostfxr error writer");
        }
        true
    }

    /// Keep the library mapped until the process exits, even after every clone is dropped.
    pub(crate) fn leak_library(&mut self) {
        if let Some(lib) = self.lib.take() {
            debug!("Keeping the hosting library loaded for the rest of the process");
            mem::forget(lib);
        }
    }
}

impl std::fmt::Debug for Hostfxr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hostfxr")
            .field("entry_points", &self.entry_points)
            .field("owns_library", &self.lib.is_some())
            .finish()
    }
}

extern "C" fn log_hostfxr_error(message: *const char_t) {
    if let Some(message) = error_message(message) {
        error!(target: "hostfxr", "{}", message);
    }
}

fn error_message(message: *const char_t) -> Option<String> {
    if message.is_null() {
        return None;
    }
    let message = unsafe { PdCStr::from_str_ptr(message) }.to_os_string();
    Some(message.to_string_lossy().into_owned())
}
