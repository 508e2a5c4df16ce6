use crate::bindings::{
    self, get_function_pointer_fn, hostfxr_delegate_type, hostfxr_handle, load_assembly_fn,
    UNMANAGED_CALLERS_ONLY_METHOD,
};
use crate::hostfxr::{EntryPoints, Hostfxr};
use crate::status::Status;
use crate::NetClrError;
use log::{debug, info, warn};
use netcorehost::pdcstring::PdCString;
use std::ffi::{c_void, OsStr};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::ptr;

type ExecutablePathFn = dyn Fn() -> io::Result<PathBuf>;

/// How a host context is set up and torn down.
///
/// Two shapes are in use: [`HostOptions::rooted`] passes an explicit .NET root and
/// closes the context when done, [`HostOptions::unrooted`] lets the hosting library
/// find the runtime itself and leaves the context alive for the rest of the process.
pub struct HostOptions {
    pub dotnet_root: Option<PathBuf>,
    pub shutdown: bool,
    executable_path: Box<ExecutablePathFn>,
}

impl HostOptions {
    pub fn rooted(dotnet_root: impl Into<PathBuf>) -> Self {
        Self {
            dotnet_root: Some(dotnet_root.into()),
            shutdown: true,
            executable_path: Box::new(std::env::current_exe),
        }
    }

    pub fn unrooted() -> Self {
        Self {
            dotnet_root: None,
            shutdown: false,
            executable_path: Box::new(std::env::current_exe),
        }
    }

    pub fn with_shutdown(mut self, shutdown: bool) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Replace the lookup of the running executable (defaults to `std::env::current_exe`).
    pub fn with_executable_path<F>(mut self, executable_path: F) -> Self
    where
        F: Fn() -> io::Result<PathBuf> + 'static,
    {
        self.executable_path = Box::new(executable_path);
        self
    }

    /// Directory containing the running executable, passed to the host as `host_path`.
    pub fn host_path(&self) -> Result<PathBuf, NetClrError> {
        let exe = (self.executable_path)().map_err(NetClrError::ExecutablePath)?;
        match exe.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.to_path_buf()),
            _ => Err(NetClrError::ExecutablePath(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{:?} has no parent directory", exe),
            ))),
        }
    }
}

impl Default for HostOptions {
    fn default() -> Self {
        Self::unrooted()
    }
}

impl fmt::Debug for HostOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostOptions")
            .field("dotnet_root", &self.dotnet_root)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}

/// Which managed delegate type describes the method asked for in
/// [`HostContext::get_function_pointer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateSignature {
    /// `ComponentEntryPoint`: `int (void* args, int size)`.
    Default,
    /// The method carries `[UnmanagedCallersOnly]`.
    UnmanagedCallersOnly,
    /// Assembly-qualified name of a delegate type.
    Named(String),
}

pub(crate) fn to_pdcstring(value: impl AsRef<OsStr>) -> Result<PdCString, NetClrError> {
    let value = value.as_ref();
    PdCString::from_os_str(value).map_err(|e| NetClrError::InvalidPath(format!("{:?}: {}", value, e)))
}

/// An initialized host context together with the two runtime delegates resolved from it.
#[derive(Debug)]
pub struct HostContext {
    hostfxr: Hostfxr,
    handle: hostfxr_handle,
    get_function_pointer: get_function_pointer_fn,
    load_assembly: load_assembly_fn,
    shutdown: bool,
    closed: bool,
}

impl HostContext {
    /// Initialize the host for `runtime_config` and resolve the "get function pointer"
    /// and "load assembly" delegates.
    ///
    /// The first nonzero status stops the sequence and is returned unchanged. Nothing
    /// already created by the hosting library is released on that path.
    pub fn initialize(hostfxr: &Hostfxr, runtime_config: &Path, options: &HostOptions) -> Result<Self, NetClrError> {
        let host_path = options.host_path()?;
        let host_path_pd = to_pdcstring(&host_path)?;
        let config_pd = to_pdcstring(runtime_config)?;
        let dotnet_root_pd = options.dotnet_root.as_deref().map(to_pdcstring).transpose()?;

        let params = bindings::initialize_parameters(
            host_path_pd.as_ptr(),
            dotnet_root_pd.as_ref().map_or(ptr::null(), |root| root.as_ptr()),
        );

        let entry_points = hostfxr.entry_points();
        let mut handle: hostfxr_handle = ptr::null();

        debug!(
            "hostfxr_initialize_for_runtime_config({:?}, host_path={:?}, dotnet_root={:?})",
            runtime_config, host_path, options.dotnet_root
        );
        let status = Status::from_raw(unsafe {
            (entry_points.initialize_for_runtime_config)(config_pd.as_ptr(), &params, &mut handle)
        });
        status.into_result()?;

        let get_function_pointer = resolve_delegate(entry_points, handle, hostfxr_delegate_type::hdt_get_function_pointer)?;
        let load_assembly = resolve_delegate(entry_points, handle, hostfxr_delegate_type::hdt_load_assembly)?;

        info!("Initialized .NET host for {:?}", runtime_config);

        // SAFETY: the host returned these for the matching delegate types.
        Ok(Self {
            hostfxr: hostfxr.clone(),
            handle,
            get_function_pointer: unsafe { std::mem::transmute::<*const (), get_function_pointer_fn>(get_function_pointer) },
            load_assembly: unsafe { std::mem::transmute::<*const (), load_assembly_fn>(load_assembly) },
            shutdown: options.shutdown,
            closed: false,
        })
    }

    pub fn handle(&self) -> hostfxr_handle {
        self.handle
    }

    pub fn shutdown_enabled(&self) -> bool {
        self.shutdown
    }

    /// Load an assembly into the default load context. The selector and reserved
    /// arguments are always null; the delegate's status is returned as is.
    pub fn load_assembly(&self, assembly_path: &Path) -> Result<(), NetClrError> {
        let path_pd = to_pdcstring(assembly_path)?;

        debug!("load_assembly({:?})", assembly_path);
        let status = Status::from_raw(unsafe {
            (self.load_assembly)(path_pd.as_ptr(), ptr::null(), ptr::null())
        });
        status.into_result()?;

        info!("Loaded assembly {:?}", assembly_path);
        Ok(())
    }

    /// Look up a static managed method and return a native pointer to it.
    ///
    /// `type_name` is assembly qualified (`Namespace.Type, Assembly`). The caller is
    /// responsible for transmuting the result to the matching signature.
    pub fn get_function_pointer(
        &self,
        type_name: &str,
        method_name: &str,
        signature: &DelegateSignature,
    ) -> Result<*const c_void, NetClrError> {
        let type_pd = to_pdcstring(type_name)?;
        let method_pd = to_pdcstring(method_name)?;
        let named_pd = match signature {
            DelegateSignature::Named(name) => Some(to_pdcstring(name)?),
            _ => None,
        };
        let delegate_type_name = match (signature, &named_pd) {
            (DelegateSignature::UnmanagedCallersOnly, _) => UNMANAGED_CALLERS_ONLY_METHOD,
            (_, Some(name)) => name.as_ptr(),
            _ => ptr::null(),
        };

        let mut delegate: *const c_void = ptr::null();
        debug!("get_function_pointer({}, {}, {:?})", type_name, method_name, signature);
        let status = Status::from_raw(unsafe {
            (self.get_function_pointer)(
                type_pd.as_ptr(),
                method_pd.as_ptr(),
                delegate_type_name,
                ptr::null(),
                ptr::null(),
                &mut delegate,
            )
        });
        status.into_result()?;

        if delegate.is_null() {
            return Err(NetClrError::NullDelegate(hostfxr_delegate_type::hdt_get_function_pointer));
        }
        Ok(delegate)
    }

    /// Close the host context.
    ///
    /// A context created without shutdown support is released without calling into
    /// the host and [`NetClrError::ShutdownDisabled`] is returned. The hosting library
    /// then stays loaded until the process exits, as it does when such a context is dropped.
    pub fn close(mut self) -> Result<(), NetClrError> {
        if !self.shutdown {
            return Err(NetClrError::ShutdownDisabled);
        }
        self.closed = true;
        self.close_handle().into_result()?;
        Ok(())
    }

    fn close_handle(&self) -> Status {
        debug!("hostfxr_close({:?})", self.handle);
        let status = Status::from_raw(unsafe { (self.hostfxr.entry_points().close)(self.handle) });
        if status.is_success() {
            info!("Closed .NET host context");
        }
        status
    }
}

impl Drop for HostContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if !self.shutdown {
            // The runtime outlives an unclosed context.
            self.hostfxr.leak_library();
            return;
        }
        let status = self.close_handle();
        if !status.is_success() {
            warn!("hostfxr_close failed while dropping host context: {}", status);
        }
    }
}

fn resolve_delegate(
    entry_points: &EntryPoints,
    handle: hostfxr_handle,
    delegate_type: hostfxr_delegate_type,
) -> Result<*const (), NetClrError> {
    let mut delegate: *const () = ptr::null();

    debug!("hostfxr_get_runtime_delegate({:?})", delegate_type);
    let status = Status::from_raw(unsafe { (entry_points.get_runtime_delegate)(handle, delegate_type, &mut delegate) });
    status.into_result()?;

    if delegate.is_null() {
        return Err(NetClrError::NullDelegate(delegate_type));
    }
    Ok(delegate)
}
