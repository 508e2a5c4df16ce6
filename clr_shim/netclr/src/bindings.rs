//! Raw ABI of the `hostfxr` hosting library.
//!
//! The types and delegate signatures come from `netcorehost::bindings`; only the
//! entry-point signatures resolved by name are spelled out here.

pub use netcorehost::bindings::char_t;
pub use netcorehost::bindings::hostfxr::{
    get_function_pointer_fn, hostfxr_delegate_type, hostfxr_error_writer_fn, hostfxr_handle,
    hostfxr_initialize_parameters, load_assembly_fn, UNMANAGED_CALLERS_ONLY_METHOD,
};

pub const INITIALIZE_FOR_RUNTIME_CONFIG: &[u8] = b"hostfxr_initialize_for_runtime_config\0";
pub const GET_RUNTIME_DELEGATE: &[u8] = b"hostfxr_get_runtime_delegate\0";
pub const CLOSE: &[u8] = b"hostfxr_close\0";
pub const SET_ERROR_WRITER: &[u8] = b"hostfxr_set_error_writer\0";

pub type InitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const char_t,
    parameters: *const hostfxr_initialize_parameters,
    host_context_handle: *mut hostfxr_handle,
) -> i32;

pub type GetRuntimeDelegateFn = unsafe extern "C" fn(
    host_context_handle: hostfxr_handle,
    delegate_type: hostfxr_delegate_type,
    delegate: *mut *const (),
) -> i32;

pub type CloseFn = unsafe extern "C" fn(host_context_handle: hostfxr_handle) -> i32;

/// Returns the previously installed writer, or `None`.
pub type SetErrorWriterFn =
    unsafe extern "C" fn(error_writer: Option<hostfxr_error_writer_fn>) -> Option<hostfxr_error_writer_fn>;

/// Size-prefixed parameters carrying both paths; either may be null.
pub fn initialize_parameters(host_path: *const char_t, dotnet_root: *const char_t) -> hostfxr_initialize_parameters {
    hostfxr_initialize_parameters {
        size: std::mem::size_of::<hostfxr_initialize_parameters>(),
        host_path,
        dotnet_root,
    }
}
