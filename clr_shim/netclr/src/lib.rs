//! Native .NET hosting through `hostfxr`: initialize a host context from a
//! `.runtimeconfig.json`, load managed assemblies into it and close it again.

pub mod bindings;
mod config;
mod hostfxr;
mod hosting;
mod status;

pub use bindings::hostfxr_delegate_type as DelegateType;
pub use config::{load_config, LaunchConfig};
pub use hostfxr::{EntryPoints, Hostfxr};
pub use hosting::{DelegateSignature, HostContext, HostOptions};
pub use status::{describe, Status, StatusCode, StatusError, UNKNOWN_STATUS_MESSAGE};

/// Errors from locating, initializing and driving the .NET host
#[derive(Debug, thiserror::Error)]
pub enum NetClrError {
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("Failed to locate hostfxr: {0}")]
    Locate(String),
    #[error("Failed to load hosting library: {0}")]
    LibraryLoad(#[from] libloading::Error),
    #[error("Hosting library does not export `{symbol}`")]
    MissingEntryPoint { symbol: String },
    #[error("Invalid path {0}")]
    InvalidPath(String),
    #[error("Failed to determine executable directory: {0}")]
    ExecutablePath(#[source] std::io::Error),
    #[error("Host returned a null {0:?} delegate")]
    NullDelegate(DelegateType),
    #[error("Host context was initialized without shutdown support")]
    ShutdownDisabled,
    #[error("Invalid launch configuration: {0}")]
    Config(String),
}

impl NetClrError {
    /// The hosting status behind this error, if it came from a foreign call.
    pub fn status(&self) -> Option<Status> {
        match self {
            NetClrError::Status(err) => Some(err.status()),
            _ => None,
        }
    }
}
