//! Status codes returned by the hosting layer and their descriptions.

use netcorehost::error::{HostingResult, HostingSuccess};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

pub use netcorehost::bindings::StatusCode;

/// Returned by [`describe`] for codes that are not part of the hosting table.
pub const UNKNOWN_STATUS_MESSAGE: &str = "unknown error, possibly a platform-specific code";

const ENTRIES: &[(u32, &str, &str)] = &[
    (StatusCode::Success as u32, "Success", "Operation was successful"),
    (
        StatusCode::Success_HostAlreadyInitialized as u32,
        "Success_HostAlreadyInitialized",
        "Initialization was successful, but another host context is already initialized",
    ),
    (
        StatusCode::Success_DifferentRuntimeProperties as u32,
        "Success_DifferentRuntimeProperties",
        "Initialization was successful, but another host context is already initialized and the requested context specified runtime properties which are not the same",
    ),
    (StatusCode::InvalidArgFailure as u32, "InvalidArgFailure", "One or more arguments are invalid"),
    (StatusCode::CoreHostLibLoadFailure as u32, "CoreHostLibLoadFailure", "Failed to load a hosting component"),
    (StatusCode::CoreHostLibMissingFailure as u32, "CoreHostLibMissingFailure", "One of the hosting components is missing"),
    (
        StatusCode::CoreHostEntryPointFailure as u32,
        "CoreHostEntryPointFailure",
        "One of the hosting components is missing a required entry point",
    ),
    (
        StatusCode::CoreHostCurHostFindFailure as u32,
        "CurrentHostFindFailure",
        "Failed to get the path of the current hosting component and determine the .NET installation location",
    ),
    (StatusCode::CoreClrResolveFailure as u32, "CoreClrResolveFailure", "The `coreclr` library could not be found"),
    (
        StatusCode::CoreClrBindFailure as u32,
        "CoreClrBindFailure",
        "Failed to load the `coreclr` library or finding one of the required entry points",
    ),
    (StatusCode::CoreClrInitFailure as u32, "CoreClrInitFailure", "Call to `coreclr_initialize` failed"),
    (StatusCode::CoreClrExeFailure as u32, "CoreClrExeFailure", "Call to `coreclr_execute_assembly` failed"),
    (
        StatusCode::ResolverInitFailure as u32,
        "ResolverInitFailure",
        "Initialization of the `hostpolicy` dependency resolver failed",
    ),
    (StatusCode::ResolverResolveFailure as u32, "ResolverResolveFailure", "Resolution of dependencies in `hostpolicy` failed"),
    (StatusCode::LibHostInitFailure as u32, "LibHostInitFailure", "Initialization of the `hostpolicy` library failed"),
    (StatusCode::LibHostInvalidArgs as u32, "LibHostInvalidArgs", "Arguments to `hostpolicy` are invalid"),
    (StatusCode::InvalidConfigFile as u32, "InvalidConfigFile", "The `.runtimeconfig.json` file is invalid"),
    (StatusCode::AppArgNotRunnable as u32, "AppArgNotRunnable", "[internal usage only]"),
    (
        StatusCode::AppHostExeNotBoundFailure as u32,
        "AppHostExeNotBoundFailure",
        "`apphost` failed to determine which application to run",
    ),
    (StatusCode::FrameworkMissingFailure as u32, "FrameworkMissingFailure", "Failed to find a compatible framework version"),
    (StatusCode::HostApiFailed as u32, "HostApiFailed", "Host command failed"),
    (
        StatusCode::HostApiBufferTooSmall as u32,
        "HostApiBufferTooSmall",
        "Buffer provided to a host API is too small to fit the requested value",
    ),
    (StatusCode::LibHostAppRootFindFailure as u32, "AppPathFindFailure", "Application path imprinted in `apphost` doesn't exist"),
    (StatusCode::SdkResolverResolveFailure as u32, "SdkResolveFailure", "Failed to find the requested SDK"),
    (
        StatusCode::FrameworkCompatFailure as u32,
        "FrameworkCompatFailure",
        "Application has multiple references to the same framework which are not compatible",
    ),
    (StatusCode::FrameworkCompatRetry as u32, "FrameworkCompatRetry", "[internal usage only]"),
    (StatusCode::BundleExtractionFailure as u32, "BundleExtractionFailure", "Error extracting single-file bundle"),
    (
        StatusCode::BundleExtractionIOError as u32,
        "BundleExtractionIOError",
        "Error reading or writing files during single-file bundle extraction",
    ),
    (
        StatusCode::LibHostDuplicateProperty as u32,
        "LibHostDuplicateProperty",
        "The application's `.runtimeconfig.json` contains a runtime property which is produced by the hosting layer",
    ),
    (
        StatusCode::HostApiUnsupportedVersion as u32,
        "HostApiUnsupportedVersion",
        "Feature which requires certain version of the hosting layer was used on a version which doesn't support it",
    ),
    (StatusCode::HostInvalidState as u32, "HostInvalidState", "Current state is incompatible with the requested operation"),
    (
        StatusCode::HostPropertyNotFound as u32,
        "HostPropertyNotFound",
        "Property requested by `hostfxr_get_runtime_property_value` doesn't exist",
    ),
    (
        StatusCode::CoreHostIncompatibleConfig as u32,
        "HostIncompatibleConfig",
        "Host configuration is incompatible with existing host context",
    ),
    (
        StatusCode::HostApiUnsupportedScenario as u32,
        "HostApiUnsupportedScenario",
        "Hosting API does not support the requested scenario",
    ),
    (StatusCode::HostFeatureDisabled as u32, "HostFeatureDisabled", "Support for a requested feature is disabled"),
];

struct Entry {
    name: &'static str,
    message: &'static str,
}

static TABLE: Lazy<HashMap<i32, Entry>> = Lazy::new(|| {
    ENTRIES
        .iter()
        .map(|&(code, name, message)| (code as i32, Entry { name, message }))
        .collect()
});

/// Translate a raw status code into its description. Never fails.
pub fn describe(code: i32) -> &'static str {
    TABLE
        .get(&code)
        .map(|entry| entry.message)
        .unwrap_or(UNKNOWN_STATUS_MESSAGE)
}

/// A raw status code as produced by a hosting call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    pub const SUCCESS: Status = Status(0);

    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    pub const fn code(self) -> i32 {
        self.0
    }

    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Codes 1 and 2: initialization worked but attached to an existing context.
    pub fn is_soft_success(self) -> bool {
        matches!(
            self.hosting_result().into_result(),
            Ok(HostingSuccess::HostAlreadyInitialized | HostingSuccess::DifferentRuntimeProperties)
        )
    }

    pub fn hosting_result(self) -> HostingResult {
        HostingResult::from_status_code(self.0 as u32)
    }

    /// Whether the code has an entry in the description table.
    pub fn is_known(self) -> bool {
        TABLE.contains_key(&self.0)
    }

    /// Name used by the hosting headers, e.g. `InvalidArgFailure`.
    pub fn name(self) -> Option<&'static str> {
        TABLE.get(&self.0).map(|entry| entry.name)
    }

    pub fn message(self) -> &'static str {
        describe(self.0)
    }

    /// Zero becomes `Ok`, anything else is passed through as the error.
    pub fn into_result(self) -> Result<(), StatusError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(StatusError(self))
        }
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Self(code as u32 as i32)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}: {}", self.0, self.message())
    }
}

/// A nonzero status surfaced as an error, code and message together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("CLR error 0x{:x}: {}", .0.code(), .0.message())]
pub struct StatusError(pub Status);

impl StatusError {
    pub fn status(&self) -> Status {
        self.0
    }

    pub fn code(&self) -> i32 {
        self.0.code()
    }

    pub fn message(&self) -> &'static str {
        self.0.message()
    }
}
