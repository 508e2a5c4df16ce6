use crate::hostfxr::Hostfxr;
use crate::hosting::HostOptions;
use crate::NetClrError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What to launch and how to host it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    /// The `.runtimeconfig.json` of the assembly.
    #[serde(alias = "runtimeconfig")]
    pub runtime_config: PathBuf,
    pub assembly: PathBuf,
    /// Explicit .NET installation root; implies shutdown unless `shutdown` says otherwise.
    #[serde(alias = "dotnet_root_path")]
    pub dotnet_root: Option<PathBuf>,
    /// Skip `nethost` and load this `hostfxr` directly.
    pub hostfxr_path: Option<PathBuf>,
    pub shutdown: Option<bool>,
}

impl LaunchConfig {
    pub fn validate(&self) -> Result<(), NetClrError> {
        if self.runtime_config.as_os_str().is_empty() {
            return Err(NetClrError::Config("runtime_config is not set".into()));
        }
        if self.assembly.as_os_str().is_empty() {
            return Err(NetClrError::Config("assembly is not set".into()));
        }
        Ok(())
    }

    pub fn host_options(&self) -> HostOptions {
        let options = match &self.dotnet_root {
            Some(root) => HostOptions::rooted(root),
            None => HostOptions::unrooted(),
        };
        match self.shutdown {
            Some(shutdown) => options.with_shutdown(shutdown),
            None => options,
        }
    }

    pub fn hostfxr(&self) -> Result<Hostfxr, NetClrError> {
        match &self.hostfxr_path {
            Some(path) => Hostfxr::load_from_path(path),
            None => Hostfxr::load(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<LaunchConfig, NetClrError> {
    info!("Loading launch config from {:?}", path);
    let file = fs::File::open(path).map_err(|e| NetClrError::Config(format!("{:?}: {}", path, e)))?;
    let reader = std::io::BufReader::new(file);
    serde_json::from_reader(reader).map_err(|e| NetClrError::Config(format!("{:?}: {}", path, e)))
}
