use anyhow::{bail, Context, Result};
use log::{debug, error, info};
use netclr::{load_config, LaunchConfig};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "clr_launch.json";

const USAGE: &str = "usage: clr_launch [config.json] [--runtime-config <path>] [--assembly <path>] \
[--dotnet-root <path>] [--hostfxr <path>] [--no-shutdown]";

fn parse_args(args: &[String]) -> Result<LaunchConfig> {
    let mut config_path: Option<PathBuf> = None;
    let mut overrides = LaunchConfig::default();
    let mut no_shutdown = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |name: &str| -> Result<PathBuf> {
            iter.next()
                .map(PathBuf::from)
                .with_context(|| format!("{} expects a path", name))
        };
        match arg.as_str() {
            "--runtime-config" => overrides.runtime_config = value(arg)?,
            "--assembly" => overrides.assembly = value(arg)?,
            "--dotnet-root" => overrides.dotnet_root = Some(value(arg)?),
            "--hostfxr" => overrides.hostfxr_path = Some(value(arg)?),
            "--no-shutdown" => no_shutdown = true,
            "-h" | "--help" => bail!(USAGE),
            flag if flag.starts_with("--") => bail!("unknown option {}\n{}", flag, USAGE),
            path if config_path.is_none() => config_path = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {}\n{}", extra, USAGE),
        }
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    let mut config = match config_path {
        Some(path) => load_config(&path)?,
        None if default_path.exists() => load_config(default_path)?,
        None => {
            debug!("No {} found, using command line only", DEFAULT_CONFIG);
            LaunchConfig::default()
        }
    };

    if !overrides.runtime_config.as_os_str().is_empty() {
        config.runtime_config = overrides.runtime_config;
    }
    if !overrides.assembly.as_os_str().is_empty() {
        config.assembly = overrides.assembly;
    }
    if overrides.dotnet_root.is_some() {
        config.dotnet_root = overrides.dotnet_root;
    }
    if overrides.hostfxr_path.is_some() {
        config.hostfxr_path = overrides.hostfxr_path;
    }
    if no_shutdown {
        config.shutdown = Some(false);
    }

    config.validate()?;
    Ok(config)
}

fn run(config: &LaunchConfig) -> Result<()> {
    let hostfxr = config.hostfxr().context("Failed to load hostfxr")?;
    hostfxr.redirect_errors_to_log();

    let options = config.host_options();
    info!("Initializing .NET host for {:?}", config.runtime_config);
    let context = hostfxr
        .initialize(&config.runtime_config, &options)
        .context("Failed to initialize .NET host")?;

    context
        .load_assembly(&config.assembly)
        .with_context(|| format!("Failed to load {:?}", config.assembly))?;

    if context.shutdown_enabled() {
        context.close().context("Failed to close .NET host")?;
    } else {
        info!("Host shutdown disabled, leaving the .NET host context open");
    }
    Ok(())
}

fn main() {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = parse_args(&args).and_then(|config| {
        info!("Launching {:?}", config.assembly);
        run(&config)
    });

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
    info!("Done");
}
