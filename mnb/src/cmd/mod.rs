use crate::runner;
use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use mnb_executor::host_path::PathFlavor;
use std::path::PathBuf;

const DEFAULT_LEVEL_FILTER: LevelFilter = LevelFilter::Info;

/// A containerized build orchestrator.
#[derive(Debug, Parser)]
#[clap(about, long_about = None, version)]
pub(crate) struct Args {
    /// Absolute path to the working root on the host machine. When unset, the in-container
    /// root `/mnb/run` is assumed unless `--dev-mode` is also given, in which case the current
    /// directory is used.
    #[clap(long)]
    pub(crate) rootabspath: Option<PathBuf>,

    /// The host machine uses Windows path conventions; bind mount sources are translated from
    /// `C:\...` form into the form Docker Desktop's daemon expects.
    #[clap(long = "windows-host")]
    pub(crate) windows_host: bool,

    /// Run against the working root directly rather than assuming `/mnb/run`, for iterating on
    /// a spec on the host without a wrapping container.
    #[clap(long = "dev-mode")]
    pub(crate) dev_mode: bool,

    /// Set the logging level. One of [off|error|warn|info|debug|trace]. You can also leave this
    /// unset and use the RUST_LOG env variable. See https://github.com/rust-cli/env_logger/
    #[clap(long = "log-level")]
    pub(crate) log_level: Option<LevelFilter>,

    #[clap(subcommand)]
    pub(crate) subcommand: Option<Subcommand>,
}

#[derive(Debug, Parser, PartialEq, Eq)]
pub(crate) enum Subcommand {
    /// Run the two-stage build pipeline: execute the entry spec's generator, then execute the
    /// spec it emits on stdout. This is the default when no subcommand is given.
    Update,

    /// Create an empty entry spec (`mnb.json`) and render the launcher scripts.
    Init,

    /// Re-render only the launcher scripts.
    Scripts,
}

/// Entrypoint for the `mnb` command line program.
pub(super) async fn run(args: Args) -> Result<()> {
    let root = resolve_root(&args)?;
    let host_flavor = if args.windows_host {
        PathFlavor::Windows
    } else {
        PathFlavor::Posix
    };

    match args.subcommand.unwrap_or(Subcommand::Update) {
        Subcommand::Update => runner::update(&root, host_flavor).await,
        Subcommand::Init => runner::init(&root),
        Subcommand::Scripts => runner::scripts(&root),
    }
}

/// Absolute working root: `--rootabspath` if given, else `/mnb/run` (the in-container default),
/// or the current directory in `--dev-mode`.
fn resolve_root(args: &Args) -> Result<PathBuf> {
    if let Some(path) = &args.rootabspath {
        return Ok(path.clone());
    }
    if args.dev_mode {
        let cwd = std::env::current_dir().context("failed to read the current directory")?;
        log::warn!("--rootabspath not specified, assuming {}", cwd.display());
        log::warn!("running with --dev-mode and without --rootabspath only works outside of a container");
        return Ok(cwd);
    }
    Ok(PathBuf::from("/mnb/run"))
}

/// use `level` if present, or else use `RUST_LOG` if present, or else use a default.
pub(super) fn init_logger(level: Option<LevelFilter>) {
    match (std::env::var(env_logger::DEFAULT_FILTER_ENV).ok(), level) {
        (Some(_), None) => {
            // RUST_LOG exists and level does not; use the environment variable.
            Builder::from_default_env().init();
        }
        _ => {
            // use provided log level or default for this crate only.
            Builder::new()
                .filter(
                    Some(env!("CARGO_CRATE_NAME")),
                    level.unwrap_or(DEFAULT_LEVEL_FILTER),
                )
                .init();
        }
    }
}
