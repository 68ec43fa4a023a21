// Main entrypoint for the Tesson command line tool.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use tesson::binder::{GorbBinder, ServiceBinder};
use tesson::cli::{self, Args, Command};
use tesson::config::{Config, ConfigTrait};
use tesson::group::GroupManager;
use tesson::runtime::{DockerRuntime, RuntimeClient};
use tesson::shutdown::CancelScope;
use tesson::topology::HostTopology;

/// Loads the configuration: custom file, then local, then default, then built-in defaults.
fn load_cfg(path: Option<PathBuf>) -> Result<(Config, Option<PathBuf>)> {
    let custom = path.clone();
    Config::resolve(path.as_deref()).with_context(|| match custom {
        Some(p) => format!("failed to load custom config from {:?}", p),
        None => "failed to load config".to_string(),
    })
}

/// Configures structured logging based on configuration. Logs go to stderr.
fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.log_level()));

    if cfg.is_prod() {
        // Production: JSON format
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    let args = Args::parse();

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(async_main(args)) {
        error!(
            component = "main",
            event = "command_failed",
            error = %format!("{e:#}"),
            "command failed"
        );
        eprintln!("tesson: {e:#}");
        std::process::exit(1);
    }
}

async fn async_main(args: Args) -> Result<()> {
    let (mut cfg, cfg_path) = load_cfg(args.cfg)?;
    cfg.override_gorb_uri(args.gorb);

    // Configure logger (must be done after config is loaded)
    configure_logger(&cfg);
    info!(
        component = "config",
        event = "load_success",
        path = ?cfg_path,
        "config loaded"
    );

    let scope = CancelScope::new(cfg.deadline());

    let runtime: Arc<dyn RuntimeClient> = Arc::new(
        DockerRuntime::connect(cfg.endpoint(), Some(cfg.timeout()))
            .context("failed to connect to container runtime")?,
    );

    let mut mgr = GroupManager::new(runtime, scope.token()).with_stop_grace(cfg.stop_grace());
    if let Some(uri) = cfg.gorb_uri() {
        let binder: Arc<dyn ServiceBinder> = Arc::new(
            GorbBinder::new(uri, cfg.gorb_options()).context("failed to configure gorb binder")?,
        );
        mgr = mgr.with_binder(binder);
    }

    match args.command {
        Command::Run(run) => {
            let topology = HostTopology::discover(cfg.sysfs_root(), cfg.oversubscription())
                .context("invalid host topology")?;
            cli::run(&mgr, &topology, run, cfg.granularity()).await?;
        }
        Command::Ps => {
            print!("{}", cli::ps(&mgr).await?);
        }
        Command::Stop(stop) => {
            cli::stop(&mgr, stop).await?;
        }
    }

    Ok(())
}
