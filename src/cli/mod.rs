//! Command surface: argument parsing and the run / ps / stop handlers.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;

use crate::error::Result;
use crate::group::{ExecOptions, Group, GroupManager, StopOptions};
use crate::runtime::UnitConfig;
use crate::topology::{Granularity, Topology};

/// Tesson - shard all the things!
#[derive(Parser, Debug)]
#[command(name = "tesson", author, version, about, long_about = None)]
pub struct Args {
    /// Custom config file path
    #[arg(long, value_name = "FILE", global = true)]
    pub cfg: Option<PathBuf>,

    /// Optional Gorb connection URI
    #[arg(long, env = "GORB_URI", value_name = "URI", global = true)]
    pub gorb: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a sharded container group
    Run(RunArgs),
    /// List all sharded container groups
    Ps,
    /// Stop a sharded container group
    Stop(StopArgs),
}

#[derive(ClapArgs, Debug)]
pub struct RunArgs {
    /// Image to shard
    pub image: String,

    /// Sharded container group name (defaults to the image)
    #[arg(short, long)]
    pub group: Option<String>,

    /// Container config file (JSON, or YAML by extension)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Ports to publish
    #[arg(short, long = "port", value_name = "PORT")]
    pub ports: Vec<String>,

    /// Number of instances (defaults to one per placement unit)
    #[arg(short = 'n', long, hide = true)]
    pub size: Option<usize>,

    /// Placement granularity: pu, core, package or machine
    #[arg(long)]
    pub granularity: Option<Granularity>,
}

#[derive(ClapArgs, Debug)]
pub struct StopArgs {
    /// Sharded container group name
    #[arg(short, long)]
    pub group: String,

    /// Purge stopped containers
    #[arg(long)]
    pub purge: bool,
}

/// Computes the layout and launches the group.
pub async fn run(
    mgr: &GroupManager,
    topology: &dyn Topology,
    args: RunArgs,
    default_granularity: Granularity,
) -> Result<()> {
    let granularity = args.granularity.unwrap_or(default_granularity);
    let size = match args.size {
        Some(n) if n > 0 => n,
        _ => topology.capacity(granularity),
    };

    let config = args.config.map(UnitConfig::load).transpose()?;
    let layout = topology.distribute(size, granularity)?;
    let group = args.group.unwrap_or_else(|| args.image.clone());

    info!(
        component = "cli",
        event = "spawning",
        group = %group,
        shards = layout.len(),
        layout = %layout,
        "spawning shards"
    );

    mgr.exec(
        &group,
        ExecOptions {
            image: args.image,
            layout,
            ports: args.ports,
            config,
        },
    )
    .await
}

/// Lists groups. Returns the table printed to stdout, empty when there are none.
pub async fn ps(mgr: &GroupManager) -> Result<String> {
    let groups = mgr.list().await?;
    if groups.is_empty() {
        info!(
            component = "cli",
            event = "no_groups",
            "no sharded container groups found!"
        );
    }
    Ok(render_groups(&groups))
}

pub async fn stop(mgr: &GroupManager, args: StopArgs) -> Result<()> {
    mgr.stop(&args.group, StopOptions { purge: args.purge })
        .await
}

/// `ps` table: a header per group underlined to its width, one line per shard.
pub fn render_groups(groups: &[Group]) -> String {
    let mut out = String::new();
    for group in groups {
        let header = format!("Group: {} ({})", group.name, group.image);
        let _ = writeln!(out, "{}", header);
        let _ = writeln!(out, "{}", "-".repeat(header.chars().count()));
        for shard in &group.shards {
            let _ = writeln!(
                out,
                "|- [{}] {} ({}) unit layout: {}",
                shard.status,
                shard.name,
                shard.short_id(),
                shard.cpus
            );
        }
        out.push('\n');
    }
    out
}
