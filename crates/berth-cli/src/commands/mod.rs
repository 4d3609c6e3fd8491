//! CLI command definitions and dispatch.

pub mod migrate;
pub mod parse;
pub mod plugin;
pub mod resolve;

use std::path::PathBuf;

use berth_common::config::BerthConfig;
use clap::{Parser, Subcommand};

/// Berth — container mount resolution and volume plugin client.
#[derive(Parser, Debug)]
#[command(name = "berth", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the JSON configuration file.
    #[arg(long, global = true, env = "BERTH_CONFIG", default_value = "/etc/berth/config.json")]
    pub config: PathBuf,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a `source:destination[:mode]` bind spec.
    ParseBind(parse::ParseBindArgs),
    /// Parse a `container[:mode]` volumes-from spec.
    ParseVolumesFrom(parse::ParseVolumesFromArgs),
    /// Call a method on a volume plugin.
    PluginCall(plugin::PluginCallArgs),
    /// Upgrade a container record written before mount points existed.
    Migrate(migrate::MigrateArgs),
    /// Resolve and store a container's mount table.
    Resolve(resolve::ResolveArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = BerthConfig::load(&cli.config)?;
    match cli.command {
        Command::ParseBind(args) => parse::execute_bind(&args, &config),
        Command::ParseVolumesFrom(args) => parse::execute_volumes_from(&args),
        Command::PluginCall(args) => plugin::execute(&args, &config),
        Command::Migrate(args) => migrate::execute(&args, &config),
        Command::Resolve(args) => resolve::execute(&args, &config),
    }
}
