//! `berth parse-bind` / `berth parse-volumes-from` — Inspect mount specs.

use berth_common::config::BerthConfig;
use berth_common::types::ContainerConfig;
use berth_mount::spec::{parse_bind_mount, parse_volumes_from};
use clap::Args;

/// Arguments for the `parse-bind` command.
#[derive(Args, Debug)]
pub struct ParseBindArgs {
    /// Bind spec, e.g. `/srv/data:/data:ro` or `flocker/pg:/var/lib/pg`.
    pub spec: String,

    /// Volume driver configured for the container.
    #[arg(long)]
    pub volume_driver: Option<String>,
}

/// Arguments for the `parse-volumes-from` command.
#[derive(Args, Debug)]
pub struct ParseVolumesFromArgs {
    /// Volumes-from spec, e.g. `web:ro`.
    pub spec: String,
}

/// Executes the `parse-bind` command.
///
/// # Errors
///
/// Returns an error if the spec is invalid.
pub fn execute_bind(args: &ParseBindArgs, config: &BerthConfig) -> anyhow::Result<()> {
    let container_config = ContainerConfig {
        volume_driver: args.volume_driver.clone(),
    };
    let bind = parse_bind_mount(&args.spec, &container_config, &config.default_driver)?;
    let mut json = serde_json::to_value(&bind)?;
    if let Some(source) = &bind.source {
        json["Source"] = serde_json::Value::from(source.display().to_string());
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

/// Executes the `parse-volumes-from` command.
///
/// # Errors
///
/// Returns an error if the spec is malformed.
pub fn execute_volumes_from(args: &ParseVolumesFromArgs) -> anyhow::Result<()> {
    let from = parse_volumes_from(&args.spec)?;
    println!("{}\t{}", from.container_id, from.mode);
    Ok(())
}
