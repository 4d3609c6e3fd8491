//! `berth plugin-call` — Call a method on a volume plugin.

use berth_common::config::BerthConfig;
use berth_plugins::Client;
use clap::Args;

/// Arguments for the `plugin-call` command.
#[derive(Args, Debug)]
pub struct PluginCallArgs {
    /// Plugin address (`tcp://host:port` or `host:port`).
    pub addr: String,

    /// Remote method, e.g. `VolumeDriver.Create`.
    pub method: String,

    /// JSON request body.
    #[arg(default_value = "{}")]
    pub body: String,
}

/// Executes the `plugin-call` command.
///
/// # Errors
///
/// Returns an error if the body is not JSON or the call fails.
pub fn execute(args: &PluginCallArgs, config: &BerthConfig) -> anyhow::Result<()> {
    let body: serde_json::Value = serde_json::from_str(&args.body)?;
    let client = Client::with_retry(&args.addr, config.plugin_retry)?;
    tracing::info!(addr = client.addr(), method = %args.method, "calling plugin");
    let resp: serde_json::Value = client.call(&args.method, &body)?;
    println!("{}", serde_json::to_string_pretty(&resp)?);
    Ok(())
}
