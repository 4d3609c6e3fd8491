//! `berth resolve` — Resolve and store a container's mount table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use berth_common::config::BerthConfig;
use berth_common::constants::CONTAINER_CONFIG_FILE;
use berth_common::types::{ContainerId, HostConfig};
use berth_mount::copy::HostCopier;
use berth_mount::{Container, MountResolver};
use berth_plugins::Client;
use berth_volume::local::LocalDriver;
use berth_volume::remote::RemoteDriver;
use berth_volume::{DriverGateway, StaticRegistry};
use clap::Args;

use crate::output::format_mount_table;

/// Arguments for the `resolve` command.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Directory holding one sub-directory per container.
    #[arg(long)]
    pub containers_dir: PathBuf,

    /// Container to resolve.
    pub container: String,

    /// Bind spec; repeatable.
    #[arg(short, long = "bind")]
    pub binds: Vec<String>,

    /// Container to inherit mounts from; repeatable.
    #[arg(long)]
    pub volumes_from: Vec<String>,

    /// Remote volume driver as `name=addr`; repeatable.
    #[arg(long = "driver")]
    pub drivers: Vec<String>,

    /// Container root filesystem used to seed new volumes.
    #[arg(long)]
    pub rootfs: Option<PathBuf>,
}

/// Executes the `resolve` command.
///
/// # Errors
///
/// Returns an error if containers cannot be loaded, a driver is malformed,
/// resolution fails, or volumes cannot be seeded from `--rootfs`.
pub fn execute(args: &ResolveArgs, config: &BerthConfig) -> anyhow::Result<()> {
    let store = load_containers(&args.containers_dir)?;
    let mut container = store
        .get(&ContainerId::new(args.container.as_str()))
        .cloned()
        .unwrap_or_else(|| {
            Container::new(
                ContainerId::new(args.container.as_str()),
                args.containers_dir.join(&args.container),
            )
        });

    let gateway = DriverGateway::new(
        Arc::new(build_registry(&args.drivers, config)?),
        config.default_driver.clone(),
    );
    let resolver = MountResolver::new(gateway, Arc::new(store));
    let host = HostConfig {
        binds: args.binds.clone(),
        volumes_from: args.volumes_from.clone(),
    };

    resolver.reattach(&mut container)?;
    let table = resolver.resolve(&mut container, &host)?;
    println!("{}", format_mount_table(table));
    if let Some(rootfs) = &args.rootfs {
        container.seed_volumes(rootfs, &HostCopier)?;
    }
    container.to_disk()?;
    Ok(())
}

fn build_registry(drivers: &[String], config: &BerthConfig) -> anyhow::Result<StaticRegistry> {
    let local = LocalDriver::open(config.default_driver.clone(), config.local_volumes_root())?;
    let mut registry = StaticRegistry::new().with_driver(Arc::new(local));
    for spec in drivers {
        let (name, addr) = spec
            .split_once('=')
            .with_context(|| format!("driver must be name=addr, got {spec:?}"))?;
        let client = Client::with_retry(addr, config.plugin_retry)?;
        registry = registry.with_driver(Arc::new(RemoteDriver::new(name, client)));
    }
    Ok(registry)
}

fn load_containers(dir: &Path) -> anyhow::Result<HashMap<ContainerId, Container>> {
    let mut store = HashMap::new();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
        Err(e) => return Err(e).with_context(|| format!("reading {}", dir.display())),
    };
    for entry in entries {
        let path = entry?.path();
        if !path.join(CONTAINER_CONFIG_FILE).is_file() {
            continue;
        }
        let container = Container::from_disk(&path)?;
        let _ = store.insert(container.id.clone(), container);
    }
    Ok(store)
}
