//! `berth migrate` — Upgrade a legacy container record.

use std::path::{Path, PathBuf};

use berth_common::config::BerthConfig;
use berth_common::error::BerthError;
use berth_common::types::ContainerId;
use berth_mount::Container;
use berth_mount::migrate::migrate_legacy_volumes;
use clap::Args;

use crate::output::format_mount_table;

/// Arguments for the `migrate` command.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Container state directory holding `config.json`.
    pub container_dir: PathBuf,
}

/// Executes the `migrate` command.
///
/// # Errors
///
/// Returns an error if the record cannot be decoded or saved.
pub fn execute(args: &MigrateArgs, config: &BerthConfig) -> anyhow::Result<()> {
    let mut container = load_record(&args.container_dir)?;
    migrate_legacy_volumes(&mut container, config)?;
    println!("{}", format_mount_table(&container.mount_points));
    Ok(())
}

/// Loads the record under `dir`, or an empty one named after `dir` when
/// there is no record yet. Any other load failure is returned.
fn load_record(dir: &Path) -> anyhow::Result<Container> {
    match Container::from_disk(dir) {
        Ok(container) => Ok(container),
        Err(BerthError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            let id = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Container::new(ContainerId::new(id), dir))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use berth_common::constants::CONTAINER_CONFIG_FILE;

    use super::*;

    #[test]
    fn missing_record_yields_empty_container_named_after_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("web");

        let container = load_record(&root).expect("load");
        assert_eq!(container.id, ContainerId::new("web"));
        assert!(container.mount_points.is_empty());
    }

    #[test]
    fn undecodable_record_is_left_alone() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONTAINER_CONFIG_FILE);
        let original = r#"{"Config":{"VolumeDriver":"flocker"},"MountPoints":[]}"#;
        std::fs::write(&path, original).expect("write");

        let config = BerthConfig {
            root: dir.path().to_path_buf(),
            ..BerthConfig::default()
        };
        let args = MigrateArgs {
            container_dir: dir.path().to_path_buf(),
        };
        assert!(execute(&args, &config).is_err());
        assert_eq!(std::fs::read_to_string(&path).expect("read"), original);
    }
}
