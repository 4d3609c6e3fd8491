//! Upgrade of container records written before mount points existed.
//!
//! Old records kept two maps, `Volumes` (destination → host path) and
//! `VolumesRW` (destination → writable). Host paths under the legacy VFS
//! root become mount points on the default driver, named after the last
//! path element.

use std::collections::BTreeMap;
use std::path::Path;

use berth_common::config::BerthConfig;
use berth_common::error::{BerthError, Result};
use serde::Deserialize;

use crate::container::{Container, null_as_default};
use crate::path::clean_path;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LegacyVolumes {
    #[serde(rename = "Volumes", deserialize_with = "null_as_default")]
    volumes: BTreeMap<String, String>,
    #[serde(rename = "VolumesRW", deserialize_with = "null_as_default")]
    volumes_rw: BTreeMap<String, bool>,
}

/// Converts legacy volume entries in the container's on-disk record into
/// mount points and saves the record.
///
/// A container without an on-disk record is left alone.
///
/// # Errors
///
/// Returns an error if the record exists but cannot be read or decoded, or
/// if the upgraded record cannot be saved.
pub fn migrate_legacy_volumes(container: &mut Container, config: &BerthConfig) -> Result<()> {
    let path = container.json_path();
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(BerthError::io(path, e)),
    };

    let legacy: LegacyVolumes = serde_json::from_str(&content)?;
    let vfs_root = config.legacy_vfs_root();

    for (destination, host_path) in &legacy.volumes {
        let host_path = Path::new(host_path);
        if !host_path.starts_with(&vfs_root) {
            continue;
        }
        let Some(id) = host_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let read_write = legacy.volumes_rw.get(destination).copied().unwrap_or(false);
        container.add_local_mount_point(
            id,
            clean_path(destination),
            read_write,
            &config.default_driver,
        );
        tracing::info!(
            id = %container.id,
            volume = id,
            destination = destination.as_str(),
            "migrated legacy volume"
        );
    }

    container.to_disk()
}
