//! Container record as seen by the mount layer.
//!
//! The record owns its mount table. Resolution borrows it for one call and
//! replaces the table wholesale; nothing edits individual entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use berth_common::constants::CONTAINER_CONFIG_FILE;
use berth_common::error::{BerthError, Result};
use berth_common::types::{ContainerConfig, ContainerId};
use serde::{Deserialize, Deserializer, Serialize};

use crate::copy::{ContentCopier, copy_existing_contents};
use crate::mountpoint::{Mount, MountPoint, MountTable};

/// Persistent container record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Container {
    /// Container identifier.
    #[serde(rename = "ID")]
    pub id: ContainerId,
    /// Creation settings relevant to volumes.
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ContainerConfig,
    /// Resolved mounts keyed by destination.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mount_points: MountTable,
    #[serde(skip)]
    root: PathBuf,
}

impl Container {
    /// Creates a record with an empty mount table, stored under `root`.
    pub fn new(id: ContainerId, root: impl Into<PathBuf>) -> Self {
        Self {
            id,
            config: ContainerConfig::default(),
            mount_points: MountTable::new(),
            root: root.into(),
        }
    }

    /// Loads the record stored under `root`.
    ///
    /// Volume handles are not restored; see
    /// [`MountResolver::reattach`](crate::resolver::MountResolver::reattach).
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read or parsed.
    pub fn from_disk(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = root.join(CONTAINER_CONFIG_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| BerthError::io(&path, e))?;
        let mut container: Self = serde_json::from_str(&content)?;
        container.root = root;
        Ok(container)
    }

    /// Directory holding this container's state.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the on-disk configuration record.
    #[must_use]
    pub fn json_path(&self) -> PathBuf {
        self.root.join(CONTAINER_CONFIG_FILE)
    }

    /// Persists the record, replacing the previous file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be serialized or written.
    pub fn to_disk(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root).map_err(|e| BerthError::io(&self.root, e))?;
        let path = self.json_path();
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&tmp, json).map_err(|e| BerthError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| BerthError::io(&path, e))?;
        tracing::debug!(id = %self.id, path = %path.display(), "container record saved");
        Ok(())
    }

    /// Inserts a mount point for a volume owned by the default driver.
    pub fn add_local_mount_point(
        &mut self,
        name: &str,
        destination: PathBuf,
        read_write: bool,
        default_driver: &str,
    ) {
        let mp = MountPoint {
            name: name.to_owned(),
            destination: destination.clone(),
            driver: default_driver.to_owned(),
            read_write,
            ..MountPoint::default()
        };
        let _ = self.mount_points.insert(destination, mp);
    }

    /// Prepares every mount on the host.
    ///
    /// Mounts come back parents first so that nested destinations are
    /// applied on top of their ancestors.
    ///
    /// # Errors
    ///
    /// Returns the first mount point setup failure.
    pub fn mounts(&self) -> Result<Vec<Mount>> {
        let mut mounts = self
            .mount_points
            .values()
            .map(|mp| {
                Ok(Mount {
                    source: mp.setup()?,
                    destination: mp.destination.clone(),
                    writable: mp.read_write,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        mounts.sort_by_key(|m| m.destination.components().count());
        Ok(mounts)
    }

    /// Copies image content shadowed by each volume into the volume.
    ///
    /// For every mount point backed by a volume, the directory at the same
    /// destination under `rootfs` (if any) seeds the volume.
    ///
    /// # Errors
    ///
    /// Returns the first copy failure.
    pub fn seed_volumes(&self, rootfs: &Path, copier: &dyn ContentCopier) -> Result<()> {
        for mp in self.mount_points.values() {
            let Some(volume) = &mp.volume else {
                continue;
            };
            let relative = mp.destination.strip_prefix("/").unwrap_or(&mp.destination);
            let shadowed = rootfs.join(relative);
            if !shadowed.is_dir() {
                continue;
            }
            let target = volume.path()?;
            tracing::debug!(
                volume = volume.name(),
                from = %shadowed.display(),
                "seeding volume from container filesystem"
            );
            copy_existing_contents(&shadowed, &target, copier)?;
        }
        Ok(())
    }
}

/// Decodes an explicit `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read access to other containers, used to inherit their mounts.
pub trait ContainerStore: Send + Sync {
    /// Returns a snapshot of the container with the given id.
    fn get(&self, id: &str) -> Option<Container>;
}

impl ContainerStore for HashMap<ContainerId, Container> {
    fn get(&self, id: &str) -> Option<Container> {
        Self::get(self, &ContainerId::new(id)).cloned()
    }
}
