//! Resolved mount points and their realization on the host.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use berth_common::error::{BerthError, Result};
use berth_volume::Volume;
use serde::{Deserialize, Serialize};

/// A container's mounts, keyed by destination.
pub type MountTable = BTreeMap<PathBuf, MountPoint>;

/// Binding of one container path to a named volume or a host directory.
///
/// Exactly one of `volume` and `source` decides how the mount is realized.
/// Neither is persisted: volumes are re-acquired from `name` and `driver`,
/// and plain binds are supplied again by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountPoint {
    /// Volume name; empty for plain binds.
    pub name: String,
    /// Clean, absolute path inside the container.
    pub destination: PathBuf,
    /// Driver owning `name`; empty for plain binds.
    pub driver: String,
    /// Whether the container may write through this mount.
    #[serde(rename = "RW")]
    pub read_write: bool,
    /// Materialized volume, if any.
    #[serde(skip)]
    pub volume: Option<Arc<dyn Volume>>,
    /// Host directory for plain binds.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl MountPoint {
    /// Returns `true` if this mount point refers to a driver-managed volume.
    #[must_use]
    pub fn is_named(&self) -> bool {
        !self.name.is_empty() && !self.driver.is_empty()
    }

    /// Prepares the mount on the host and returns the path to bind.
    ///
    /// Volumes are mounted through their driver. A missing bind source
    /// directory is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to mount, the source cannot be
    /// created, or the mount point has neither a volume nor a source.
    pub fn setup(&self) -> Result<PathBuf> {
        if let Some(volume) = &self.volume {
            return volume.mount();
        }

        let Some(source) = &self.source else {
            return Err(BerthError::MountSetup {
                destination: self.destination.clone(),
            });
        };

        match std::fs::metadata(source) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                create_source_dir(source)?;
                tracing::debug!(source = %source.display(), "created bind source");
            }
            Err(e) => return Err(BerthError::io(source, e)),
        }
        Ok(source.clone())
    }

    /// Host path backing this mount point, if one is known.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume's driver cannot report its path.
    pub fn host_path(&self) -> Result<Option<PathBuf>> {
        match &self.volume {
            Some(volume) => volume.path().map(Some),
            None => Ok(self.source.clone()),
        }
    }
}

fn create_source_dir(source: &std::path::Path) -> Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(source)
        .map_err(|e| BerthError::io(source, e))
}

impl PartialEq for MountPoint {
    fn eq(&self, other: &Self) -> bool {
        let volume_key = |m: &Self| {
            m.volume
                .as_ref()
                .map(|v| (v.name().to_owned(), v.driver_name().to_owned()))
        };
        self.name == other.name
            && self.destination == other.destination
            && self.driver == other.driver
            && self.read_write == other.read_write
            && self.source == other.source
            && volume_key(self) == volume_key(other)
    }
}

/// A mount ready to be applied to the container's filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    /// Host path.
    pub source: PathBuf,
    /// Path inside the container.
    pub destination: PathBuf,
    /// Whether the mount is writable.
    pub writable: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedVolume(PathBuf);

    impl Volume for FixedVolume {
        fn name(&self) -> &str {
            "fixed"
        }
        fn driver_name(&self) -> &str {
            "test"
        }
        fn path(&self) -> Result<PathBuf> {
            Ok(self.0.clone())
        }
        fn mount(&self) -> Result<PathBuf> {
            Ok(self.0.join("mounted"))
        }
        fn unmount(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn setup_prefers_volume_over_source() {
        let mp = MountPoint {
            destination: PathBuf::from("/data"),
            volume: Some(Arc::new(FixedVolume(PathBuf::from("/vol")))),
            source: Some(PathBuf::from("/ignored")),
            ..MountPoint::default()
        };
        assert_eq!(mp.setup().unwrap(), PathBuf::from("/vol/mounted"));
        assert_eq!(mp.host_path().unwrap(), Some(PathBuf::from("/vol")));
    }

    #[test]
    fn setup_creates_missing_bind_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("a/b");
        let mp = MountPoint {
            destination: PathBuf::from("/data"),
            source: Some(source.clone()),
            ..MountPoint::default()
        };
        assert_eq!(mp.setup().unwrap(), source);
        assert!(source.is_dir());
    }

    #[test]
    fn setup_without_source_or_volume_fails() {
        let mp = MountPoint {
            destination: PathBuf::from("/data"),
            ..MountPoint::default()
        };
        assert!(matches!(mp.setup(), Err(BerthError::MountSetup { .. })));
        assert_eq!(mp.host_path().unwrap(), None);
    }

    #[test]
    fn serialization_skips_volume_and_source() {
        let mp = MountPoint {
            name: "db".into(),
            destination: PathBuf::from("/var/lib/db"),
            driver: "flocker".into(),
            read_write: true,
            volume: Some(Arc::new(FixedVolume(PathBuf::from("/vol")))),
            source: Some(PathBuf::from("/host")),
        };
        let json = serde_json::to_value(&mp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Name": "db",
                "Destination": "/var/lib/db",
                "Driver": "flocker",
                "RW": true
            })
        );
    }
}
