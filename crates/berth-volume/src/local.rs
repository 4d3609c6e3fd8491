//! Built-in driver backed by plain host directories.
//!
//! Volumes live at `<root>/<name>/_data`. This driver is the process-wide
//! default: it serves plain bind mounts and volumes migrated from the
//! legacy layout, never named volumes requested by users.

use std::path::PathBuf;
use std::sync::Arc;

use berth_common::constants::LOCAL_VOLUME_DATA_DIR;
use berth_common::error::{BerthError, Result};

use crate::volume::{Driver, Volume};

/// Directory-backed volume driver.
#[derive(Debug)]
pub struct LocalDriver {
    name: String,
    root: PathBuf,
}

impl LocalDriver {
    /// Opens the driver, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be created.
    pub fn open(name: impl Into<String>, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| BerthError::io(&root, e))?;
        tracing::info!(path = %root.display(), "opening local volume driver");
        Ok(Self {
            name: name.into(),
            root,
        })
    }

    fn volume_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(BerthError::Config {
                message: format!("invalid local volume name: {name:?}"),
            });
        }
        Ok(self.root.join(name))
    }
}

impl Driver for LocalDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn create(&self, name: &str) -> Result<Arc<dyn Volume>> {
        let data = self.volume_dir(name)?.join(LOCAL_VOLUME_DATA_DIR);
        std::fs::create_dir_all(&data).map_err(|e| BerthError::io(&data, e))?;
        tracing::debug!(volume = name, path = %data.display(), "local volume ready");
        Ok(Arc::new(LocalVolume {
            name: name.to_owned(),
            driver_name: self.name.clone(),
            path: data,
        }))
    }

    fn remove(&self, volume: &dyn Volume) -> Result<()> {
        let dir = self.volume_dir(volume.name())?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => {
                tracing::info!(volume = volume.name(), "local volume removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BerthError::io(dir, e)),
        }
    }
}

/// Volume created by [`LocalDriver`].
#[derive(Debug, Clone)]
pub struct LocalVolume {
    name: String,
    driver_name: String,
    path: PathBuf,
}

impl Volume for LocalVolume {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver_name(&self) -> &str {
        &self.driver_name
    }

    fn path(&self) -> Result<PathBuf> {
        Ok(self.path.clone())
    }

    fn mount(&self) -> Result<PathBuf> {
        Ok(self.path.clone())
    }

    fn unmount(&self) -> Result<()> {
        Ok(())
    }
}
