//! Capability traits implemented by every storage backend.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use berth_common::error::Result;

/// A materialized volume owned by its driver.
///
/// Mount points hold shared handles to volumes but never destroy them;
/// destruction goes through [`Driver::remove`].
pub trait Volume: Send + Sync + fmt::Debug {
    /// Volume name, unique within its driver.
    fn name(&self) -> &str;

    /// Name of the driver that owns this volume.
    fn driver_name(&self) -> &str;

    /// Host path holding the volume's data.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot report the path.
    fn path(&self) -> Result<PathBuf>;

    /// Makes the volume available on the host and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to mount the volume.
    fn mount(&self) -> Result<PathBuf>;

    /// Releases a previous [`Volume::mount`].
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to unmount the volume.
    fn unmount(&self) -> Result<()>;
}

/// A storage backend able to create and remove volumes.
pub trait Driver: Send + Sync + fmt::Debug {
    /// Name the driver is registered under.
    fn name(&self) -> &str;

    /// Creates the named volume, or returns it if it already exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or fails the creation.
    fn create(&self, name: &str) -> Result<Arc<dyn Volume>>;

    /// Destroys the volume's backing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or fails the removal.
    fn remove(&self, volume: &dyn Volume) -> Result<()>;
}
