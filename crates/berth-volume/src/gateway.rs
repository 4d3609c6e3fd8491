//! Driver-level operations used by the mount resolver.

use std::sync::Arc;

use berth_common::error::{BerthError, Result};

use crate::registry::DriverRegistry;
use crate::volume::{Driver, Volume};

/// Maps driver names to drivers and forwards volume operations to them.
#[derive(Debug, Clone)]
pub struct DriverGateway {
    registry: Arc<dyn DriverRegistry>,
    default_driver: String,
}

impl DriverGateway {
    /// Creates a gateway over `registry`; empty driver names resolve to
    /// `default_driver`.
    pub fn new(registry: Arc<dyn DriverRegistry>, default_driver: impl Into<String>) -> Self {
        Self {
            registry,
            default_driver: default_driver.into(),
        }
    }

    /// Name used when a request does not name a driver.
    #[must_use]
    pub fn default_driver(&self) -> &str {
        &self.default_driver
    }

    /// Looks up a driver, substituting the default for an empty name.
    ///
    /// # Errors
    ///
    /// Returns `BerthError::DriverNotRegistered` if nothing is registered
    /// under the resolved name.
    pub fn get_driver(&self, name: &str) -> Result<Arc<dyn Driver>> {
        let name = if name.is_empty() {
            self.default_driver.as_str()
        } else {
            name
        };
        self.registry
            .lookup(name)
            .ok_or_else(|| BerthError::DriverNotRegistered {
                name: name.to_owned(),
            })
    }

    /// Creates (or re-acquires) volume `name` on driver `driver_name`.
    ///
    /// # Errors
    ///
    /// Returns the lookup failure or the driver's error unchanged.
    pub fn create_volume(&self, name: &str, driver_name: &str) -> Result<Arc<dyn Volume>> {
        let driver = self.get_driver(driver_name)?;
        tracing::debug!(volume = name, driver = driver.name(), "creating volume");
        driver.create(name)
    }

    /// Removes `volume` through the driver that owns it.
    ///
    /// A volume whose driver is no longer registered is left alone and
    /// reported as removed.
    ///
    /// # Errors
    ///
    /// Returns the driver's error unchanged.
    pub fn remove_volume(&self, volume: &dyn Volume) -> Result<()> {
        let Ok(driver) = self.get_driver(volume.driver_name()) else {
            tracing::debug!(
                volume = volume.name(),
                driver = volume.driver_name(),
                "driver not registered, skipping volume removal"
            );
            return Ok(());
        };
        driver.remove(volume)
    }
}
