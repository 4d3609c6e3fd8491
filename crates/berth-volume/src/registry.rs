//! Driver lookup by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::volume::Driver;

/// Resolves driver names to driver handles.
///
/// How drivers get registered is up to the implementor.
pub trait DriverRegistry: Send + Sync + fmt::Debug {
    /// Returns the driver registered as `name`, if any.
    fn lookup(&self, name: &str) -> Option<Arc<dyn Driver>>;
}

/// Registry with a fixed set of drivers, assembled at startup.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    drivers: HashMap<String, Arc<dyn Driver>>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `driver` under its own name, replacing any previous entry.
    #[must_use]
    pub fn with_driver(mut self, driver: Arc<dyn Driver>) -> Self {
        let _ = self.drivers.insert(driver.name().to_owned(), driver);
        self
    }

    /// Names of all registered drivers, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl DriverRegistry for StaticRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalDriver;

    #[test]
    fn lookup_finds_registered_driver() {
        let dir = tempfile::tempdir().expect("tempdir");
        let local = LocalDriver::open("local", dir.path()).expect("open");
        let registry = StaticRegistry::new().with_driver(Arc::new(local));

        assert_eq!(registry.names(), vec!["local"]);
        let driver = registry.lookup("local").expect("registered");
        assert_eq!(driver.name(), "local");
        assert!(registry.lookup("flocker").is_none());
    }
}
