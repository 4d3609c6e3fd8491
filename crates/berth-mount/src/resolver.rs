//! Mount point resolution.
//!
//! Three sources feed a container's mount table, each overriding the
//! previous one on equal destination:
//!
//! 1. the mount points already stored for the container;
//! 2. mounts inherited from `volumes_from` containers;
//! 3. the caller's bind specs.
//!
//! The merged table replaces the container's table only if every stage
//! succeeds. Volumes created before a failure are not rolled back; driver
//! creation is idempotent, so a retry re-acquires them.

use std::collections::HashSet;
use std::sync::Arc;

use berth_common::error::{BerthError, Result};
use berth_common::types::HostConfig;
use berth_volume::DriverGateway;

use crate::container::{Container, ContainerStore};
use crate::mountpoint::MountTable;
use crate::spec::{parse_bind_mount, parse_volumes_from};

/// Builds container mount tables.
///
/// Callers must serialize resolution for any one container; different
/// containers may be resolved concurrently.
#[derive(Clone)]
pub struct MountResolver {
    gateway: DriverGateway,
    containers: Arc<dyn ContainerStore>,
}

impl std::fmt::Debug for MountResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountResolver")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}

impl MountResolver {
    /// Creates a resolver using `gateway` for volumes and `containers` for
    /// volumes-from lookups.
    pub fn new(gateway: DriverGateway, containers: Arc<dyn ContainerStore>) -> Self {
        Self {
            gateway,
            containers,
        }
    }

    /// Resolves the container's mounts and installs the resulting table.
    ///
    /// On error the container's existing table is left untouched.
    ///
    /// # Errors
    ///
    /// - `InvalidSpec`, `InvalidMode`, `MalformedSpec`, `NoDriverSupport` for bad specs.
    /// - `ContainerNotFound` for an unknown volumes-from container.
    /// - `DuplicateDestination` when two binds share a destination.
    /// - `DriverNotRegistered` or any driver/RPC error from volume creation.
    pub fn resolve<'c>(
        &self,
        container: &'c mut Container,
        host_config: &HostConfig,
    ) -> Result<&'c MountTable> {
        let merged = self.merge(container, host_config)?;
        tracing::info!(id = %container.id, mounts = merged.len(), "mount table resolved");
        container.mount_points = merged;
        Ok(&container.mount_points)
    }

    fn merge(&self, container: &Container, host_config: &HostConfig) -> Result<MountTable> {
        let mut mount_points = container.mount_points.clone();
        tracing::debug!(id = %container.id, seeded = mount_points.len(), "seeded stored mounts");

        for spec in &host_config.volumes_from {
            let from = parse_volumes_from(spec)?;
            let source = self.containers.get(&from.container_id).ok_or_else(|| {
                BerthError::ContainerNotFound {
                    id: from.container_id.clone(),
                }
            })?;

            for mp in source.mount_points.values() {
                let mut inherited = mp.clone();
                inherited.read_write = from.mode.is_writable();
                if !mp.name.is_empty() {
                    inherited.volume = Some(self.gateway.create_volume(&mp.name, &mp.driver)?);
                }
                tracing::debug!(
                    id = %container.id,
                    from = %from.container_id,
                    destination = %inherited.destination.display(),
                    "inherited mount"
                );
                let _ = mount_points.insert(inherited.destination.clone(), inherited);
            }
        }

        let mut binds = HashSet::new();
        for spec in &host_config.binds {
            let mut bind =
                parse_bind_mount(spec, &container.config, self.gateway.default_driver())?;

            if !binds.insert(bind.destination.clone()) {
                return Err(BerthError::DuplicateDestination {
                    destination: bind.destination,
                });
            }

            if bind.is_named() {
                bind.volume = Some(self.gateway.create_volume(&bind.name, &bind.driver)?);
            }
            let _ = mount_points.insert(bind.destination.clone(), bind);
        }

        Ok(mount_points)
    }

    /// Re-acquires volume handles for named mount points loaded from disk.
    ///
    /// # Errors
    ///
    /// Returns the first driver lookup or creation failure; the table is
    /// left untouched in that case.
    pub fn reattach(&self, container: &mut Container) -> Result<()> {
        let mut table = container.mount_points.clone();
        for mp in table.values_mut() {
            if mp.volume.is_none() && !mp.name.is_empty() {
                mp.volume = Some(self.gateway.create_volume(&mp.name, &mp.driver)?);
            }
        }
        container.mount_points = table;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use berth_common::types::ContainerId;
    use berth_volume::local::LocalDriver;
    use berth_volume::{Driver, StaticRegistry, Volume};

    use super::*;
    use crate::mountpoint::MountPoint;

    #[derive(Debug)]
    struct NamedVolume {
        name: String,
        driver: String,
    }

    impl Volume for NamedVolume {
        fn name(&self) -> &str {
            &self.name
        }
        fn driver_name(&self) -> &str {
            &self.driver
        }
        fn path(&self) -> Result<PathBuf> {
            Ok(PathBuf::from("/plugins").join(&self.name))
        }
        fn mount(&self) -> Result<PathBuf> {
            self.path()
        }
        fn unmount(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Counts creations; every create succeeds.
    #[derive(Debug, Default)]
    struct CountingDriver {
        created: Mutex<Vec<String>>,
    }

    impl Driver for CountingDriver {
        fn name(&self) -> &str {
            "flocker"
        }
        fn create(&self, name: &str) -> Result<Arc<dyn Volume>> {
            self.created.lock().unwrap().push(name.to_owned());
            Ok(Arc::new(NamedVolume {
                name: name.to_owned(),
                driver: "flocker".into(),
            }))
        }
        fn remove(&self, _: &dyn Volume) -> Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        resolver: MountResolver,
        flocker: Arc<CountingDriver>,
        _dir: tempfile::TempDir,
    }

    fn fixture(others: Vec<Container>) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let flocker = Arc::new(CountingDriver::default());
        let local = LocalDriver::open("local", dir.path().join("volumes")).expect("local");
        let registry = StaticRegistry::new()
            .with_driver(Arc::new(local))
            .with_driver(Arc::clone(&flocker) as Arc<dyn Driver>);
        let gateway = DriverGateway::new(Arc::new(registry), "local");
        let store: HashMap<ContainerId, Container> =
            others.into_iter().map(|c| (c.id.clone(), c)).collect();
        Fixture {
            resolver: MountResolver::new(gateway, Arc::new(store)),
            flocker,
            _dir: dir,
        }
    }

    fn container(id: &str) -> Container {
        Container::new(ContainerId::new(id), PathBuf::from("/nonexistent").join(id))
    }

    fn binds(specs: &[&str]) -> HostConfig {
        HostConfig {
            binds: specs.iter().map(|s| (*s).to_owned()).collect(),
            volumes_from: Vec::new(),
        }
    }

    fn named(name: &str, destination: &str) -> MountPoint {
        MountPoint {
            name: name.into(),
            destination: PathBuf::from(destination),
            driver: "flocker".into(),
            read_write: true,
            ..MountPoint::default()
        }
    }

    #[test]
    fn binds_populate_empty_table() {
        let fx = fixture(vec![]);
        let mut c = container("app");

        let table = fx
            .resolver
            .resolve(&mut c, &binds(&["/srv/logs:/var/log:ro", "flocker/pg:/db"]))
            .expect("resolve");

        assert_eq!(table.len(), 2);
        let logs = &table[&PathBuf::from("/var/log")];
        assert_eq!(logs.source, Some(PathBuf::from("/srv/logs")));
        assert!(!logs.read_write);
        let db = &table[&PathBuf::from("/db")];
        assert_eq!(db.volume.as_ref().unwrap().name(), "pg");
        assert_eq!(*fx.flocker.created.lock().unwrap(), vec!["pg"]);
    }

    #[test]
    fn resolution_is_idempotent() {
        let fx = fixture(vec![]);
        let host = binds(&["/a:/a", "flocker/v:/v:ro"]);

        let mut first = container("one");
        let mut second = container("one");
        let a = fx.resolver.resolve(&mut first, &host).expect("first").clone();
        let b = fx.resolver.resolve(&mut second, &host).expect("second").clone();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_bind_destination_leaves_table_untouched() {
        let fx = fixture(vec![]);
        let mut c = container("app");
        c.add_local_mount_point("old", PathBuf::from("/old"), true, "local");
        let before = c.mount_points.clone();

        let err = fx
            .resolver
            .resolve(&mut c, &binds(&["/x:/data", "/y:/data/"]))
            .unwrap_err();

        assert!(matches!(err, BerthError::DuplicateDestination { ref destination } if destination == &PathBuf::from("/data")));
        assert_eq!(c.mount_points, before);
    }

    #[test]
    fn bind_overrides_inherited_mount() {
        let mut web = container("web");
        let _ = web
            .mount_points
            .insert(PathBuf::from("/data"), named("webdata", "/data"));
        let _ = web
            .mount_points
            .insert(PathBuf::from("/cache"), named("webcache", "/cache"));
        let fx = fixture(vec![web]);

        let mut c = container("app");
        let host = HostConfig {
            binds: vec!["/host/data:/data".into()],
            volumes_from: vec!["web:ro".into()],
        };
        let table = fx.resolver.resolve(&mut c, &host).expect("resolve");

        let data = &table[&PathBuf::from("/data")];
        assert_eq!(data.source, Some(PathBuf::from("/host/data")));
        assert!(data.volume.is_none());
        assert!(data.read_write);

        let cache = &table[&PathBuf::from("/cache")];
        assert_eq!(cache.name, "webcache");
        assert!(!cache.read_write);
        assert_eq!(cache.volume.as_ref().unwrap().driver_name(), "flocker");
    }

    #[test]
    fn inherited_mount_overrides_stored_mount() {
        let mut web = container("web");
        let _ = web
            .mount_points
            .insert(PathBuf::from("/data"), named("shared", "/data"));
        let fx = fixture(vec![web]);

        let mut c = container("app");
        let _ = c
            .mount_points
            .insert(PathBuf::from("/data"), named("mine", "/data"));
        let host = HostConfig {
            binds: Vec::new(),
            volumes_from: vec!["web".into()],
        };
        let table = fx.resolver.resolve(&mut c, &host).expect("resolve");
        assert_eq!(table[&PathBuf::from("/data")].name, "shared");
        assert!(table[&PathBuf::from("/data")].read_write);
    }

    #[test]
    fn unknown_volumes_from_container_fails() {
        let fx = fixture(vec![]);
        let mut c = container("app");
        let host = HostConfig {
            binds: Vec::new(),
            volumes_from: vec!["ghost".into()],
        };
        let err = fx.resolver.resolve(&mut c, &host).unwrap_err();
        assert!(matches!(err, BerthError::ContainerNotFound { ref id } if id == "ghost"));
    }

    #[test]
    fn unregistered_driver_fails_resolution() {
        let fx = fixture(vec![]);
        let mut c = container("app");
        let err = fx
            .resolver
            .resolve(&mut c, &binds(&["convoy/x:/x"]))
            .unwrap_err();
        assert!(matches!(err, BerthError::DriverNotRegistered { ref name } if name == "convoy"));
        assert!(c.mount_points.is_empty());
    }

    #[test]
    fn named_volume_on_default_driver_fails() {
        let fx = fixture(vec![]);
        let mut c = container("app");
        let err = fx
            .resolver
            .resolve(&mut c, &binds(&["myvol:/b"]))
            .unwrap_err();
        assert!(matches!(err, BerthError::NoDriverSupport { .. }));
    }

    #[test]
    fn reattach_restores_volume_handles() {
        let fx = fixture(vec![]);
        let mut c = container("app");
        let _ = c
            .mount_points
            .insert(PathBuf::from("/db"), named("pg", "/db"));
        c.add_local_mount_point("legacy", PathBuf::from("/old"), false, "local");

        fx.resolver.reattach(&mut c).expect("reattach");
        assert_eq!(c.mount_points[&PathBuf::from("/db")].volume.as_ref().unwrap().name(), "pg");
        let legacy = c.mount_points[&PathBuf::from("/old")].volume.as_ref().unwrap();
        assert_eq!(legacy.driver_name(), "local");
        assert!(legacy.path().unwrap().is_dir());
    }
}
