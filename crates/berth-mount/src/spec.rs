//! Parsing of bind and volumes-from specifications.
//!
//! Bind grammar: `source:destination[:mode]`, where `source` is either an
//! absolute host path or a named volume `[driver/]name`. Volumes-from
//! grammar: `container_id[:mode]`. `mode` is `rw` (default) or `ro`.

use std::path::Path;

use berth_common::error::{BerthError, Result};
use berth_common::types::{ContainerConfig, MountMode};

use crate::mountpoint::MountPoint;
use crate::path::clean_path;

/// A parsed volumes-from entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumesFrom {
    /// Container whose mounts are inherited.
    pub container_id: String,
    /// Access mode applied to every inherited mount.
    pub mode: MountMode,
}

/// Parses a bind spec into a mount point.
///
/// Plain binds get a cleaned `source`; named volumes get `name` and
/// `driver`, the driver defaulting to the container's configured volume
/// driver and then to `default_driver`.
///
/// # Errors
///
/// - `InvalidSpec` if the spec does not have two or three fields, or the
///   destination is not absolute.
/// - `InvalidMode` if the mode is neither `rw` nor `ro`.
/// - `NoDriverSupport` if a named volume resolves to `default_driver`.
pub fn parse_bind_mount(
    spec: &str,
    config: &ContainerConfig,
    default_driver: &str,
) -> Result<MountPoint> {
    let fields: Vec<&str> = spec.split(':').collect();
    let (source, destination, mode) = match fields.as_slice() {
        [source, destination] => (*source, *destination, MountMode::ReadWrite),
        [source, destination, mode] => (*source, *destination, mode.parse()?),
        _ => {
            return Err(BerthError::InvalidSpec {
                spec: spec.to_owned(),
            });
        }
    };

    let destination = clean_path(destination);
    if !destination.is_absolute() {
        return Err(BerthError::InvalidSpec {
            spec: spec.to_owned(),
        });
    }

    let mut bind = MountPoint {
        destination,
        read_write: mode.is_writable(),
        ..MountPoint::default()
    };

    if Path::new(source).is_absolute() {
        bind.source = Some(clean_path(source));
    } else {
        let (driver, name) = parse_named_volume_info(source, config, default_driver);
        if driver == default_driver {
            return Err(BerthError::NoDriverSupport { driver });
        }
        bind.driver = driver;
        bind.name = name;
    }

    Ok(bind)
}

/// Splits `[driver/]name` into `(driver, name)`.
///
/// Without an explicit driver the container's configured volume driver is
/// used, then `default_driver`.
#[must_use]
pub fn parse_named_volume_info(
    info: &str,
    config: &ContainerConfig,
    default_driver: &str,
) -> (String, String) {
    if let Some((driver, name)) = info.split_once('/') {
        return (driver.to_owned(), name.to_owned());
    }
    let driver = config
        .volume_driver
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(default_driver);
    (driver.to_owned(), info.to_owned())
}

/// Parses a volumes-from entry.
///
/// # Errors
///
/// - `MalformedSpec` if the spec or its container id is empty.
/// - `InvalidMode` if the mode is neither `rw` nor `ro`.
pub fn parse_volumes_from(spec: &str) -> Result<VolumesFrom> {
    let (container_id, mode) = match spec.split_once(':') {
        Some((id, mode)) => (id, mode.parse()?),
        None => (spec, MountMode::ReadWrite),
    };
    if container_id.is_empty() {
        return Err(BerthError::MalformedSpec {
            spec: spec.to_owned(),
        });
    }
    Ok(VolumesFrom {
        container_id: container_id.to_owned(),
        mode,
    })
}
