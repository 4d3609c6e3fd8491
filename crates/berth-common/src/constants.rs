//! System-wide constants and default paths.

/// Default daemon state root.
pub const DEFAULT_ROOT: &str = "/var/lib/berth";

/// Name of the built-in driver. It only backs plain bind mounts and
/// legacy volumes; named-volume syntax must never resolve to it.
pub const DEFAULT_DRIVER_NAME: &str = "local";

/// `Accept` header value identifying version 1 of the plugin protocol.
pub const PLUGIN_MIMETYPE: &str = "application/vnd.docker.plugins.v1+json";

/// First backoff delay after a failed plugin connection, in milliseconds.
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// Upper bound for a single backoff delay, in milliseconds.
pub const BACKOFF_CAP_MS: u64 = 120_000;

/// Total wall-clock budget for retrying one plugin call, in milliseconds.
pub const PLUGIN_TIMEOUT_MS: u64 = 120_000;

/// File name of the per-container configuration record.
pub const CONTAINER_CONFIG_FILE: &str = "config.json";

/// Directory (relative to the daemon root) holding pre-mount-point volumes.
pub const LEGACY_VFS_DIR: &str = "vfs/dir";

/// Directory (relative to the daemon root) holding local driver volumes.
pub const LOCAL_VOLUMES_DIR: &str = "volumes";

/// Sub-directory of a local volume that holds its data.
pub const LOCAL_VOLUME_DATA_DIR: &str = "_data";
