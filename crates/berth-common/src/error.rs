//! Unified error types for the Berth workspace.
//!
//! Every failure the mount resolver, the volume gateway, or the plugin
//! client can report is a variant here, so a resolution error reaches the
//! caller with its originating message intact.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BerthError {
    /// A bind spec does not have two or three colon-separated fields.
    #[error("invalid volume specification: {spec}")]
    InvalidSpec {
        /// The offending specification.
        spec: String,
    },

    /// A mount mode other than `rw` or `ro`.
    #[error("invalid mode for volumes-from: {mode}")]
    InvalidMode {
        /// The rejected mode string.
        mode: String,
    },

    /// A volumes-from specification is empty or otherwise unusable.
    #[error("malformed volumes-from specification: {spec}")]
    MalformedSpec {
        /// The offending specification.
        spec: String,
    },

    /// Named-volume syntax resolved to the bind-only default driver.
    #[error("invalid driver: {driver} driver doesn't support named volumes")]
    NoDriverSupport {
        /// Name of the default driver.
        driver: String,
    },

    /// Two binds in one request target the same container path.
    #[error("duplicate bind mount {}", destination.display())]
    DuplicateDestination {
        /// The repeated destination.
        destination: PathBuf,
    },

    /// A volumes-from entry references an unknown container.
    #[error("no such container: {id}")]
    ContainerNotFound {
        /// Identifier that failed to resolve.
        id: String,
    },

    /// No volume driver is registered under the given name.
    #[error("volumes driver {name} isn't registered")]
    DriverNotRegistered {
        /// Driver name that failed to resolve.
        name: String,
    },

    /// The plugin endpoint could not be reached.
    #[error("unable to connect to plugin {addr}: {message}")]
    ConnectionFailed {
        /// Address of the plugin.
        addr: String,
        /// Transport-level failure description.
        message: String,
    },

    /// The plugin answered with a non-success status.
    #[error("plugin error: {message}")]
    RemoteError {
        /// Error text returned by the plugin, verbatim.
        message: String,
    },

    /// A plugin response could not be decoded.
    #[error("failed to decode plugin response from {method}: {message}")]
    DecodeError {
        /// Remote method that produced the response.
        method: String,
        /// Decoder failure description.
        message: String,
    },

    /// A connected plugin did not answer in time.
    #[error("plugin call {method} timed out: {message}")]
    TimeoutExceeded {
        /// Remote method that timed out.
        method: String,
        /// Transport-level description.
        message: String,
    },

    /// A plugin address could not be parsed.
    #[error("invalid plugin address: {addr}")]
    InvalidAddress {
        /// The rejected address.
        addr: String,
    },

    /// A mount point has neither a volume nor a host source.
    #[error("unable to setup mount point {}: neither source nor volume defined", destination.display())]
    MountSetup {
        /// Destination of the incomplete mount point.
        destination: PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl BerthError {
    /// Wraps an I/O error with the path it occurred at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BerthError>;
