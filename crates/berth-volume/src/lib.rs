//! # berth-volume
//!
//! Storage backends for container mounts.
//!
//! Handles:
//! - **Volume / Driver**: capability traits every backend implements.
//! - **Registry**: name → driver lookup, injected rather than global.
//! - **Gateway**: the façade the mount resolver uses to create and remove volumes.
//! - **Remote**: drivers living in a plugin process, reached over RPC.
//! - **Local**: the built-in default driver, backed by host directories.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod gateway;
pub mod local;
pub mod registry;
pub mod remote;
pub mod volume;

pub use gateway::DriverGateway;
pub use registry::{DriverRegistry, StaticRegistry};
pub use volume::{Driver, Volume};
