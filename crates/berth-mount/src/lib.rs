//! # berth-mount
//!
//! Decides, for every destination inside a container, which storage
//! provides it and whether it is writable.
//!
//! Handles:
//! - **Spec**: parsing of `source:destination[:mode]` binds and `id[:mode]` volumes-from entries.
//! - **Resolver**: merging stored mounts, inherited mounts, and binds into one table.
//! - **Migrate**: upgrading container records written before mount points existed.
//! - **Copy**: seeding fresh volumes with the content they shadow.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod copy;
pub mod migrate;
pub mod mountpoint;
pub mod path;
pub mod resolver;
pub mod spec;

pub use container::{Container, ContainerStore};
pub use mountpoint::{Mount, MountPoint, MountTable};
pub use resolver::MountResolver;
