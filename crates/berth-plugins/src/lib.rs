//! # berth-plugins
//!
//! Client half of the plugin RPC protocol.
//!
//! A plugin is a separate process listening on a local address. Every call
//! is a `POST /{method}` carrying a JSON body and the protocol's `Accept`
//! marker. Connection failures are retried with exponential backoff until
//! the configured time budget runs out; any answer from a reachable plugin
//! is final.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod client;
pub mod transport;

pub use client::{Client, backoff};
pub use transport::{HttpTransport, RawResponse, Transport, TransportError};
