//! Switchyard umbrella crate.
//!
//! This crate re-exports all Switchyard components for convenience.
//! Use feature flags to enable specific functionality.

#![doc = include_str!("../README.md")]

pub use switchyard_core as core;

#[cfg(feature = "mcp")]
pub use switchyard_mcp as mcp;

#[cfg(feature = "client")]
pub use switchyard_client as client;

#[cfg(feature = "gateway")]
pub use switchyard_gateway as gateway;
