//! Switchyard Client: outbound HTTP calls to tool servers.
//!
//! Used by the gateway to proxy tool calls and by the health aggregator to
//! probe servers. Every failure is classified into a [`TransportError`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod client;
pub mod error;

pub use client::{BackendClient, HealthProbe, endpoint_url};
pub use error::{Result, TransportError};
