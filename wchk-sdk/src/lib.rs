//! Wire types shared between the checkout finalizer server and its clients.
//!
//! The `client` feature adds a typed HTTP/WebSocket client for the
//! server API.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(unsafe_code)]

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
