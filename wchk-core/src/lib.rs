#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod config;
pub mod events;
pub mod saga;
pub mod utils;
pub mod wallet;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;
