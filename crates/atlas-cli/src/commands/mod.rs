//! CLI command implementations.

pub mod hex_utils;
pub mod hexdump;
pub mod layouts;
pub mod snapshot;
pub mod watch;
