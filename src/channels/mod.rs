//! Event sources feeding the bridge.

#[cfg(feature = "discord")]
pub mod discord;
