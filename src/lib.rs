pub mod bridge;
pub mod channels;
pub mod config;
pub mod error;
