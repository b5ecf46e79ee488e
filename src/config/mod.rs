pub mod schema;

pub use schema::{FileConfig, Settings, DEFAULT_COMMAND_PREFIX, DEFAULT_CONFIG_TOML, ENV_KEYS};
