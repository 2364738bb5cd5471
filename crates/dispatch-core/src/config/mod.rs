//! Configuration loading
//!
//! The configuration is read once at startup and is immutable for the rest
//! of the run; it is handed to the orchestrator through `RunContext`.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_config, parse_json_str, parse_toml_str};
pub use schema::{DestHost, DispatchConfig, ProgramConfig};
pub use store::{ConfigStore, DEFAULT_CONFIG_FILE};
