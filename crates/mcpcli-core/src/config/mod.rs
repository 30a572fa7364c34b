//! Persistent MCP server configuration.
//!
//! One JSON file is authoritative at a time:
//! - Canonical: `<root>/config/config.json`
//! - Legacy: `~/.mcp-cli/config.json`, migrated once when the canonical file is missing

pub mod paths;
pub mod schema;
pub mod store;

pub use paths::{ConfigPaths, ConfigRoot, legacy_config_path};
pub use schema::{Configuration, ServerDefinition};
pub use store::{ConfigStore, read_configuration, write_configuration};
