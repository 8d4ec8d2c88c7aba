//! Configuration management for the validator

pub mod loader;
pub mod schema;
pub mod validator;

pub use loader::ConfigLoader;
pub use schema::{ColumnConfig, Config, PolicyConfig, ReferenceConfig, ZoneConfig};
pub use validator::ConfigValidator;
