pub mod config;
pub mod plugin_type;
pub mod registry;
