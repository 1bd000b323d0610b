pub mod installer;
pub mod scanner;
pub mod selector;

pub use installer::PluginInstaller;
