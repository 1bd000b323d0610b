use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::plugin_type::PluginType;

/// Failures surfaced by the scan, select and install phases.
#[derive(Debug, Error)]
pub enum InstallError {
    /// A requested `name:type` token is not in the scan registry.
    #[error("Plugin {token} does not exist. Run --list-plugins to see a valid list")]
    UnknownPlugin { token: String },

    /// A directory creation or file copy failed.
    #[error("failed to {action} {}", path.display())]
    Filesystem {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Progress output could not be written.
    #[error("failed to write progress output")]
    Output(#[source] io::Error),

    /// A built-in glob pattern could not be compiled.
    #[error("invalid glob pattern {pattern}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A globbed path did not fit the naming convention for its type.
    #[error("cannot derive a {kind} plugin name from {}", path.display())]
    UnmatchedPath { kind: PluginType, path: PathBuf },

    /// The config file could not be read or parsed.
    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl InstallError {
    pub fn filesystem(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            action,
            path: path.into(),
            source,
        }
    }
}
