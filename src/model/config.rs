use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::InstallError;

const APP_NAME: &str = "mco-plugin-install";
const SELECT_ALL: &str = "*:*";

/// On-disk shape shared by the embedded defaults and user config files.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    install: InstallSection,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstallSection {
    plugins_path: Option<String>,
    prefix: Option<String>,
    plugins: Option<String>,
}

impl InstallSection {
    /// Keys set in `upper` win; unset keys fall through to `self`.
    fn merged_with(self, upper: InstallSection) -> Self {
        Self {
            plugins_path: upper.plugins_path.or(self.plugins_path),
            prefix: upper.prefix.or(self.prefix),
            plugins: upper.plugins.or(self.plugins),
        }
    }
}

/// Which plugins to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Everything the scanner found (`*:*`).
    All,
    /// Explicit `name:type` tokens, in the order given.
    Explicit(Vec<String>),
}

impl Selection {
    pub fn parse(raw: &str) -> Self {
        if raw.trim() == SELECT_ALL {
            return Selection::All;
        }

        Selection::Explicit(
            raw.split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub plugins_path: Option<String>,
    pub prefix: Option<String>,
    pub plugins: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub list_only: bool,
    pub no_color: bool,
}

/// Resolved settings for one run. Built once, then only read.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub plugins_path: String,
    pub prefix: String,
    pub selection: Selection,
    pub list_only: bool,
    /// Root of the plugin source tree.
    pub source_dir: PathBuf,
    /// Base for resolving relative destinations.
    pub working_dir: PathBuf,
    pub color: bool,
}

impl Configuration {
    /// Load configuration with layering: defaults → user config → CLI flags.
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("cannot determine current directory")?;
        let user_path = match overrides.config_path.clone() {
            Some(path) => Some(path),
            None => default_user_config_path().filter(|path| path.exists()),
        };

        Self::resolve(overrides, user_path.as_deref(), working_dir)
    }

    /// Layering without touching the process environment.
    pub fn resolve(
        overrides: ConfigOverrides,
        user_config: Option<&Path>,
        working_dir: PathBuf,
    ) -> Result<Self> {
        let mut settings = embedded_defaults()?;

        if let Some(path) = user_config {
            tracing::debug!("reading config {}", path.display());
            settings = settings.merged_with(read_layer(path)?);
        }

        settings = settings.merged_with(InstallSection {
            plugins_path: overrides.plugins_path,
            prefix: overrides.prefix,
            plugins: overrides.plugins,
        });

        let source_dir = match overrides.source_dir {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => working_dir.join(dir),
            None => working_dir.clone(),
        };

        Ok(Self {
            plugins_path: settings.plugins_path.unwrap_or_default(),
            prefix: settings.prefix.unwrap_or_default(),
            selection: Selection::parse(settings.plugins.as_deref().unwrap_or(SELECT_ALL)),
            list_only: overrides.list_only,
            source_dir,
            working_dir,
            color: !overrides.no_color,
        })
    }
}

fn embedded_defaults() -> Result<InstallSection> {
    let defaults = include_str!("../../config/default.toml");
    let file: ConfigFile = toml::from_str(defaults).context("embedded default config")?;
    Ok(file.install)
}

fn read_layer(path: &Path) -> Result<InstallSection, InstallError> {
    let raw = fs::read_to_string(path).map_err(|err| InstallError::Config {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    toml::from_str::<ConfigFile>(&raw)
        .map(|file| file.install)
        .map_err(|err| InstallError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}

fn default_user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
