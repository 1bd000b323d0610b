use std::io::Write;

use anyhow::{Context, Result};

use crate::model::config::Configuration;
use crate::model::registry::PluginRegistry;
use crate::plugin::{PluginInstaller, scanner, selector};

/// One run of the installer: scan, then list or select and install.
pub struct App {
    pub config: Configuration,
}

impl App {
    pub fn new(config: Configuration) -> Self {
        Self { config }
    }

    pub fn run(&self, out: &mut impl Write) -> Result<()> {
        let registry = scanner::scan(&self.config.source_dir)?;
        if registry.is_empty() {
            tracing::warn!("no plugins found under {}", registry.root().display());
        }

        if self.config.list_only {
            return Self::list(&registry, out);
        }

        // Validate the whole selection before the first write.
        let keys = selector::select(&registry, &self.config.selection)?;

        let installer = PluginInstaller::new(&self.config, &registry);
        let summary = installer.install_all(&keys, out)?;

        writeln!(
            out,
            "Installed {} plugin(s), {} file(s) into {}",
            summary.plugins,
            summary.files,
            installer.plugins_root().display()
        )
        .context("failed to write summary")?;
        Ok(())
    }

    fn list(registry: &PluginRegistry, out: &mut impl Write) -> Result<()> {
        for key in registry.keys() {
            writeln!(out, "{key}").context("failed to write plugin list")?;
        }
        Ok(())
    }
}
