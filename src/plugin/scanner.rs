use std::path::{Path, PathBuf};

use crate::error::InstallError;
use crate::model::plugin_type::{PLUGIN_TYPES, PluginTypeSpec};
use crate::model::registry::{PluginKey, PluginRegistry};

/// Builds the plugin registry for the tree rooted at `root`.
///
/// Types are visited in table order and each type's matches are sorted, so
/// two scans of the same tree yield identical registries.
pub fn scan(root: &Path) -> Result<PluginRegistry, InstallError> {
    let mut registry = PluginRegistry::new(root);

    for spec in PLUGIN_TYPES.iter() {
        for relative in matching_paths(root, spec)? {
            let shown = relative_display(&relative);
            let name = spec.name_rule.extract(&shown).ok_or_else(|| {
                InstallError::UnmatchedPath {
                    kind: spec.kind,
                    path: relative.clone(),
                }
            })?;

            tracing::debug!("found {name}:{} at {shown}", spec.kind);
            registry.insert(PluginKey::new(name, spec.kind), relative);
        }
    }

    tracing::info!("scanned {}: {} plugins", root.display(), registry.len());
    Ok(registry)
}

/// Sorted paths, relative to `root`, matched by a type's globs.
fn matching_paths(root: &Path, spec: &PluginTypeSpec) -> Result<Vec<PathBuf>, InstallError> {
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    // `*` must not match dotfiles or hidden directories.
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..glob::MatchOptions::new()
    };
    let mut paths = Vec::new();

    for dir_glob in spec.dir_globs {
        let pattern = format!("{}/{dir_glob}", escaped_root.trim_end_matches('/'));
        let entries = glob::glob_with(&pattern, options).map_err(|source| InstallError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        for entry in entries {
            match entry {
                Ok(path) => {
                    if !path.is_file() {
                        continue;
                    }
                    if let Ok(relative) = path.strip_prefix(root) {
                        paths.push(relative.to_path_buf());
                    }
                }
                Err(err) => {
                    tracing::warn!("skipping unreadable entry for {dir_glob}: {err}");
                }
            }
        }
    }

    paths.sort();
    Ok(paths)
}

/// `/`-separated form the name rules are written against.
fn relative_display(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
