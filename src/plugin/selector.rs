use std::collections::HashSet;

use crate::error::InstallError;
use crate::model::config::Selection;
use crate::model::registry::{PluginKey, PluginRegistry};

/// Resolves the requested selection against the scan result.
///
/// Every explicit token is checked before anything is returned, so an unknown
/// token means nothing gets installed.
pub fn select(
    registry: &PluginRegistry,
    selection: &Selection,
) -> Result<Vec<PluginKey>, InstallError> {
    let tokens = match selection {
        Selection::All => return Ok(registry.keys().cloned().collect()),
        Selection::Explicit(tokens) => tokens,
    };

    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(tokens.len());

    for token in tokens {
        let key = PluginKey::parse(token)
            .filter(|key| registry.contains(key))
            .ok_or_else(|| InstallError::UnknownPlugin {
                token: token.clone(),
            })?;

        if seen.insert(key.clone()) {
            selected.push(key);
        } else {
            tracing::debug!("ignoring repeated selection {token}");
        }
    }

    Ok(selected)
}
