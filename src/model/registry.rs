use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::plugin_type::PluginType;

/// User-facing plugin identifier, written `name:type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginKey {
    pub name: String,
    pub kind: PluginType,
}

impl PluginKey {
    pub fn new(name: impl Into<String>, kind: PluginType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Parses a `name:type` token. Returns `None` for anything malformed.
    pub fn parse(token: &str) -> Option<Self> {
        let (name, kind) = token.rsplit_once(':')?;
        if name.is_empty() {
            return None;
        }
        let kind = kind.parse::<PluginType>().ok()?;
        Some(Self::new(name, kind))
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.kind)
    }
}

/// All source files discovered for one plugin.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    pub key: PluginKey,
    /// Paths relative to the registry root, in discovery order.
    pub paths: Vec<PathBuf>,
}

/// Scan result: plugin keys mapped to their source files.
///
/// Iteration follows insertion order, which the scanner makes type-major and
/// then by first appearance of each name in the sorted glob output.
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    root: PathBuf,
    records: Vec<PluginRecord>,
    index: HashMap<PluginKey, usize>,
}

impl PluginRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            records: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Directory the recorded relative paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn insert(&mut self, key: PluginKey, path: PathBuf) {
        match self.index.get(&key) {
            Some(&idx) => self.records[idx].paths.push(path),
            None => {
                self.index.insert(key.clone(), self.records.len());
                self.records.push(PluginRecord {
                    key,
                    paths: vec![path],
                });
            }
        }
    }

    pub fn get(&self, key: &PluginKey) -> Option<&PluginRecord> {
        self.index.get(key).map(|&idx| &self.records[idx])
    }

    pub fn contains(&self, key: &PluginKey) -> bool {
        self.index.contains_key(key)
    }

    #[cfg(test)]
    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    pub fn keys(&self) -> impl Iterator<Item = &PluginKey> {
        self.records.iter().map(|record| &record.key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Absolute-or-root-relative source paths for a record.
    pub fn source_paths(&self, record: &PluginRecord) -> Vec<PathBuf> {
        record.paths.iter().map(|p| self.root.join(p)).collect()
    }
}
